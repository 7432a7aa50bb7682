use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::calendar::{self, business_days_between, calendar_days_between, format_elapsed};
use crate::config::{Config, DateRange, ResolutionPredicate, SlaDefinition};
use crate::fields::extract_field;
use crate::jql;
use crate::models::{IssueLink, SlaResult, SlaStatus, SlaSummary, TicketSnapshot};
use crate::tracker::TicketTracker;

/// Where (and when) the SLA clock stopped for one source ticket.
#[derive(Debug, Default)]
struct Resolution {
    target_ticket: Option<String>,
    resolved_date: Option<NaiveDateTime>,
    target_category: String,
}

/// Evaluates SLA definitions against tickets pulled from a tracker.
pub struct SlaChecker<'a, T: TicketTracker> {
    tracker: &'a T,
    config: &'a Config,
    range: DateRange,
    now: Option<NaiveDateTime>,
}

impl<'a, T: TicketTracker> SlaChecker<'a, T> {
    pub fn new(tracker: &'a T, config: &'a Config) -> Self {
        SlaChecker {
            tracker,
            config,
            range: DateRange::default(),
            now: None,
        }
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    /// Pin "now" so open tickets are measured against a fixed instant.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(calendar::now)
    }

    fn source_fields(&self) -> Vec<String> {
        let ids = &self.config.fields;
        requested(&[
            "key",
            "created",
            "summary",
            "status",
            "issuelinks",
            ids.health_plan.as_str(),
            ids.source_of_identification.as_str(),
            ids.category.as_str(),
        ])
    }

    /// Run one SLA over every matching source ticket.
    ///
    /// A failed search aborts the check; failures fetching linked tickets,
    /// changelogs or comments only drop that piece of evidence.
    pub fn check(&self, sla: &SlaDefinition) -> Result<SlaSummary> {
        let jql = jql::source_query(sla, &self.range);
        info!(sla = %sla.id, %jql, "searching source tickets");

        let tickets = self
            .tracker
            .search(&jql, &self.source_fields())
            .with_context(|| format!("Failed to search tickets for SLA '{}'", sla.name))?;
        info!(sla = %sla.id, count = tickets.len(), "source tickets returned");

        let mut summary = SlaSummary::new(&sla.name, sla.target_days);
        for ticket in &tickets {
            let result = self.evaluate(ticket, sla);

            if sla.resolution.follows_links()
                && is_excluded(&result, &ticket.status, &self.config.closed_statuses)
            {
                debug!(
                    ticket = %ticket.key,
                    status = %ticket.status,
                    "excluded: no linked ticket and source is closed"
                );
                continue;
            }

            summary.add_result(result);
        }

        Ok(summary)
    }

    pub fn evaluate(&self, ticket: &TicketSnapshot, sla: &SlaDefinition) -> SlaResult {
        debug!(ticket = %ticket.key, links = ticket.links.len(), "evaluating");

        let now = self.now();
        let created = ticket.created.unwrap_or(now);

        let resolution = match &sla.resolution {
            ResolutionPredicate::CategoryMatch { category } => {
                self.resolve_by_category(ticket, sla, category)
            }
            ResolutionPredicate::StatusReached { status } => {
                self.resolve_by_status(ticket, sla, status)
            }
            ResolutionPredicate::DoneDateField { field_id } => {
                self.resolve_by_done_date(ticket, sla, field_id)
            }
            ResolutionPredicate::FirstResponse {
                internal_account_type,
            } => self.resolve_first_response(ticket, internal_account_type),
        };

        let end = resolution.resolved_date.unwrap_or(now);
        let days_elapsed = if sla.use_business_days {
            business_days_between(created, end)
        } else {
            calendar_days_between(created, end)
        };
        let status = classify(
            days_elapsed,
            sla.target_days,
            resolution.resolved_date.is_some(),
        );
        let elapsed_time_str = match sla.resolution {
            ResolutionPredicate::FirstResponse { .. } => Some(format_elapsed(created, end)),
            _ => None,
        };

        debug!(ticket = %ticket.key, %status, days_elapsed, "evaluated");

        let ids = &self.config.fields;
        SlaResult {
            source_ticket: ticket.key.clone(),
            target_ticket: resolution.target_ticket,
            created_date: created,
            resolved_date: resolution.resolved_date,
            days_elapsed,
            target_days: sla.target_days,
            status,
            source_of_identification: extract_field(ticket.field(&ids.source_of_identification), ""),
            category_migrated: extract_field(ticket.field(&ids.category), ""),
            lpm_category: resolution.target_category,
            elapsed_time_str,
        }
    }

    /// Most recently created linked ticket whose category matches wins.
    fn resolve_by_category(
        &self,
        ticket: &TicketSnapshot,
        sla: &SlaDefinition,
        target: &str,
    ) -> Resolution {
        let category_field = &self.config.fields.category;
        let fields = requested(&["key", "created", category_field.as_str()]);
        let target = target.to_lowercase();
        let mut best: Option<Resolution> = None;

        for link in candidate_links(ticket, &sla.target_project) {
            let detail = match self.tracker.get(&link.key, &fields) {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(ticket = %ticket.key, linked = %link.key, error = %e, "failed to fetch linked ticket");
                    continue;
                }
            };

            let category = extract_field(detail.field(category_field), "");
            if category.to_lowercase() != target {
                debug!(linked = %link.key, %category, "category does not match");
                continue;
            }
            debug!(linked = %link.key, created = ?detail.created, "category matches");

            let newer = match &best {
                Some(current) => detail.created > current.resolved_date,
                None => true,
            };
            if newer {
                best = Some(Resolution {
                    target_ticket: Some(detail.key),
                    resolved_date: detail.created,
                    target_category: category,
                });
            }
        }

        if let Some(found) = &best {
            info!(ticket = %ticket.key, target = ?found.target_ticket, "selected most recent matching ticket");
        }
        best.unwrap_or_default()
    }

    /// First linked ticket (in link order) with a transition into `target` wins.
    fn resolve_by_status(
        &self,
        ticket: &TicketSnapshot,
        sla: &SlaDefinition,
        target: &str,
    ) -> Resolution {
        let target = target.to_lowercase();

        for link in candidate_links(ticket, &sla.target_project) {
            let history = match self.tracker.status_history(&link.key) {
                Ok(history) => history,
                Err(e) => {
                    warn!(ticket = %ticket.key, linked = %link.key, error = %e, "failed to fetch changelog");
                    continue;
                }
            };

            let reached = history.iter().find(|event| {
                event.field == "status"
                    && event.at.is_some()
                    && event
                        .to_value
                        .as_deref()
                        .is_some_and(|v| v.to_lowercase() == target)
            });

            if let Some(event) = reached {
                info!(ticket = %ticket.key, linked = %link.key, at = ?event.at, "status transition found");
                return Resolution {
                    target_ticket: Some(link.key.clone()),
                    resolved_date: event.at,
                    target_category: String::new(),
                };
            }
            debug!(linked = %link.key, "no transition into target status");
        }

        Resolution::default()
    }

    /// Linked ticket with the latest populated done-date wins.
    fn resolve_by_done_date(
        &self,
        ticket: &TicketSnapshot,
        sla: &SlaDefinition,
        field_id: &str,
    ) -> Resolution {
        let category_field = &self.config.fields.category;
        let fields = requested(&["key", "created", field_id, category_field.as_str()]);
        let mut best: Option<Resolution> = None;

        for link in candidate_links(ticket, &sla.target_project) {
            let detail = match self.tracker.get(&link.key, &fields) {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(ticket = %ticket.key, linked = %link.key, error = %e, "failed to fetch linked ticket");
                    continue;
                }
            };

            let Some(done) = detail.date_field(field_id) else {
                debug!(linked = %link.key, "done date not set");
                continue;
            };

            let newer = match &best {
                Some(current) => Some(done) > current.resolved_date,
                None => true,
            };
            if newer {
                best = Some(Resolution {
                    target_ticket: Some(detail.key.clone()),
                    resolved_date: Some(done),
                    target_category: extract_field(detail.field(category_field), ""),
                });
            }
        }

        best.unwrap_or_default()
    }

    /// Earliest public comment by an internal account, across all comments.
    fn resolve_first_response(&self, ticket: &TicketSnapshot, internal_account_type: &str) -> Resolution {
        let comments = match self.tracker.comments(&ticket.key) {
            Ok(comments) => comments,
            Err(e) => {
                warn!(ticket = %ticket.key, error = %e, "failed to fetch comments");
                Vec::new()
            }
        };

        let first = comments
            .iter()
            .filter(|c| c.account_type.as_deref() == Some(internal_account_type))
            .filter(|c| c.is_public())
            .filter_map(|c| c.created)
            .min();

        if let Some(at) = first {
            debug!(ticket = %ticket.key, %at, "first public internal comment");
        }

        Resolution {
            target_ticket: None,
            resolved_date: first,
            target_category: String::new(),
        }
    }
}

/// Classify a ticket from elapsed days and whether the clock has stopped.
///
/// An unresolved ticket already over the threshold counts as breached.
pub fn classify(days_elapsed: i64, target_days: i64, resolved: bool) -> SlaStatus {
    match (resolved, days_elapsed <= target_days) {
        (true, true) => SlaStatus::Met,
        (true, false) => SlaStatus::Breached,
        (false, true) => SlaStatus::InProgress,
        (false, false) => SlaStatus::Breached,
    }
}

/// A closed source ticket that never got a linked target is not applicable.
pub fn is_excluded(result: &SlaResult, source_status: &str, closed_statuses: &[String]) -> bool {
    if result.target_ticket.is_some() {
        return false;
    }
    let status = source_status.to_lowercase();
    closed_statuses.iter().any(|s| s.to_lowercase() == status)
}

fn candidate_links<'t>(ticket: &'t TicketSnapshot, target_project: &str) -> Vec<&'t IssueLink> {
    let prefix = format!("{}-", target_project);
    ticket
        .links
        .iter()
        .filter(|link| {
            let keep = link.key != ticket.key && link.key.starts_with(&prefix);
            if !keep {
                debug!(ticket = %ticket.key, linked = %link.key, "skipped: not a {} ticket", target_project);
            }
            keep
        })
        .collect()
}

fn requested(ids: &[&str]) -> Vec<String> {
    ids.iter()
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
        .collect()
}
