use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::fields::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    Inward,
    Outward,
}

/// The far side of an issue link, as seen from the ticket that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLink {
    pub key: String,
    pub direction: LinkDirection,
    pub link_type: String,
}

/// A source ticket as returned by search.
#[derive(Debug, Clone)]
pub struct TicketSnapshot {
    pub key: String,
    pub created: Option<NaiveDateTime>,
    pub status: String,
    pub links: Vec<IssueLink>,
    pub fields: HashMap<String, FieldValue>,
}

impl TicketSnapshot {
    pub fn field(&self, id: &str) -> Option<&FieldValue> {
        self.fields.get(id)
    }
}

/// A linked ticket fetched on demand with only the fields asked for.
#[derive(Debug, Clone)]
pub struct TicketDetail {
    pub key: String,
    pub created: Option<NaiveDateTime>,
    pub fields: HashMap<String, FieldValue>,
}

impl TicketDetail {
    pub fn field(&self, id: &str) -> Option<&FieldValue> {
        self.fields.get(id)
    }

    /// A date-valued custom field; only plain string values are parsed.
    pub fn date_field(&self, id: &str) -> Option<NaiveDateTime> {
        match self.fields.get(id) {
            Some(FieldValue::Scalar(s)) => crate::dates::parse_date(Some(s)),
            _ => None,
        }
    }
}

/// One changed field inside a changelog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub field: String,
    pub to_value: Option<String>,
    pub at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub account_type: Option<String>,
    pub created: Option<NaiveDateTime>,
    /// Explicit service-desk visibility flag, when the tracker sends one.
    pub public: Option<bool>,
    /// True when the comment carries a visibility restriction (role or group).
    pub restricted: bool,
}

impl Comment {
    pub fn is_public(&self) -> bool {
        match self.public {
            Some(flag) => flag,
            None => !self.restricted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    Met,
    Breached,
    InProgress,
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlaStatus::Met => write!(f, "met"),
            SlaStatus::Breached => write!(f, "breached"),
            SlaStatus::InProgress => write!(f, "in_progress"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaResult {
    pub source_ticket: String,
    pub target_ticket: Option<String>,
    pub created_date: NaiveDateTime,
    pub resolved_date: Option<NaiveDateTime>,
    pub days_elapsed: i64,
    pub target_days: i64,
    pub status: SlaStatus,
    #[serde(default)]
    pub source_of_identification: String,
    #[serde(default)]
    pub category_migrated: String,
    #[serde(default)]
    pub lpm_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time_str: Option<String>,
}

impl SlaResult {
    pub fn is_met(&self) -> bool {
        self.status == SlaStatus::Met
    }

    pub fn is_breached(&self) -> bool {
        self.status == SlaStatus::Breached
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == SlaStatus::InProgress
    }
}

/// All results for one SLA, in evaluation order. Counts are derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaSummary {
    pub sla_name: String,
    pub target_days: i64,
    pub results: Vec<SlaResult>,
}

impl SlaSummary {
    pub fn new(sla_name: &str, target_days: i64) -> Self {
        SlaSummary {
            sla_name: sla_name.to_string(),
            target_days,
            results: Vec::new(),
        }
    }

    pub fn add_result(&mut self, result: SlaResult) {
        self.results.push(result);
    }

    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    pub fn met_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_met()).count()
    }

    pub fn breached_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_breached()).count()
    }

    pub fn in_progress_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_in_progress()).count()
    }

    pub fn met_results(&self) -> Vec<&SlaResult> {
        self.results.iter().filter(|r| r.is_met()).collect()
    }

    pub fn breached_results(&self) -> Vec<&SlaResult> {
        self.results.iter().filter(|r| r.is_breached()).collect()
    }

    pub fn in_progress_results(&self) -> Vec<&SlaResult> {
        self.results.iter().filter(|r| r.is_in_progress()).collect()
    }

    pub fn resolved_count(&self) -> usize {
        self.met_count() + self.breached_count()
    }

    /// Percentage of resolved tickets that met the SLA; 100.0 when nothing is resolved yet.
    pub fn compliance_rate(&self) -> f64 {
        let resolved = self.resolved_count();
        if resolved == 0 {
            return 100.0;
        }
        self.met_count() as f64 / resolved as f64 * 100.0
    }
}
