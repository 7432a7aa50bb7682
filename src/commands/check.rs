use anyhow::Result;

use crate::config::{Config, DateRange};
use crate::engine::SlaChecker;
use crate::models::{SlaResult, SlaStatus, SlaSummary};
use crate::tracker::TicketTracker;

/// Evaluate the selected SLAs (all of them when `ids` is empty).
pub fn summaries<T: TicketTracker>(
    tracker: &T,
    config: &Config,
    ids: &[String],
    range: DateRange,
) -> Result<Vec<SlaSummary>> {
    let checker = SlaChecker::new(tracker, config).with_date_range(range);
    config
        .select(ids)?
        .into_iter()
        .map(|sla| checker.check(sla))
        .collect()
}

pub fn run<T: TicketTracker>(
    tracker: &T,
    config: &Config,
    ids: &[String],
    range: DateRange,
) -> Result<()> {
    if !range.is_empty() {
        println!(
            "Date range: {} to {}",
            range.from.map_or("start".to_string(), |d| d.to_string()),
            range.to.map_or("now".to_string(), |d| d.to_string()),
        );
        println!();
    }

    for summary in summaries(tracker, config, ids, range)? {
        print!("{}", render_dashboard(&summary));
    }
    Ok(())
}

/// Results ordered newest-created first.
pub fn newest_first(summary: &SlaSummary) -> Vec<&SlaResult> {
    let mut results: Vec<&SlaResult> = summary.results.iter().collect();
    results.sort_by(|a, b| b.created_date.cmp(&a.created_date));
    results
}

pub fn status_label(status: SlaStatus) -> &'static str {
    match status {
        SlaStatus::Met => "Met",
        SlaStatus::Breached => "Breached",
        SlaStatus::InProgress => "In Progress",
    }
}

pub fn render_dashboard(summary: &SlaSummary) -> String {
    let mut out = String::new();
    let rule = "=".repeat(78);

    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("{}\n", summary.sla_name));
    out.push_str(&format!("Target: {} days\n", summary.target_days));
    out.push_str(&rule);
    out.push('\n');

    if summary.total_count() == 0 {
        out.push_str("No tickets found.\n");
        out.push('\n');
        return out;
    }

    out.push_str(&format!("  Met:          {:>5}\n", summary.met_count()));
    out.push_str(&format!("  Breached:     {:>5}\n", summary.breached_count()));
    out.push_str(&format!("  In Progress:  {:>5}\n", summary.in_progress_count()));
    out.push_str(&format!("  Total:        {:>5}\n", summary.total_count()));
    if summary.resolved_count() > 0 {
        out.push_str(&format!("  Compliance:   {:>5.1}%\n", summary.compliance_rate()));
    }
    out.push('\n');

    out.push_str(&format!(
        "{:<12} {:<10} {:<20} {:<12} {:<10} {:>5}  {}\n",
        "Source", "Created", "Source of ID", "Target", "Resolved", "Days", "Status"
    ));
    for result in newest_first(summary) {
        let resolved = result
            .resolved_date
            .map_or("--".to_string(), |d| d.format("%Y-%m-%d").to_string());
        let source_of_id = if result.source_of_identification.is_empty() {
            "--"
        } else {
            result.source_of_identification.as_str()
        };
        let days = match &result.elapsed_time_str {
            Some(elapsed) => format!("{} ({})", result.days_elapsed, elapsed),
            None => result.days_elapsed.to_string(),
        };
        out.push_str(&format!(
            "{:<12} {:<10} {:<20} {:<12} {:<10} {:>5}  {}\n",
            truncate(&result.source_ticket, 12),
            result.created_date.format("%Y-%m-%d"),
            truncate(source_of_id, 20),
            truncate(result.target_ticket.as_deref().unwrap_or("--"), 12),
            resolved,
            days,
            status_label(result.status)
        ));
    }
    out.push('\n');
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::fake::{day, snapshot, FakeTracker};
    use proptest::prelude::*;

    fn result(key: &str, created: chrono::NaiveDateTime, status: SlaStatus) -> SlaResult {
        SlaResult {
            source_ticket: key.to_string(),
            target_ticket: None,
            created_date: created,
            resolved_date: None,
            days_elapsed: 3,
            target_days: 30,
            status,
            source_of_identification: String::new(),
            category_migrated: String::new(),
            lpm_category: String::new(),
            elapsed_time_str: None,
        }
    }

    #[test]
    fn test_render_empty_summary() {
        let summary = SlaSummary::new("Resolution", 60);
        let out = render_dashboard(&summary);
        assert!(out.contains("Resolution"));
        assert!(out.contains("No tickets found."));
        assert!(!out.contains("Compliance"));
    }

    #[test]
    fn test_render_hides_compliance_without_resolved() {
        let mut summary = SlaSummary::new("Resolution", 60);
        summary.add_result(result("ACS-1", day(2024, 1, 2), SlaStatus::InProgress));
        let out = render_dashboard(&summary);
        assert!(!out.contains("Compliance"));
        assert!(out.contains("In Progress"));
    }

    #[test]
    fn test_render_shows_compliance() {
        let mut summary = SlaSummary::new("Resolution", 60);
        summary.add_result(result("ACS-1", day(2024, 1, 2), SlaStatus::Met));
        summary.add_result(result("ACS-2", day(2024, 1, 3), SlaStatus::Breached));
        let out = render_dashboard(&summary);
        assert!(out.contains("Compliance:    50.0%"), "got:\n{}", out);
    }

    #[test]
    fn test_newest_first() {
        let mut summary = SlaSummary::new("Resolution", 60);
        summary.add_result(result("ACS-1", day(2024, 1, 2), SlaStatus::Met));
        summary.add_result(result("ACS-3", day(2024, 3, 1), SlaStatus::Met));
        summary.add_result(result("ACS-2", day(2024, 2, 1), SlaStatus::Met));
        let keys: Vec<&str> = newest_first(&summary)
            .iter()
            .map(|r| r.source_ticket.as_str())
            .collect();
        assert_eq!(keys, vec!["ACS-3", "ACS-2", "ACS-1"]);

        let out = render_dashboard(&summary);
        let first = out.find("ACS-3").unwrap();
        let last = out.find("ACS-1").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_summaries_for_selected_sla() {
        let tracker = FakeTracker {
            tickets: vec![snapshot("ACS-1", day(2024, 1, 2), "Open", &[])],
            ..Default::default()
        };
        let config = Config::default();
        let out = summaries(
            &tracker,
            &config,
            &["first_response".to_string()],
            DateRange::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sla_name, "Time to First Response");
        assert_eq!(out[0].total_count(), 1);
    }

    #[test]
    fn test_summaries_unknown_sla() {
        let tracker = FakeTracker::default();
        let err = summaries(&tracker, &Config::default(), &["bogus".to_string()], DateRange::default())
            .unwrap_err();
        assert!(err.to_string().contains("Unknown SLA"));
        assert!(tracker.queries.borrow().is_empty());
    }

    #[test]
    fn test_summaries_abort_on_search_failure() {
        let tracker = FakeTracker {
            search_fails: true,
            ..Default::default()
        };
        assert!(summaries(&tracker, &Config::default(), &[], DateRange::default()).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long ticket key", 10), "a very ...");
    }

    proptest! {
        #[test]
        fn prop_truncate_respects_limit(s in "\\PC{0,60}", max in 3usize..30) {
            prop_assert!(truncate(&s, max).chars().count() <= max);
        }
    }
}
