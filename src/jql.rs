use crate::config::{DateRange, SlaDefinition};

/// Build the search query for an SLA's source tickets.
///
/// Generates: `project = ACS AND "Health plan (migrated)" = "BCBSLA" AND created >= "2024-01-01"`
pub fn source_query(sla: &SlaDefinition, range: &DateRange) -> String {
    let mut jql = format!(
        "project = {} AND {} = {}",
        escape_jql_value(&sla.source_project),
        quote(&sla.health_plan_field),
        quote(&sla.health_plan_value)
    );

    if let Some(from) = range.from {
        jql.push_str(&format!(" AND created >= \"{}\"", from.format("%Y-%m-%d")));
    }
    if let Some(to) = range.to {
        jql.push_str(&format!(" AND created <= \"{}\"", to.format("%Y-%m-%d")));
    }

    jql
}

/// Bare identifiers stay as-is; anything else is quoted.
fn escape_jql_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        value.to_string()
    } else {
        quote(value)
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
