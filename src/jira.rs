use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client as BlockingClient;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::dates::{parse_date, parse_date_value};
use crate::fields::FieldValue;
use crate::models::{ChangeEvent, Comment, IssueLink, LinkDirection, TicketDetail, TicketSnapshot};
use crate::tracker::{TicketTracker, TrackerError};

const PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub timeout_secs: u64,
}

/// Jira Cloud REST v3 client authenticated with email + API token.
pub struct JiraClient {
    http: BlockingClient,
    config: JiraClientConfig,
}

impl JiraClient {
    pub fn new(mut config: JiraClientConfig) -> Result<Self, TrackerError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let http = BlockingClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(JiraClient { http, config })
    }

    fn get_json<D: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<D, TrackerError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .header("Accept", "application/json")
            .query(query)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(TrackerError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TrackerError::Decode(format!("{}: {}", path, e)))
    }
}

/// Turn a 404 on a per-ticket endpoint into `NotFound`.
fn for_ticket(key: &str) -> impl FnOnce(TrackerError) -> TrackerError + '_ {
    move |e| match e {
        TrackerError::Http { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            TrackerError::NotFound(key.to_string())
        }
        other => other,
    }
}

impl TicketTracker for JiraClient {
    fn search(&self, jql: &str, fields: &[String]) -> Result<Vec<TicketSnapshot>, TrackerError> {
        let mut tickets = Vec::new();
        let mut cursor = Cursor::StartAt(0);

        loop {
            let mut query = vec![
                ("jql", jql.to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("fields", fields.join(",")),
            ];
            match &cursor {
                Cursor::StartAt(n) => query.push(("startAt", n.to_string())),
                Cursor::Token(t) => query.push(("nextPageToken", t.clone())),
            }

            let page: SearchPage = self.get_json("/rest/api/3/search/jql", &query)?;
            let fetched = page.issues.len();
            tickets.extend(page.issues.into_iter().map(snapshot_from_raw));
            debug!(fetched, total = tickets.len(), "search page");

            match next_cursor(&cursor, fetched, page.total, page.next_page_token, page.is_last) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(tickets)
    }

    fn get(&self, key: &str, fields: &[String]) -> Result<TicketDetail, TrackerError> {
        let query = [("fields", fields.join(","))];
        let raw: RawIssue = self
            .get_json(&format!("/rest/api/3/issue/{}", key), &query)
            .map_err(for_ticket(key))?;
        Ok(detail_from_raw(raw))
    }

    fn status_history(&self, key: &str) -> Result<Vec<ChangeEvent>, TrackerError> {
        let path = format!("/rest/api/3/issue/{}/changelog", key);
        let mut events = Vec::new();
        let mut start_at = 0;

        loop {
            let query = [("startAt", start_at.to_string()), ("maxResults", PAGE_SIZE.to_string())];
            let page: ChangelogPage = self.get_json(&path, &query).map_err(for_ticket(key))?;
            let fetched = page.values.len();
            events.extend(page.values.into_iter().flat_map(events_from_history));

            match next_cursor(&Cursor::StartAt(start_at), fetched, page.total, None, page.is_last) {
                Some(Cursor::StartAt(next)) => start_at = next,
                _ => break,
            }
        }

        Ok(events)
    }

    fn comments(&self, key: &str) -> Result<Vec<Comment>, TrackerError> {
        let path = format!("/rest/api/3/issue/{}/comment", key);
        let mut comments = Vec::new();
        let mut start_at = 0;

        loop {
            let query = [("startAt", start_at.to_string()), ("maxResults", PAGE_SIZE.to_string())];
            let page: CommentPage = self.get_json(&path, &query).map_err(for_ticket(key))?;
            let fetched = page.comments.len();
            comments.extend(page.comments.into_iter().map(comment_from_raw));

            match next_cursor(&Cursor::StartAt(start_at), fetched, page.total, None, None) {
                Some(Cursor::StartAt(next)) => start_at = next,
                _ => break,
            }
        }

        Ok(comments)
    }

    fn whoami(&self) -> Result<String, TrackerError> {
        let me: Myself = self.get_json("/rest/api/3/myself", &[])?;
        Ok(me.display_name.unwrap_or_else(|| "Unknown".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    StartAt(u64),
    Token(String),
}

/// Decide where the next page starts, or `None` when the listing is exhausted.
///
/// Token-paged responses (`nextPageToken`/`isLast`) take precedence over
/// offset paging (`startAt`/`total`). An empty page always ends the listing.
fn next_cursor(
    current: &Cursor,
    fetched: usize,
    total: Option<u64>,
    next_page_token: Option<String>,
    is_last: Option<bool>,
) -> Option<Cursor> {
    if fetched == 0 || is_last == Some(true) {
        return None;
    }
    if let Some(token) = next_page_token {
        return Some(Cursor::Token(token));
    }
    let Cursor::StartAt(start) = current else {
        return None;
    };
    let next = start + fetched as u64;
    match total {
        Some(total) if next < total => Some(Cursor::StartAt(next)),
        None if is_last == Some(false) => Some(Cursor::StartAt(next)),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    issues: Vec<RawIssue>,
    total: Option<u64>,
    next_page_token: Option<String>,
    is_last: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLink {
    #[serde(rename = "type")]
    link_type: Option<RawLinkType>,
    outward_issue: Option<RawLinkedIssue>,
    inward_issue: Option<RawLinkedIssue>,
}

#[derive(Debug, Deserialize)]
struct RawLinkType {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLinkedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangelogPage {
    #[serde(default)]
    values: Vec<RawHistory>,
    total: Option<u64>,
    is_last: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    created: Option<String>,
    #[serde(default)]
    items: Vec<RawHistoryItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHistoryItem {
    field: String,
    to_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentPage {
    #[serde(default)]
    comments: Vec<RawComment>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComment {
    author: Option<RawAuthor>,
    created: Option<String>,
    jsd_public: Option<bool>,
    visibility: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthor {
    display_name: Option<String>,
    account_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    display_name: Option<String>,
}

fn custom_fields(fields: &Map<String, Value>) -> HashMap<String, FieldValue> {
    fields
        .iter()
        .filter_map(|(id, v)| FieldValue::from_json(v).map(|fv| (id.clone(), fv)))
        .collect()
}

fn links_from_raw(source: &str, fields: &Map<String, Value>) -> Vec<IssueLink> {
    let Some(raw) = fields.get("issuelinks") else {
        return Vec::new();
    };
    let raw: Vec<RawLink> = match serde_json::from_value(raw.clone()) {
        Ok(links) => links,
        Err(e) => {
            debug!(ticket = source, error = %e, "unreadable issuelinks");
            return Vec::new();
        }
    };

    raw.into_iter()
        .filter_map(|link| {
            let link_type = link
                .link_type
                .and_then(|t| t.name)
                .unwrap_or_else(|| "unknown".to_string());
            let (issue, direction) = match (link.outward_issue, link.inward_issue) {
                (Some(issue), _) => (issue, LinkDirection::Outward),
                (None, Some(issue)) => (issue, LinkDirection::Inward),
                (None, None) => {
                    debug!(ticket = source, %link_type, "link has no outward or inward issue");
                    return None;
                }
            };
            Some(IssueLink {
                key: issue.key,
                direction,
                link_type,
            })
        })
        .collect()
}

fn snapshot_from_raw(raw: RawIssue) -> TicketSnapshot {
    let status = raw
        .fields
        .get("status")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    TicketSnapshot {
        created: parse_date_value(raw.fields.get("created")),
        links: links_from_raw(&raw.key, &raw.fields),
        fields: custom_fields(&raw.fields),
        status,
        key: raw.key,
    }
}

fn detail_from_raw(raw: RawIssue) -> TicketDetail {
    TicketDetail {
        created: parse_date_value(raw.fields.get("created")),
        fields: custom_fields(&raw.fields),
        key: raw.key,
    }
}

fn events_from_history(history: RawHistory) -> Vec<ChangeEvent> {
    let at = parse_date(history.created.as_deref());
    history
        .items
        .into_iter()
        .map(|item| ChangeEvent {
            field: item.field,
            to_value: item.to_string,
            at,
        })
        .collect()
}

fn comment_from_raw(raw: RawComment) -> Comment {
    let (author, account_type) = match raw.author {
        Some(a) => (a.display_name.unwrap_or_else(|| "Unknown".to_string()), a.account_type),
        None => ("Unknown".to_string(), None),
    };
    Comment {
        author,
        account_type,
        created: parse_date(raw.created.as_deref()),
        public: raw.jsd_public,
        restricted: raw.visibility.is_some_and(|v| !v.is_null()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw_issue(v: Value) -> RawIssue {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_snapshot_from_search_payload() {
        let raw = raw_issue(json!({
            "key": "ACS-101",
            "fields": {
                "created": "2024-01-02T09:15:00.000-0600",
                "status": {"name": "Waiting for support"},
                "customfield_10358": {"value": "Client report"},
                "customfield_10151": null,
                "issuelinks": [
                    {"type": {"name": "Relates"}, "outwardIssue": {"key": "LPM-7"}},
                    {"type": {"name": "Blocks"}, "inwardIssue": {"key": "LPM-9"}},
                    {"type": {"name": "Broken"}}
                ]
            }
        }));

        let ticket = snapshot_from_raw(raw);
        assert_eq!(ticket.key, "ACS-101");
        assert_eq!(ticket.status, "Waiting for support");
        assert_eq!(
            ticket.created,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(9, 15, 0)
        );
        assert_eq!(ticket.links.len(), 2);
        assert_eq!(ticket.links[0].key, "LPM-7");
        assert_eq!(ticket.links[0].direction, LinkDirection::Outward);
        assert_eq!(ticket.links[1].key, "LPM-9");
        assert_eq!(ticket.links[1].direction, LinkDirection::Inward);
        assert_eq!(ticket.links[1].link_type, "Blocks");
        assert!(ticket.field("customfield_10358").is_some());
        assert!(ticket.field("customfield_10151").is_none());
    }

    #[test]
    fn test_snapshot_tolerates_missing_fields() {
        let ticket = snapshot_from_raw(raw_issue(json!({"key": "ACS-1"})));
        assert_eq!(ticket.status, "");
        assert!(ticket.created.is_none());
        assert!(ticket.links.is_empty());
    }

    #[test]
    fn test_unreadable_links_are_dropped() {
        let ticket = snapshot_from_raw(raw_issue(json!({
            "key": "ACS-1",
            "fields": {"issuelinks": "nope"}
        })));
        assert!(ticket.links.is_empty());
    }

    #[test]
    fn test_detail_from_payload() {
        let detail = detail_from_raw(raw_issue(json!({
            "key": "LPM-7",
            "fields": {
                "created": "2024-01-10T10:00:00.000+0000",
                "customfield_10356": [{"value": "break fix"}],
                "customfield_10400": "2024-02-01"
            }
        })));
        assert_eq!(detail.key, "LPM-7");
        assert!(detail.created.is_some());
        assert!(detail.date_field("customfield_10400").is_some());
        assert_eq!(
            crate::fields::extract_field(detail.field("customfield_10356"), ""),
            "break fix"
        );
    }

    #[test]
    fn test_changelog_flattening() {
        let page: ChangelogPage = serde_json::from_value(json!({
            "startAt": 0,
            "maxResults": 100,
            "total": 2,
            "isLast": true,
            "values": [
                {
                    "created": "2024-01-05T08:00:00.000+0000",
                    "items": [
                        {"field": "status", "fromString": "Open", "toString": "In Progress"},
                        {"field": "assignee", "toString": "Pat"}
                    ]
                },
                {
                    "created": "2024-01-09T08:00:00.000+0000",
                    "items": [{"field": "status", "toString": "Ready to Build"}]
                }
            ]
        }))
        .unwrap();

        let events: Vec<ChangeEvent> = page.values.into_iter().flat_map(events_from_history).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].field, "status");
        assert_eq!(events[0].to_value.as_deref(), Some("In Progress"));
        assert_eq!(events[1].at, events[0].at);
        assert_eq!(events[2].to_value.as_deref(), Some("Ready to Build"));
    }

    #[test]
    fn test_comment_visibility_mapping() {
        let page: CommentPage = serde_json::from_value(json!({
            "total": 3,
            "comments": [
                {
                    "author": {"displayName": "Agent", "accountType": "atlassian"},
                    "created": "2024-01-02T10:00:00.000+0000",
                    "jsdPublic": true
                },
                {
                    "author": {"displayName": "Agent", "accountType": "atlassian"},
                    "created": "2024-01-02T11:00:00.000+0000",
                    "visibility": {"type": "role", "value": "Developers"}
                },
                {
                    "created": "2024-01-02T12:00:00.000+0000"
                }
            ]
        }))
        .unwrap();

        let comments: Vec<Comment> = page.comments.into_iter().map(comment_from_raw).collect();
        assert!(comments[0].is_public());
        assert_eq!(comments[0].account_type.as_deref(), Some("atlassian"));
        assert!(!comments[1].is_public());
        assert_eq!(comments[2].author, "Unknown");
        assert!(comments[2].account_type.is_none());
        assert!(comments[2].is_public());
    }

    #[test]
    fn test_next_cursor_offset_paging() {
        let start = Cursor::StartAt(0);
        assert_eq!(next_cursor(&start, 100, Some(250), None, None), Some(Cursor::StartAt(100)));
        assert_eq!(next_cursor(&Cursor::StartAt(200), 50, Some(250), None, None), None);
        assert_eq!(next_cursor(&start, 0, Some(250), None, None), None);
        assert_eq!(next_cursor(&start, 100, None, None, None), None);
        assert_eq!(next_cursor(&start, 100, None, None, Some(false)), Some(Cursor::StartAt(100)));
    }

    #[test]
    fn test_next_cursor_token_paging() {
        let start = Cursor::StartAt(0);
        assert_eq!(
            next_cursor(&start, 100, None, Some("abc".into()), Some(false)),
            Some(Cursor::Token("abc".into()))
        );
        assert_eq!(next_cursor(&start, 100, None, Some("abc".into()), Some(true)), None);
        assert_eq!(
            next_cursor(&Cursor::Token("abc".into()), 100, None, None, None),
            None
        );
    }

    #[test]
    fn test_not_found_mapping() {
        let mapped = for_ticket("LPM-1")(TrackerError::Http {
            status: 404,
            body: String::new(),
        });
        assert!(matches!(mapped, TrackerError::NotFound(ref k) if k == "LPM-1"));

        let kept = for_ticket("LPM-1")(TrackerError::Http {
            status: 500,
            body: String::new(),
        });
        assert!(matches!(kept, TrackerError::Http { status: 500, .. }));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = JiraClient::new(JiraClientConfig {
            base_url: "https://example.atlassian.net/".to_string(),
            email: "me@example.com".to_string(),
            api_token: "token".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.config.base_url, "https://example.atlassian.net");
    }

    proptest! {
        #[test]
        fn prop_offset_paging_terminates(total in 0u64..1_000, page in 1usize..150) {
            let mut cursor = Cursor::StartAt(0);
            let mut seen = 0u64;
            let mut rounds = 0;
            loop {
                let Cursor::StartAt(start) = cursor.clone() else { unreachable!() };
                let fetched = page.min(total.saturating_sub(start) as usize);
                seen += fetched as u64;
                rounds += 1;
                prop_assert!(rounds <= 1_001);
                match next_cursor(&cursor, fetched, Some(total), None, None) {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
            prop_assert_eq!(seen, total);
        }
    }
}
