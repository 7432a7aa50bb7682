use crate::models::{ChangeEvent, Comment, TicketDetail, TicketSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("ticket {0} not found")]
    NotFound(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Read-only access to the ticket tracker.
///
/// Every call is blocking and independent; implementations must not cache
/// across calls.
pub trait TicketTracker {
    /// All tickets matching `jql`, across every page.
    fn search(&self, jql: &str, fields: &[String]) -> Result<Vec<TicketSnapshot>, TrackerError>;

    fn get(&self, key: &str, fields: &[String]) -> Result<TicketDetail, TrackerError>;

    /// Field changes for `key`, oldest first.
    fn status_history(&self, key: &str) -> Result<Vec<ChangeEvent>, TrackerError>;

    fn comments(&self, key: &str) -> Result<Vec<Comment>, TrackerError>;

    /// Display name of the authenticated account.
    fn whoami(&self) -> Result<String, TrackerError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::fields::FieldValue;
    use crate::models::{IssueLink, LinkDirection};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    pub fn snapshot(key: &str, created: NaiveDateTime, status: &str, links: &[&str]) -> TicketSnapshot {
        TicketSnapshot {
            key: key.to_string(),
            created: Some(created),
            status: status.to_string(),
            links: links
                .iter()
                .map(|k| IssueLink {
                    key: k.to_string(),
                    direction: LinkDirection::Outward,
                    link_type: "Relates".to_string(),
                })
                .collect(),
            fields: HashMap::new(),
        }
    }

    pub fn detail(key: &str, created: Option<NaiveDateTime>, fields: &[(&str, FieldValue)]) -> TicketDetail {
        TicketDetail {
            key: key.to_string(),
            created,
            fields: fields
                .iter()
                .map(|(id, v)| (id.to_string(), v.clone()))
                .collect(),
        }
    }

    pub fn status_change(to: &str, at: NaiveDateTime) -> ChangeEvent {
        ChangeEvent {
            field: "status".to_string(),
            to_value: Some(to.to_string()),
            at: Some(at),
        }
    }

    /// In-memory tracker that records how often each key is fetched.
    #[derive(Default)]
    pub struct FakeTracker {
        pub tickets: Vec<TicketSnapshot>,
        pub details: HashMap<String, TicketDetail>,
        pub histories: HashMap<String, Vec<ChangeEvent>>,
        pub comments: HashMap<String, Vec<Comment>>,
        pub broken: HashSet<String>,
        pub search_fails: bool,
        pub fetches: RefCell<Vec<String>>,
        pub queries: RefCell<Vec<String>>,
    }

    impl FakeTracker {
        fn check(&self, key: &str) -> Result<(), TrackerError> {
            self.fetches.borrow_mut().push(key.to_string());
            if self.broken.contains(key) {
                return Err(TrackerError::Http {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    impl TicketTracker for FakeTracker {
        fn search(&self, jql: &str, _fields: &[String]) -> Result<Vec<TicketSnapshot>, TrackerError> {
            self.queries.borrow_mut().push(jql.to_string());
            if self.search_fails {
                return Err(TrackerError::Http {
                    status: 401,
                    body: "unauthorized".to_string(),
                });
            }
            Ok(self.tickets.clone())
        }

        fn get(&self, key: &str, _fields: &[String]) -> Result<TicketDetail, TrackerError> {
            self.check(key)?;
            self.details
                .get(key)
                .cloned()
                .ok_or_else(|| TrackerError::NotFound(key.to_string()))
        }

        fn status_history(&self, key: &str) -> Result<Vec<ChangeEvent>, TrackerError> {
            self.check(key)?;
            Ok(self.histories.get(key).cloned().unwrap_or_default())
        }

        fn comments(&self, key: &str) -> Result<Vec<Comment>, TrackerError> {
            self.check(key)?;
            Ok(self.comments.get(key).cloned().unwrap_or_default())
        }

        fn whoami(&self) -> Result<String, TrackerError> {
            Ok("Test User".to_string())
        }
    }
}
