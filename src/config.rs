use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".slacheck";
pub const CONFIG_FILE: &str = "config.json";

const SOURCE_PROJECT: &str = "ACS";
const TARGET_PROJECT: &str = "LPM";
const HEALTH_PLAN_FIELD_NAME: &str = "Health plan (migrated)";
const HEALTH_PLAN_VALUE: &str = "BCBSLA";
const INTERNAL_ACCOUNT_TYPE: &str = "atlassian";

/// Logical field name -> tracker custom field id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub health_plan: String,
    pub category: String,
    pub source_of_identification: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        FieldMap {
            health_plan: "customfield_10151".to_string(),
            category: "customfield_10356".to_string(),
            source_of_identification: "customfield_10358".to_string(),
        }
    }
}

/// What stops the SLA clock for a source ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionPredicate {
    /// A linked target ticket whose category field equals `category`.
    CategoryMatch { category: String },
    /// A linked target ticket that transitions into `status`.
    StatusReached { status: String },
    /// A linked target ticket whose date field `field_id` is populated.
    DoneDateField { field_id: String },
    /// The first public comment written by an internal account.
    FirstResponse {
        #[serde(default = "default_internal_account_type")]
        internal_account_type: String,
    },
}

impl ResolutionPredicate {
    pub fn follows_links(&self) -> bool {
        !matches!(self, ResolutionPredicate::FirstResponse { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            ResolutionPredicate::CategoryMatch { category } => {
                format!("linked ticket category is '{}'", category)
            }
            ResolutionPredicate::StatusReached { status } => {
                format!("linked ticket reaches status '{}'", status)
            }
            ResolutionPredicate::DoneDateField { field_id } => {
                format!("linked ticket has {} set", field_id)
            }
            ResolutionPredicate::FirstResponse { .. } => {
                "first public comment by an internal user".to_string()
            }
        }
    }
}

fn default_internal_account_type() -> String {
    INTERNAL_ACCOUNT_TYPE.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_project: String,
    pub target_project: String,
    /// Field name as written in a query, e.g. `Health plan (migrated)`.
    pub health_plan_field: String,
    pub health_plan_value: String,
    pub resolution: ResolutionPredicate,
    pub target_days: i64,
    #[serde(default = "default_true")]
    pub use_business_days: bool,
}

/// Optional creation-date window for source tickets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                bail!("--from {} is after --to {}", from, to);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fields: FieldMap,
    /// Source statuses that drop an unlinked ticket from the summary.
    pub closed_statuses: Vec<String>,
    pub slas: Vec<SlaDefinition>,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fields: FieldMap::default(),
            closed_statuses: vec![
                "closed".to_string(),
                "resolved".to_string(),
                "canceled".to_string(),
            ],
            slas: default_slas(),
            http_timeout_secs: 30,
        }
    }
}

fn default_slas() -> Vec<SlaDefinition> {
    let base = |id: &str,
                name: &str,
                description: &str,
                resolution: ResolutionPredicate,
                target_days: i64| SlaDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        source_project: SOURCE_PROJECT.to_string(),
        target_project: TARGET_PROJECT.to_string(),
        health_plan_field: HEALTH_PLAN_FIELD_NAME.to_string(),
        health_plan_value: HEALTH_PLAN_VALUE.to_string(),
        resolution,
        target_days,
        use_business_days: true,
    };

    vec![
        base(
            "identification_resolution_config",
            "Identification of Resolution for Configuration Issues",
            "Time from ACS ticket creation to linked LPM ticket with category 'break fix'",
            ResolutionPredicate::CategoryMatch {
                category: "break fix".to_string(),
            },
            30,
        ),
        base(
            "resolution_config",
            "Resolution of Configuration Issues",
            "Time from ACS ticket creation to linked LPM ticket reaching 'ready to build' status",
            ResolutionPredicate::StatusReached {
                status: "ready to build".to_string(),
            },
            60,
        ),
        base(
            "first_response",
            "Time to First Response",
            "Time from ACS ticket creation to the first public comment by an internal user",
            ResolutionPredicate::FirstResponse {
                internal_account_type: default_internal_account_type(),
            },
            2,
        ),
    ]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 {
            bail!("http_timeout_secs must be at least 1");
        }
        for (i, sla) in self.slas.iter().enumerate() {
            if sla.target_days < 0 {
                bail!("SLA '{}' has a negative target_days", sla.id);
            }
            if self.slas[..i].iter().any(|other| other.id == sla.id) {
                bail!("SLA id '{}' is defined more than once", sla.id);
            }
        }
        Ok(())
    }

    pub fn sla(&self, id: &str) -> Option<&SlaDefinition> {
        self.slas.iter().find(|s| s.id == id)
    }

    /// Definitions named by `ids`, or all of them when `ids` is empty.
    pub fn select(&self, ids: &[String]) -> Result<Vec<&SlaDefinition>> {
        if ids.is_empty() {
            return Ok(self.slas.iter().collect());
        }
        ids.iter()
            .map(|id| match self.sla(id) {
                Some(sla) => Ok(sla),
                None => bail!("Unknown SLA '{}'. Run 'slacheck slas' to list them.", id),
            })
            .collect()
    }
}

/// Walk up from `start` looking for `.slacheck/config.json`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}
