use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::debug;

use slacheck::commands;
use slacheck::config::{find_config_file, Config, DateRange};
use slacheck::jira::{JiraClient, JiraClientConfig};
use slacheck::logging;

#[derive(Parser)]
#[command(name = "slacheck")]
#[command(about = "SLA compliance checker for Jira ticket handoffs")]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (default: nearest .slacheck/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Credentials {
    /// Jira site, e.g. https://your-site.atlassian.net
    #[arg(long, env = "JIRA_BASE_URL")]
    base_url: String,

    #[arg(long, env = "JIRA_EMAIL")]
    email: String,

    /// Jira API token
    #[arg(long, env = "JIRA_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Args)]
struct Selection {
    /// SLA id to run (repeatable; default: all)
    #[arg(long = "sla")]
    slas: Vec<String>,

    /// Only tickets created on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    from: Option<NaiveDate>,

    /// Only tickets created on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    to: Option<NaiveDate>,
}

impl Selection {
    fn range(&self) -> Result<DateRange> {
        let range = DateRange {
            from: self.from,
            to: self.to,
        };
        range.validate()?;
        Ok(range)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default SLA definitions to .slacheck/config.json
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// List configured SLA definitions
    Slas,

    /// Verify the Jira connection
    Whoami {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Run SLA checks and print the dashboard
    Check {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Run SLA checks and export the summaries
    Export {
        /// Output format (json, markdown)
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        credentials: Credentials,
    },
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("'{}' is not a YYYY-MM-DD date", s))
}

fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path),
        None => find_config_file(&env::current_dir()?),
    };

    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            Config::load(&path)
        }
        None => {
            debug!("no config file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn connect(credentials: Credentials, config: &Config) -> Result<JiraClient> {
    JiraClient::new(JiraClientConfig {
        base_url: credentials.base_url,
        email: credentials.email,
        api_token: credentials.token,
        timeout_secs: config.http_timeout_secs,
    })
    .context("Failed to build the Jira client")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd, force)
        }

        Commands::Slas => {
            let config = load_config(cli.config)?;
            commands::slas::run(&config)
        }

        Commands::Whoami { credentials } => {
            let config = load_config(cli.config)?;
            let client = connect(credentials, &config)?;
            commands::whoami::run(&client)
        }

        Commands::Check {
            selection,
            credentials,
        } => {
            let config = load_config(cli.config)?;
            let client = connect(credentials, &config)?;
            commands::check::run(&client, &config, &selection.slas, selection.range()?)
        }

        Commands::Export {
            format,
            output,
            selection,
            credentials,
        } => {
            let config = load_config(cli.config)?;
            let client = connect(credentials, &config)?;
            commands::export::run(
                &client,
                &config,
                &selection.slas,
                selection.range()?,
                &format,
                output.as_deref(),
            )
        }
    }
}
