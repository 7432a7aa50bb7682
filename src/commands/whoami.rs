use anyhow::{Context, Result};

use crate::tracker::TicketTracker;

pub fn run<T: TicketTracker>(tracker: &T) -> Result<()> {
    let name = tracker
        .whoami()
        .context("Failed to connect to Jira. Check JIRA_BASE_URL, JIRA_EMAIL and JIRA_TOKEN.")?;
    println!("Connected as: {}", name);
    Ok(())
}
