use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{Config, CONFIG_DIR, CONFIG_FILE};

pub fn run(path: &Path, force: bool) -> Result<()> {
    let config_dir = path.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);
    let exists = config_path.exists();

    if exists && !force {
        println!("Already initialized at {}", path.display());
        println!("Use --force to reset the SLA definitions to the defaults.");
        return Ok(());
    }

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {} directory", CONFIG_DIR))?;
    Config::default().save(&config_path)?;

    if exists {
        println!("Reset {} to the default SLA definitions", config_path.display());
    } else {
        println!("Created {}", config_path.display());
    }

    println!("\nNext steps:");
    println!("  export JIRA_BASE_URL=https://your-site.atlassian.net");
    println!("  export JIRA_EMAIL=you@example.com");
    println!("  export JIRA_TOKEN=...");
    println!("  slacheck whoami        # Verify the connection");
    println!("  slacheck check         # Run every SLA");

    Ok(())
}
