use anyhow::Result;

use crate::config::{Config, SlaDefinition};

pub fn run(config: &Config) -> Result<()> {
    if config.slas.is_empty() {
        println!("No SLAs configured.");
        return Ok(());
    }

    for sla in &config.slas {
        println!("{}", describe(sla));
    }
    Ok(())
}

fn describe(sla: &SlaDefinition) -> String {
    let unit = if sla.use_business_days {
        "business days"
    } else {
        "days"
    };
    let mut out = format!(
        "{}\n  {}\n  {} -> {}, {} = {}\n  Target: {} {}; stops when {}",
        sla.id,
        sla.name,
        sla.source_project,
        sla.target_project,
        sla.health_plan_field,
        sla.health_plan_value,
        sla.target_days,
        unit,
        sla.resolution.describe()
    );
    if !sla.description.is_empty() {
        out.push_str(&format!("\n  {}", sla.description));
    }
    out.push('\n');
    out
}
