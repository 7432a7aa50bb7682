use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::commands::check::{newest_first, status_label, summaries};
use crate::config::{Config, DateRange};
use crate::models::{SlaResult, SlaSummary};
use crate::tracker::TicketTracker;

#[derive(Serialize, Deserialize)]
pub struct ExportedSummary {
    pub sla_name: String,
    pub target_days: i64,
    pub total: usize,
    pub met: usize,
    pub breached: usize,
    pub in_progress: usize,
    /// Absent when nothing has resolved yet.
    pub compliance_rate: Option<f64>,
    pub results: Vec<SlaResult>,
}

#[derive(Serialize, Deserialize)]
pub struct ExportData {
    pub version: i32,
    pub exported_at: String,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub summaries: Vec<ExportedSummary>,
}

fn export_summary(summary: &SlaSummary) -> ExportedSummary {
    ExportedSummary {
        sla_name: summary.sla_name.clone(),
        target_days: summary.target_days,
        total: summary.total_count(),
        met: summary.met_count(),
        breached: summary.breached_count(),
        in_progress: summary.in_progress_count(),
        compliance_rate: (summary.resolved_count() > 0).then(|| summary.compliance_rate()),
        results: newest_first(summary).into_iter().cloned().collect(),
    }
}

pub fn run<T: TicketTracker>(
    tracker: &T,
    config: &Config,
    ids: &[String],
    range: DateRange,
    format: &str,
    output_path: Option<&str>,
) -> Result<()> {
    let format = format.to_lowercase();
    if format != "json" && format != "markdown" && format != "md" {
        bail!("Unknown export format '{}'. Use 'json' or 'markdown'.", format);
    }

    let results = summaries(tracker, config, ids, range)?;
    if format == "json" {
        run_json(&results, range, output_path)
    } else {
        run_markdown(&results, range, output_path)
    }
}

pub fn run_json(summaries: &[SlaSummary], range: DateRange, output_path: Option<&str>) -> Result<()> {
    let data = ExportData {
        version: 1,
        exported_at: chrono::Utc::now().to_rfc3339(),
        date_from: range.from.map(|d| d.to_string()),
        date_to: range.to.map(|d| d.to_string()),
        summaries: summaries.iter().map(export_summary).collect(),
    };

    let json = serde_json::to_string_pretty(&data)?;
    emit(&json, data.summaries.len(), output_path)
}

pub fn run_markdown(summaries: &[SlaSummary], range: DateRange, output_path: Option<&str>) -> Result<()> {
    let mut md = String::new();

    md.push_str("# SLA Compliance Report\n\n");
    md.push_str(&format!(
        "Exported: {}\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !range.is_empty() {
        md.push_str(&format!(
            "Date range: {} to {}\n\n",
            range.from.map_or("start".to_string(), |d| d.to_string()),
            range.to.map_or("now".to_string(), |d| d.to_string()),
        ));
    }

    for summary in summaries {
        write_summary_md(&mut md, summary);
    }

    emit(&md, summaries.len(), output_path)
}

fn emit(content: &str, count: usize, output_path: Option<&str>) -> Result<()> {
    match output_path {
        Some(path) => {
            fs::write(path, content).context("Failed to write export file")?;
            eprintln!("Exported {} SLA summaries to {}", count, path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", content)?;
        }
    }
    Ok(())
}

fn write_summary_md(md: &mut String, summary: &SlaSummary) {
    md.push_str(&format!("## {}\n\n", summary.sla_name));
    md.push_str(&format!("- **Target:** {} days\n", summary.target_days));
    md.push_str(&format!("- **Met:** {}\n", summary.met_count()));
    md.push_str(&format!("- **Breached:** {}\n", summary.breached_count()));
    md.push_str(&format!("- **In Progress:** {}\n", summary.in_progress_count()));
    md.push_str(&format!("- **Total:** {}\n", summary.total_count()));
    if summary.resolved_count() > 0 {
        md.push_str(&format!(
            "- **Compliance:** {:.1}%\n",
            summary.compliance_rate()
        ));
    }
    md.push('\n');

    if summary.results.is_empty() {
        md.push_str("No tickets found.\n\n---\n\n");
        return;
    }

    md.push_str("| Source | Created | Source of ID | Target | Resolved | Days | Status |\n");
    md.push_str("|---|---|---|---|---|---|---|\n");
    for result in newest_first(summary) {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            result.source_ticket,
            result.created_date.format("%Y-%m-%d"),
            escape_cell(&result.source_of_identification),
            result.target_ticket.as_deref().unwrap_or("--"),
            result
                .resolved_date
                .map_or("--".to_string(), |d| d.format("%Y-%m-%d").to_string()),
            result
                .elapsed_time_str
                .clone()
                .unwrap_or_else(|| result.days_elapsed.to_string()),
            status_label(result.status)
        ));
    }

    md.push_str("\n---\n\n");
}

fn escape_cell(value: &str) -> String {
    if value.is_empty() {
        "--".to_string()
    } else {
        value.replace('|', "\\|")
    }
}
