//! Output formatting for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::controller::PolicyReport;

/// One line of `once` output
#[derive(Debug, Serialize)]
pub struct ReportRow {
    pub policy: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PolicyReport> for ReportRow {
    fn from(report: &PolicyReport) -> Self {
        match &report.result {
            Ok(outcome) => Self {
                policy: report.policy.clone(),
                status: if outcome.is_rotated() { "rotated" } else { "waiting" },
                credential_id: outcome.rotated.clone(),
                wait_seconds: Some(outcome.requeue_after.as_secs()),
                error: None,
            },
            Err(e) => Self {
                policy: report.policy.clone(),
                status: "failed",
                credential_id: None,
                wait_seconds: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// One line of `check` output
#[derive(Debug, Serialize)]
pub struct ScheduleRow {
    pub policy: String,
    pub identity: String,
    pub secret: String,
    pub interval_minutes: u64,
    pub last_rotation_time: Option<DateTime<Utc>>,
    /// `None` means due now
    pub next_run: Option<DateTime<Utc>>,
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Format a wait as `1h 5m 3s`, dropping leading zero units
pub fn format_wait(seconds: u64) -> String {
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, _) => format!("{}m {}s", minutes, secs),
        _ => format!("{}h {}m {}s", hours, minutes, secs),
    }
}

/// Print `once` results as a table
pub fn print_report_table(rows: &[ReportRow]) {
    if rows.is_empty() {
        println!("No policies configured");
        return;
    }

    println!();
    println!("{:<30} {:<10} {:<24} {}", "Policy", "Status", "Credential", "Next / Error");
    println!("{}", "-".repeat(90));

    for row in rows {
        let detail = match (&row.error, row.wait_seconds) {
            (Some(error), _) => error.clone(),
            (None, Some(wait)) => format!("in {}", format_wait(wait)),
            (None, None) => String::new(),
        };
        println!(
            "{:<30} {:<10} {:<24} {}",
            truncate(&row.policy, 28),
            row.status,
            row.credential_id.as_deref().unwrap_or("-"),
            detail
        );
    }
    println!();
}

/// Print `check` results as a table
pub fn print_schedule_table(rows: &[ScheduleRow]) {
    if rows.is_empty() {
        println!("No policies configured");
        return;
    }

    println!();
    println!(
        "{:<30} {:<20} {:<24} {:<10} {:<22} {}",
        "Policy", "Identity", "Secret", "Interval", "Last rotation", "Next run"
    );
    println!("{}", "-".repeat(130));

    for row in rows {
        println!(
            "{:<30} {:<20} {:<24} {:<10} {:<22} {}",
            truncate(&row.policy, 28),
            truncate(&row.identity, 18),
            truncate(&row.secret, 22),
            format!("{}m", row.interval_minutes),
            row.last_rotation_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string()),
            row.next_run
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "now".to_string()),
        );
    }
    println!();
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
