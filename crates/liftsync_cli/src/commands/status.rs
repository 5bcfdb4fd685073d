//! Status command implementation.

use super::open_queue;
use liftsync_engine::summarize;
use liftsync_queue::{QueueStore, RecordStatus, SyncRecord};
use serde::Serialize;
use std::path::Path;

/// Queue status report.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Queue path.
    pub path: String,
    /// Pending records, including interrupted ones.
    pub pending: usize,
    /// Records interrupted mid-sync.
    pub in_flight: usize,
    /// Failed records.
    pub failed: usize,
    /// Highest attempt count of any record.
    pub max_attempts: u32,
}

impl StatusReport {
    /// Builds a report from queue contents.
    pub fn from_records(path: &Path, records: &[SyncRecord]) -> Self {
        let status = summarize(records);
        Self {
            path: path.display().to_string(),
            pending: status.pending,
            in_flight: records
                .iter()
                .filter(|r| r.status == RecordStatus::InFlight)
                .count(),
            failed: status.failed,
            max_attempts: records.iter().map(|r| r.attempts).max().unwrap_or(0),
        }
    }
}

/// Runs the status command.
pub async fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_queue(path)?;
    let report = StatusReport::from_records(path, &store.list().await?);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print!("{}", render_text(&report));
        }
    }

    Ok(())
}

fn render_text(report: &StatusReport) -> String {
    let mut out = format!("Queue: {}\n", report.path);
    out.push_str(&format!("  Pending:   {}\n", report.pending));
    if report.in_flight > 0 {
        out.push_str(&format!(
            "  In flight: {} (run `liftsync recover` if the client is stopped)\n",
            report.in_flight
        ));
    }
    out.push_str(&format!("  Failed:    {}\n", report.failed));
    out.push_str(&format!("  Max attempts: {}\n", report.max_attempts));
    out
}


