//! List command implementation.

use super::open_queue;
use liftsync_queue::{QueueStore, RecordStatus, SyncRecord};
use std::path::Path;

/// Runs the list command.
pub async fn run(
    path: &Path,
    failed_only: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_queue(path)?;
    let records: Vec<SyncRecord> = store
        .list()
        .await?
        .into_iter()
        .filter(|r| !failed_only || r.status == RecordStatus::Failed)
        .collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            if records.is_empty() {
                println!("No records");
            }
            for record in &records {
                println!("{}", render_line(record));
            }
        }
    }

    Ok(())
}

fn render_line(record: &SyncRecord) -> String {
    let mut line = format!(
        "{}  {:<9} {:<6} {}/{}  attempts={}",
        record.id,
        record.status.to_string(),
        record.operation.to_string(),
        record.entity_type,
        record.entity_id,
        record.attempts,
    );
    if let Some(dependency) = &record.depends_on {
        line.push_str(&format!("  after={dependency}"));
    }
    if let Some(error) = &record.last_error {
        line.push_str(&format!("\n    error: {error}"));
    }
    line
}


