//! Status command - show one batch and its files

use crate::cli::error::HelpfulError;
use crate::cli::output::{
    batch_state, format_percent, format_timestamp, print_json, print_table_colored, status_color,
};
use crate::cli::session::{parse_batch_id, Session};
use storyscope_batch::BatchStatus;

#[derive(Debug)]
pub struct StatusArgs {
    pub batch_id: String,
    pub json: bool,
}

pub fn run(session: &Session, args: StatusArgs) -> anyhow::Result<()> {
    let id = parse_batch_id(&args.batch_id)?;
    let tracker = session.tracker()?;
    let batch = tracker
        .snapshot(&id)
        .map_err(HelpfulError::from_batch_error)?
        .ok_or_else(|| HelpfulError::batch_not_found(&id))?;
    let status = BatchStatus::from_batch(batch);

    if args.json {
        return print_json(&status);
    }
    print_status(&status);
    Ok(())
}

/// Human-readable batch summary followed by a per-file table.
pub fn print_status(status: &BatchStatus) {
    let batch = &status.batch;
    println!("Batch {}  ({})", batch.id, batch_state(status));
    println!(
        "  Started:   {}",
        format_timestamp(batch.started_at)
    );
    if let Some(done) = batch.completed_at {
        println!("  Finished:  {}", format_timestamp(done));
    }
    println!(
        "  Progress:  {} ({}/{} completed, {} failed)",
        format_percent(status.progress),
        status.completed_files,
        batch.total_files,
        batch.failed_files
    );
    println!();

    let rows = batch
        .filenames()
        .into_iter()
        .filter_map(|name| batch.file(name).map(|record| (name, record)))
        .map(|(name, record)| {
            vec![
                (name.to_string(), None),
                (record.status.to_string(), Some(status_color(record.status))),
                (record.attempts.to_string(), None),
                (format_percent(record.blended_progress()), None),
                (record.current_operation.clone(), None),
                (
                    record
                        .analysis_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    None,
                ),
                (record.error.clone().unwrap_or_default(), None),
            ]
        })
        .collect();

    print_table_colored(
        &["File", "Status", "Attempts", "Progress", "Operation", "Record", "Error"],
        rows,
    );
}
