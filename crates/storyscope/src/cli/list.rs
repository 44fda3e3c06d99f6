//! List command - every known batch, oldest first

use crate::cli::output::{batch_state, format_percent, format_timestamp, print_json, print_table};
use crate::cli::session::Session;
use storyscope_batch::BatchStatus;

#[derive(Debug)]
pub struct ListArgs {
    pub json: bool,
}

pub fn run(session: &Session, args: ListArgs) -> anyhow::Result<()> {
    let tracker = session.tracker()?;
    let statuses: Vec<BatchStatus> = tracker
        .list()?
        .into_iter()
        .map(BatchStatus::from_batch)
        .collect();

    if args.json {
        return print_json(&statuses);
    }
    if statuses.is_empty() {
        println!("No batches yet. Start one with: storyscope submit <files...>");
        return Ok(());
    }

    let rows = statuses
        .iter()
        .map(|status| {
            vec![
                status.batch.id.to_string(),
                format_timestamp(status.batch.started_at),
                status.batch.total_files.to_string(),
                status.completed_files.to_string(),
                status.batch.failed_files.to_string(),
                format_percent(status.progress),
                batch_state(status).to_string(),
            ]
        })
        .collect();

    print_table(
        &["Batch", "Started", "Files", "Completed", "Failed", "Progress", "State"],
        rows,
    );
    Ok(())
}
