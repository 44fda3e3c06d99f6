//! Retry command - reset failed files of a batch and process them again

use crate::cli::error::HelpfulError;
use crate::cli::output::print_json;
use crate::cli::session::{parse_batch_id, runtime, wait_for_batch, Session};
use crate::cli::status::print_status;
use std::time::Duration;

#[derive(Debug)]
pub struct RetryArgs {
    pub batch_id: String,
    pub json: bool,
}

pub fn run(session: &Session, args: RetryArgs) -> anyhow::Result<()> {
    let id = parse_batch_id(&args.batch_id)?;
    let orch = session.orchestrator()?;

    let rt = runtime()?;
    rt.block_on(async {
        let receipt = orch.retry(&id).map_err(HelpfulError::from_batch_error)?;
        if !args.json {
            println!(
                "Retrying batch {}: {} failed file(s) reset, {} stale file(s) recovered",
                id, receipt.reset_files, receipt.recovered_files
            );
        }

        let status = wait_for_batch(
            &orch,
            &id,
            args.json,
            Duration::from_secs(crate::SHUTDOWN_TIMEOUT_SECS),
        )
        .await?;

        if args.json {
            print_json(&status)
        } else {
            println!();
            print_status(&status);
            Ok(())
        }
    })
}
