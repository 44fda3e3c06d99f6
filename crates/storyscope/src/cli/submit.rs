//! Submit command - upload media files as one batch and process them

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_size, print_json};
use crate::cli::session::{ensure_files_exist, runtime, wait_for_batch, Session};
use crate::cli::status::print_status;
use std::path::PathBuf;
use std::time::Duration;
use storyscope_batch::Upload;
use tracing::info;

#[derive(Debug)]
pub struct SubmitArgs {
    pub files: Vec<PathBuf>,
    pub json: bool,
}

pub fn run(session: &Session, args: SubmitArgs) -> anyhow::Result<()> {
    ensure_files_exist(&args.files)?;
    let orch = session.orchestrator()?;
    let uploads: Vec<Upload> = args.files.iter().cloned().map(Upload::from_path).collect();

    let rt = runtime()?;
    rt.block_on(async {
        let mut total_bytes = 0u64;
        for upload in &uploads {
            total_bytes += upload.size().await?;
        }

        let receipt = orch
            .submit(uploads)
            .await
            .map_err(HelpfulError::from_submit_error)?;
        info!(
            "Submitted batch {} ({} files, {})",
            receipt.batch_id,
            receipt.files.len(),
            format_size(total_bytes)
        );

        if !args.json {
            println!(
                "Batch {} accepted: {} file(s)",
                receipt.batch_id,
                receipt.files.len()
            );
            if !receipt.duplicates.is_empty() {
                println!(
                    "Skipped (already analyzed): {}",
                    receipt.duplicates.join(", ")
                );
            }
        }

        let status = wait_for_batch(
            &orch,
            &receipt.batch_id,
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
