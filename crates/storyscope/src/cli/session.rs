//! Shared command plumbing: resolved home, config, and the objects commands
//! operate on.

use crate::cli::error::HelpfulError;
use crate::config::{load_config, StoryscopeConfig, CONFIG_FILE};
use crate::host::{CommandAnalyzer, JsonRecordRepository};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storyscope_batch::{BatchId, BatchStatus, BatchTracker, Orchestrator, StatusStore};
use tracing::{info, warn};

/// How often `wait_for_batch` reports progress.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

pub struct Session {
    pub home: PathBuf,
    pub config: StoryscopeConfig,
}

impl Session {
    pub fn load(home: PathBuf) -> Result<Self> {
        let config = load_config(&home).map_err(|e| {
            HelpfulError::new(format!("Failed to load configuration: {}", e))
                .with_context(format!("Config file: {}", home.join(CONFIG_FILE).display()))
                .with_suggestion("TRY: Fix the file, or move it aside to use defaults")
        })?;
        Ok(Self { home, config })
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// Tracker over the status directory, for commands that do not process
    /// files.
    pub fn tracker(&self) -> Result<BatchTracker> {
        let paths = self.config.paths(&self.home);
        let store = StatusStore::new(&paths.data_dir)?;
        Ok(BatchTracker::new(store))
    }

    /// Full orchestrator with the configured analyzer and record store.
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let analyzer_config = &self.config.analyzer;
        let program = analyzer_config
            .program
            .clone()
            .ok_or_else(|| HelpfulError::no_analyzer(&self.config_path()))?;
        let analyzer = CommandAnalyzer::new(
            program,
            analyzer_config.args.clone(),
            Duration::from_secs(analyzer_config.timeout_secs),
        );

        let paths = self.config.paths(&self.home);
        let repository = JsonRecordRepository::open(&paths.records_dir)?;

        Orchestrator::new(
            self.config.orchestrator_config(&self.home),
            Arc::new(analyzer),
            Arc::new(repository),
        )
        .context("Failed to initialize batch orchestrator")
    }
}

pub fn parse_batch_id(raw: &str) -> Result<BatchId> {
    BatchId::parse(raw).map_err(|e| HelpfulError::invalid_batch_id(raw, e).into())
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Wait for every run to finish, reporting progress on stderr.
///
/// Ctrl-C cancels the batch and shuts the orchestrator down; the in-flight
/// file gets up to `shutdown_timeout` to finish.
pub async fn wait_for_batch(
    orch: &Orchestrator,
    id: &BatchId,
    quiet: bool,
    shutdown_timeout: Duration,
) -> Result<BatchStatus> {
    let idle = orch.wait_idle();
    tokio::pin!(idle);
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut idle => break,
            _ = ticker.tick() => {
                if !quiet {
                    if let Ok(status) = orch.status(id) {
                        report_progress(&status);
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                eprintln!("Interrupted; cancelling batch {}...", id);
                if let Err(e) = orch.cancel(id) {
                    warn!("Failed to cancel batch {}: {}", id, e);
                }
                let report = orch.shutdown(shutdown_timeout).await;
                info!(
                    "Shutdown after interrupt: {} finished, {} aborted",
                    report.finished, report.aborted
                );
                break;
            }
        }
    }

    Ok(orch.status(id).map_err(HelpfulError::from_batch_error)?)
}

fn report_progress(status: &BatchStatus) {
    let done = status.batch.processed_files + status.batch.failed_files;
    eprintln!(
        "  {}/{} files done ({:.0}%), {} failed",
        done, status.batch.total_files, status.progress, status.batch.failed_files
    );
}

/// Check the input paths before anything is submitted.
pub fn ensure_files_exist(paths: &[PathBuf]) -> Result<()> {
    if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
        return Err(file_not_found(missing).into());
    }
    Ok(())
}

fn file_not_found(path: &Path) -> HelpfulError {
    HelpfulError::new(format!("File not found: {}", path.display()))
        .with_context("Each argument must be an existing media file")
        .with_suggestion(format!("TRY: Check the path: ls -la {}", path.display()))
}
