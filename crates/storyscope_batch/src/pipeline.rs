//! Batch Pipeline - drains eligible files through analysis and persistence
//!
//! One run processes a batch strictly sequentially, in submission order,
//! until nothing is eligible, the batch is cancelled, or the host shuts
//! down. Runs against the same batch are serialized by a per-batch run lock,
//! so a retry launched while a run is active queues behind it.
//!
//! After the run lock is released the pipeline waits (bounded) for the
//! batch's payloads to disappear, then force-removes what is left for files
//! that are already terminal. Payloads are scoped to their batch, so this
//! never touches another batch's files.

use crate::analysis::{AnalysisRepository, AnalyzerError, ContentAnalyzer};
use crate::batch::{operation, FailureOutcome, ProgressUpdate};
use crate::error::{BatchError, Result};
use crate::payload::PayloadStore;
use crate::policy::{mime_type_for, title_from_filename, FileKind};
use crate::tracker::BatchTracker;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storyscope_ids::{BatchId, RecordId};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CLEANUP_GRACE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_CLEANUP_POLL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on the post-run wait for payloads to be released.
    pub cleanup_grace: Duration,
    pub cleanup_poll: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleanup_grace: DEFAULT_CLEANUP_GRACE,
            cleanup_poll: DEFAULT_CLEANUP_POLL,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing left to process.
    Drained,
    Cancelled,
    /// Host shutdown was requested.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub completed: usize,
    /// Failed attempts, retryable or not.
    pub failures: usize,
}

/// Per-attempt failure. The display string is what ends up in the file's
/// `error` field.
#[derive(Debug, Error)]
enum FileFailure {
    #[error("File not found before processing")]
    MissingPayload,

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Failed to check existing analyses: {0:#}")]
    Lookup(anyhow::Error),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error("Failed to save analysis: {0:#}")]
    Persist(anyhow::Error),
}

enum FileOutcome {
    Completed,
    Failed,
    Skipped,
}

pub struct BatchPipeline {
    tracker: Arc<BatchTracker>,
    payloads: PayloadStore,
    analyzer: Arc<dyn ContentAnalyzer>,
    repository: Arc<dyn AnalysisRepository>,
    config: PipelineConfig,
    run_locks: Mutex<HashMap<BatchId, Arc<tokio::sync::Mutex<()>>>>,
}

impl BatchPipeline {
    pub fn new(
        tracker: Arc<BatchTracker>,
        payloads: PayloadStore,
        analyzer: Arc<dyn ContentAnalyzer>,
        repository: Arc<dyn AnalysisRepository>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            tracker,
            payloads,
            analyzer,
            repository,
            config,
            run_locks: Mutex::new(HashMap::new()),
        }
    }

    fn run_lock(&self, id: &BatchId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .run_locks
            .lock()
            .map_err(|_| BatchError::Poisoned(id.clone()))?;
        Ok(Arc::clone(locks.entry(id.clone()).or_default()))
    }

    /// Forget the run lock when no other run holds or waits on it.
    fn release_run_lock(&self, id: &BatchId, lock: Arc<tokio::sync::Mutex<()>>) {
        if let Ok(mut locks) = self.run_locks.lock() {
            // One reference in the map plus ours.
            if Arc::strong_count(&lock) == 2 {
                locks.remove(id);
            }
        }
    }

    /// Process the batch until nothing is eligible, then run the payload
    /// grace cleanup.
    pub async fn run(&self, id: &BatchId, shutdown: CancellationToken) -> Result<RunSummary> {
        let lock = self.run_lock(id)?;
        let summary = {
            let _guard = lock.lock().await;
            debug!("Batch {}: run started", id);
            self.drain(id, &shutdown).await
        };
        self.release_run_lock(id, lock);
        let summary = summary?;

        info!(
            "Batch {} run ended ({:?}): {} completed, {} failed attempts",
            id, summary.outcome, summary.completed, summary.failures
        );

        match self.cleanup_after_grace(id, &shutdown).await {
            Ok(0) => {}
            Ok(removed) => info!("Batch {}: removed {} leftover payloads", id, removed),
            Err(e) => warn!("Batch {}: payload cleanup failed: {}", id, e),
        }
        Ok(summary)
    }

    async fn drain(&self, id: &BatchId, shutdown: &CancellationToken) -> Result<RunSummary> {
        let mut summary = RunSummary {
            outcome: RunOutcome::Drained,
            completed: 0,
            failures: 0,
        };

        loop {
            let eligible = self.tracker.eligible_files(id)?;
            if eligible.is_empty() {
                if self.tracker.is_cancelled(id)? {
                    summary.outcome = RunOutcome::Cancelled;
                }
                return Ok(summary);
            }

            for filename in eligible {
                if shutdown.is_cancelled() {
                    summary.outcome = RunOutcome::Interrupted;
                    return Ok(summary);
                }
                if self.tracker.is_cancelled(id)? {
                    summary.outcome = RunOutcome::Cancelled;
                    return Ok(summary);
                }

                match self.process_file(id, &filename).await? {
                    FileOutcome::Completed => summary.completed += 1,
                    FileOutcome::Failed => summary.failures += 1,
                    FileOutcome::Skipped => {}
                }
            }
        }
    }

    async fn process_file(&self, id: &BatchId, filename: &str) -> Result<FileOutcome> {
        match self.repository.find_by_filename(filename).await {
            Ok(Some(record)) => {
                debug!("Batch {}: {} already analyzed as record {}", id, filename, record);
                return self.complete(id, filename, record).await;
            }
            Ok(None) => {}
            Err(e) => return self.fail(id, filename, FileFailure::Lookup(e)).await,
        }

        if !self.payloads.exists(id, filename).await {
            return self.fail(id, filename, FileFailure::MissingPayload).await;
        }

        let Some(mime) = mime_type_for(filename) else {
            let failure = FileFailure::UnsupportedType(filename.to_string());
            return self.fail(id, filename, failure).await;
        };

        let (batch_id, name) = (id.clone(), filename.to_string());
        if !self
            .on_tracker(move |t| t.mark_started(&batch_id, &name))
            .await?
        {
            return Ok(FileOutcome::Skipped);
        }

        let path = self.payloads.path(id, filename);
        let attempt = self.analyze_and_save(id, filename, &path, mime).await;
        self.analyzer.release(&path).await;

        match attempt {
            Ok(record) => self.complete(id, filename, record).await,
            Err(failure) => self.fail(id, filename, failure).await,
        }
    }

    async fn analyze_and_save(
        &self,
        id: &BatchId,
        filename: &str,
        path: &Path,
        mime: &str,
    ) -> std::result::Result<RecordId, FileFailure> {
        let result = self.analyzer.analyze(path, mime).await?;

        // Progress is cosmetic; a tracker error here must not lose the analysis.
        let (batch_id, name) = (id.clone(), filename.to_string());
        let update = ProgressUpdate::processing(50.0).with_operation(operation::SAVING);
        if let Err(e) = self
            .on_tracker(move |t| t.update_progress(&batch_id, &name, update))
            .await
        {
            warn!("Batch {}: failed to update progress for {}: {}", id, filename, e);
        }

        let title = title_from_filename(filename);
        self.repository
            .create_record(&result, filename, &title, FileKind::from_mime(mime))
            .await
            .map_err(FileFailure::Persist)
    }

    async fn complete(&self, id: &BatchId, filename: &str, record: RecordId) -> Result<FileOutcome> {
        let (batch_id, name) = (id.clone(), filename.to_string());
        self.on_tracker(move |t| t.mark_completed(&batch_id, &name, record))
            .await?;
        self.discard_payload(id, filename).await;
        Ok(FileOutcome::Completed)
    }

    async fn fail(&self, id: &BatchId, filename: &str, failure: FileFailure) -> Result<FileOutcome> {
        let (batch_id, name, message) = (id.clone(), filename.to_string(), failure.to_string());
        let outcome = self
            .on_tracker(move |t| t.mark_failed(&batch_id, &name, &message))
            .await?;
        if matches!(outcome, FailureOutcome::Exhausted | FailureOutcome::Cancelled) {
            self.discard_payload(id, filename).await;
        }
        Ok(FileOutcome::Failed)
    }

    /// Run a tracker transition on the blocking pool. Every transition
    /// writes and syncs the batch's status document.
    async fn on_tracker<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&BatchTracker) -> Result<T> + Send + 'static,
    {
        let tracker = Arc::clone(&self.tracker);
        tokio::task::spawn_blocking(move || f(&tracker))
            .await
            .map_err(|e| BatchError::Storage(anyhow::Error::new(e).context("Tracker task failed")))?
    }

    async fn discard_payload(&self, id: &BatchId, filename: &str) {
        if let Err(e) = self.payloads.remove(id, filename).await {
            error!("Batch {}: {:#}", id, e);
        }
    }

    /// Payloads of this batch still on disk.
    async fn remaining_payloads(&self, id: &BatchId) -> Result<Vec<(String, bool)>> {
        let Some(batch) = self.tracker.snapshot(id)? else {
            return Ok(Vec::new());
        };
        let mut remaining = Vec::new();
        for (name, record) in &batch.files {
            if self.payloads.exists(id, name).await {
                remaining.push((name.clone(), record.status.is_terminal()));
            }
        }
        Ok(remaining)
    }

    /// Wait up to the grace period for payloads to go away, then remove the
    /// ones whose files are terminal. Returns how many were removed.
    pub async fn cleanup_after_grace(
        &self,
        id: &BatchId,
        shutdown: &CancellationToken,
    ) -> Result<usize> {
        let deadline = Instant::now() + self.config.cleanup_grace;

        let remaining = loop {
            let remaining = self.remaining_payloads(id).await?;
            if remaining.is_empty() {
                self.prune_payload_dir(id).await;
                return Ok(0);
            }
            let now = Instant::now();
            if now >= deadline {
                break remaining;
            }

            let wait = self.config.cleanup_poll.min(deadline - now);
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Batch {}: shutdown during payload grace period", id);
                    return Ok(0);
                }
                _ = tokio::time::sleep(wait) => {}
            }
        };

        let mut removed = 0;
        for (name, terminal) in remaining {
            if !terminal {
                continue;
            }
            match self.payloads.remove(id, &name).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!("Batch {}: {:#}", id, e),
            }
        }
        self.prune_payload_dir(id).await;
        Ok(removed)
    }

    async fn prune_payload_dir(&self, id: &BatchId) {
        if let Err(e) = self.payloads.prune(id).await {
            warn!("Batch {}: {:#}", id, e);
        }
    }
}
