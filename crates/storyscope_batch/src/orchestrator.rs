//! Orchestrator - the entry point callers use
//!
//! `submit` validates an upload set, creates the batch, stores payloads and
//! launches a background run, returning as soon as the run is spawned.
//! Status, retry and cancel operate on batches by id, loading them from
//! the status store when they are not resident.

use crate::analysis::{AnalysisRepository, ContentAnalyzer};
use crate::batch::Batch;
use crate::error::{BatchError, Result, SubmitError};
use crate::payload::{PayloadStore, Upload, UploadSource};
use crate::pipeline::{BatchPipeline, PipelineConfig};
use crate::policy::{sanitize_filename, UploadPolicy};
use crate::store::StatusStore;
use crate::supervisor::{RunSupervisor, ShutdownReport};
use crate::tracker::BatchTracker;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storyscope_ids::BatchId;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Status documents.
    pub data_dir: PathBuf,
    /// Payloads awaiting analysis.
    pub uploads_dir: PathBuf,
    pub policy: UploadPolicy,
    pub pipeline: PipelineConfig,
    /// `None` disables stale-processing recovery on retry.
    pub stale_processing_after: Option<Duration>,
}

impl OrchestratorConfig {
    pub fn new(data_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            uploads_dir: uploads_dir.into(),
            policy: UploadPolicy::default(),
            pipeline: PipelineConfig::default(),
            stale_processing_after: Some(Duration::from_secs(3600)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub batch_id: BatchId,
    /// Accepted filenames, sanitized, in submission order.
    pub files: Vec<String>,
    /// Names skipped because an analysis already exists for them.
    pub duplicates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReceipt {
    pub batch_id: BatchId,
    pub reset_files: usize,
    pub recovered_files: usize,
}

/// Batch document plus derived progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatus {
    #[serde(flatten)]
    pub batch: Batch,
    /// Share of files that reached completed or failed, 0-100.
    pub progress: f64,
    pub completed_files: usize,
    pub is_complete: bool,
}

impl BatchStatus {
    pub fn from_batch(batch: Batch) -> Self {
        let done = batch.processed_files + batch.failed_files;
        let progress = if batch.total_files == 0 {
            0.0
        } else {
            done as f64 / batch.total_files as f64 * 100.0
        };
        Self {
            progress,
            completed_files: batch.processed_files,
            is_complete: batch.is_complete(),
            batch,
        }
    }
}

pub struct Orchestrator {
    tracker: Arc<BatchTracker>,
    payloads: PayloadStore,
    repository: Arc<dyn AnalysisRepository>,
    pipeline: Arc<BatchPipeline>,
    supervisor: RunSupervisor,
    policy: UploadPolicy,
    stale_after: Option<chrono::Duration>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        analyzer: Arc<dyn ContentAnalyzer>,
        repository: Arc<dyn AnalysisRepository>,
    ) -> anyhow::Result<Self> {
        let tracker = Arc::new(BatchTracker::new(StatusStore::new(&config.data_dir)?));
        let payloads = PayloadStore::new(&config.uploads_dir)?;
        let pipeline = Arc::new(BatchPipeline::new(
            Arc::clone(&tracker),
            payloads.clone(),
            analyzer,
            Arc::clone(&repository),
            config.pipeline,
        ));
        let stale_after = config
            .stale_processing_after
            .map(chrono::Duration::from_std)
            .transpose()?;

        Ok(Self {
            tracker,
            payloads,
            repository,
            pipeline,
            supervisor: RunSupervisor::new(),
            policy: config.policy,
            stale_after,
        })
    }

    pub fn tracker(&self) -> &Arc<BatchTracker> {
        &self.tracker
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    pub fn supervisor(&self) -> &RunSupervisor {
        &self.supervisor
    }

    /// Validate, create and launch a batch. Never waits on processing.
    pub async fn submit(&self, uploads: Vec<Upload>) -> std::result::Result<SubmitReceipt, SubmitError> {
        if self.supervisor.is_shutting_down() {
            return Err(BatchError::ShuttingDown.into());
        }
        if uploads.is_empty() {
            return Err(SubmitError::NoFiles);
        }

        let mut seen = HashSet::new();
        let mut invalid = Vec::new();
        let mut accepted: Vec<(String, Upload)> = Vec::new();
        for upload in uploads {
            let name = sanitize_filename(&upload.filename);
            if name.is_empty() {
                debug!("Skipping upload with unusable name {:?}", upload.filename);
                continue;
            }
            if !self.policy.is_allowed(&name) {
                invalid.push(name);
                continue;
            }
            if !seen.insert(name.clone()) {
                debug!("Dropping repeated upload {}", name);
                continue;
            }
            accepted.push((name, upload));
        }

        if !invalid.is_empty() {
            return Err(SubmitError::InvalidTypes {
                files: invalid,
                allowed: self.policy.allowed_extensions().to_vec(),
            });
        }

        let mut total: u64 = 0;
        for (name, upload) in &accepted {
            let size = upload.size().await.map_err(SubmitError::Payload)?;
            if size > self.policy.max_file_bytes {
                return Err(SubmitError::FileTooLarge {
                    filename: name.clone(),
                    size,
                    limit: self.policy.max_file_bytes,
                });
            }
            total = total.saturating_add(size);
            if total > self.policy.max_batch_bytes {
                return Err(SubmitError::BatchTooLarge {
                    limit: self.policy.max_batch_bytes,
                });
            }
        }

        let mut fresh: Vec<(String, UploadSource)> = Vec::new();
        let mut duplicates = Vec::new();
        for (name, upload) in accepted {
            let exists = self
                .repository
                .record_exists_for_filename(&name)
                .await
                .map_err(SubmitError::Repository)?;
            if exists {
                duplicates.push(name);
            } else {
                fresh.push((name, upload.source));
            }
        }

        if fresh.is_empty() {
            return Err(SubmitError::NoValidFiles { duplicates });
        }

        let files: Vec<String> = fresh.iter().map(|(name, _)| name.clone()).collect();
        let batch = self.tracker.create_batch(&files)?;

        for (index, (name, source)) in fresh.iter().enumerate() {
            if let Err(e) = self.payloads.store(&batch.id, name, source).await {
                error!("Batch {}: failed to store {}: {:#}", batch.id, name, e);
                self.abandon_batch(&batch.id, &files[..index]).await;
                return Err(SubmitError::Payload(e));
            }
        }

        self.supervisor
            .launch(Arc::clone(&self.pipeline), batch.id.clone())?;

        if duplicates.is_empty() {
            info!("Submitted batch {} with {} files", batch.id, files.len());
        } else {
            info!(
                "Submitted batch {} with {} files ({} already analyzed: {})",
                batch.id,
                files.len(),
                duplicates.len(),
                duplicates.join(", ")
            );
        }

        Ok(SubmitReceipt {
            batch_id: batch.id,
            files,
            duplicates,
        })
    }

    /// Undo a half-stored submission.
    async fn abandon_batch(&self, id: &BatchId, stored: &[String]) {
        for name in stored {
            if let Err(e) = self.payloads.remove(id, name).await {
                warn!("Batch {}: {:#}", id, e);
            }
        }
        if let Err(e) = self.payloads.prune(id).await {
            warn!("Batch {}: {:#}", id, e);
        }
        if let Err(e) = self.tracker.cancel(id) {
            warn!("Batch {}: failed to cancel after storage error: {}", id, e);
        }
    }

    pub fn status(&self, id: &BatchId) -> Result<BatchStatus> {
        self.tracker
            .snapshot(id)?
            .map(BatchStatus::from_batch)
            .ok_or_else(|| BatchError::NotFound(id.clone()))
    }

    /// Every known batch, oldest first.
    pub fn list(&self) -> Result<Vec<BatchStatus>> {
        Ok(self
            .tracker
            .list()?
            .into_iter()
            .map(BatchStatus::from_batch)
            .collect())
    }

    /// Recover stale files, reset failed ones, and launch a run.
    pub fn retry(&self, id: &BatchId) -> Result<RetryReceipt> {
        let batch = self
            .tracker
            .snapshot(id)?
            .ok_or_else(|| BatchError::NotFound(id.clone()))?;
        if batch.is_cancelled {
            return Err(BatchError::Cancelled(id.clone()));
        }

        // A live run owns its processing files; only recover when idle.
        let recovered_files = match self.stale_after {
            Some(after) if !self.supervisor.is_running(id) => {
                self.tracker.recover_stale(id, after)?
            }
            _ => 0,
        };
        let reset_files = self.tracker.reset_failed(id)?;

        self.supervisor.launch(Arc::clone(&self.pipeline), id.clone())?;
        info!(
            "Retrying batch {} ({} reset, {} recovered)",
            id, reset_files, recovered_files
        );

        Ok(RetryReceipt {
            batch_id: id.clone(),
            reset_files,
            recovered_files,
        })
    }

    /// Returns false when the batch had already finished.
    pub fn cancel(&self, id: &BatchId) -> Result<bool> {
        self.tracker.cancel(id)
    }

    /// Wait for every launched run, grace cleanup included.
    pub async fn wait_idle(&self) {
        self.supervisor.wait_idle().await
    }

    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        self.supervisor.shutdown(timeout).await
    }
}
