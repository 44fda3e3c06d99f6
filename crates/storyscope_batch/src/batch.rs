//! Batch document and per-file state transitions.
//!
//! `Batch` is the unit persisted by the status store. All transitions live
//! here as plain methods so they can be exercised without I/O;
//! `BatchTracker` adds locking and write-through persistence on top.
//!
//! Per-file states:
//!
//! ```text
//! pending ──start──▶ processing ──▶ completed
//!    │  ▲                 │
//!    │  └──fail (<3)──────┤
//!    │                    └──fail (3rd)──▶ failed
//!    └──cancel──▶ cancelled
//! ```

use crate::error::{BatchError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use storyscope_ids::{BatchId, RecordId};

/// Attempt ceiling per file.
pub const MAX_ATTEMPTS: u32 = 3;

/// Labels shown in `FileRecord::current_operation`.
pub mod operation {
    pub const WAITING: &str = "waiting";
    pub const ANALYZING: &str = "analyzing content";
    pub const SAVING: &str = "saving results";
    pub const RETRYING: &str = "retrying";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
    pub const CANCELLED: &str = "cancelled";
}

/// Persisted per-file status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed, failed and cancelled files never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one file within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub status: FileStatus,
    pub attempts: u32,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<RecordId>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    /// When the current (or last) attempt started.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upload_progress: f64,
    #[serde(default)]
    pub processing_progress: f64,
    #[serde(default = "default_operation")]
    pub current_operation: String,
    /// Index in the original submission.
    #[serde(default)]
    pub position: usize,
}

fn default_operation() -> String {
    operation::WAITING.to_string()
}

impl FileRecord {
    fn new(position: usize) -> Self {
        Self {
            status: FileStatus::Pending,
            attempts: 0,
            error: None,
            analysis_id: None,
            processed_at: None,
            started_at: None,
            upload_progress: 0.0,
            processing_progress: 0.0,
            current_operation: default_operation(),
            position,
        }
    }

    /// Mean of upload and processing progress.
    pub fn blended_progress(&self) -> f64 {
        (self.upload_progress + self.processing_progress) / 2.0
    }
}

/// Result of recording a failure against a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// File was already terminal; nothing changed.
    Ignored,
    /// File is pending again and will be picked up on the next pass.
    Retryable { attempts: u32 },
    /// Attempt ceiling reached; file is terminally failed.
    Exhausted,
    /// Batch was cancelled while the file was in flight; the file is now
    /// cancelled instead of going back to pending.
    Cancelled,
}

/// Partial progress update for one file. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub upload: Option<f64>,
    pub processing: Option<f64>,
    pub operation: Option<String>,
}

impl ProgressUpdate {
    pub fn processing(value: f64) -> Self {
        Self {
            processing: Some(value),
            ..Default::default()
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

/// A user-submitted set of files tracked as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub files: BTreeMap<String, FileRecord>,
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    #[serde(default)]
    pub overall_progress: f64,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_cancelled: bool,
}

impl Batch {
    /// Create a batch with one pending record per filename.
    ///
    /// Filenames are a set: duplicates are rejected rather than merged.
    pub fn new(id: BatchId, filenames: &[String]) -> Result<Self> {
        if filenames.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let mut seen = HashSet::with_capacity(filenames.len());
        let mut files = BTreeMap::new();
        for (position, name) in filenames.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                return Err(BatchError::DuplicateFile(name.clone()));
            }
            files.insert(name.clone(), FileRecord::new(position));
        }

        Ok(Self {
            id,
            total_files: files.len(),
            files,
            processed_files: 0,
            failed_files: 0,
            overall_progress: 0.0,
            started_at: Utc::now(),
            completed_at: None,
            is_cancelled: false,
        })
    }

    /// Filenames in submission order.
    pub fn filenames(&self) -> Vec<&str> {
        let mut names: Vec<(&str, usize)> = self
            .files
            .iter()
            .map(|(name, record)| (name.as_str(), record.position))
            .collect();
        names.sort_by_key(|(_, position)| *position);
        names.into_iter().map(|(name, _)| name).collect()
    }

    pub fn file(&self, filename: &str) -> Option<&FileRecord> {
        self.files.get(filename)
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.values().filter(|r| r.status == status).count()
    }

    /// True once every file is completed, failed or cancelled.
    pub fn is_complete(&self) -> bool {
        !self.files.is_empty() && self.files.values().all(|r| r.status.is_terminal())
    }

    /// Pending files still under the attempt ceiling, in submission order.
    pub fn eligible_files(&self) -> Vec<String> {
        if self.is_cancelled {
            return Vec::new();
        }
        self.filenames()
            .into_iter()
            .filter(|name| {
                self.files
                    .get(*name)
                    .map(|r| r.status == FileStatus::Pending && r.attempts < MAX_ATTEMPTS)
                    .unwrap_or(false)
            })
            .map(str::to_string)
            .collect()
    }

    fn record_mut(&mut self, filename: &str) -> Result<&mut FileRecord> {
        let batch_id = &self.id;
        self.files
            .get_mut(filename)
            .ok_or_else(|| BatchError::UnknownFile {
                batch_id: batch_id.clone(),
                filename: filename.to_string(),
            })
    }

    fn recompute_progress(&mut self) {
        self.overall_progress = if self.files.is_empty() {
            0.0
        } else {
            let sum: f64 = self.files.values().map(FileRecord::blended_progress).sum();
            sum / self.files.len() as f64
        };
    }

    /// Stamp `completed_at` the first time every file is terminal.
    fn finish_if_complete(&mut self) -> bool {
        if self.completed_at.is_none() && self.is_complete() {
            self.completed_at = Some(Utc::now());
            true
        } else {
            false
        }
    }

    /// Move a pending file to processing. Returns false (and changes nothing)
    /// when the batch is cancelled or the file is not pending.
    pub fn mark_started(&mut self, filename: &str) -> Result<bool> {
        let cancelled = self.is_cancelled;
        let record = self.record_mut(filename)?;
        if cancelled || record.status != FileStatus::Pending {
            return Ok(false);
        }

        record.status = FileStatus::Processing;
        record.attempts += 1;
        record.upload_progress = 100.0;
        record.processing_progress = 0.0;
        record.current_operation = operation::ANALYZING.to_string();
        record.started_at = Some(Utc::now());

        self.recompute_progress();
        Ok(true)
    }

    /// Apply a progress update. Terminal files are left alone.
    pub fn update_progress(&mut self, filename: &str, update: ProgressUpdate) -> Result<bool> {
        let record = self.record_mut(filename)?;
        if record.status.is_terminal() {
            return Ok(false);
        }

        if let Some(upload) = update.upload {
            record.upload_progress = clamp_percent(upload);
        }
        if let Some(processing) = update.processing {
            record.processing_progress = clamp_percent(processing);
        }
        if let Some(op) = update.operation {
            record.current_operation = op;
        }

        self.recompute_progress();
        Ok(true)
    }

    /// Mark a pending or processing file completed. A second call for the
    /// same file returns false and does not touch the counters.
    pub fn mark_completed(&mut self, filename: &str, analysis_id: RecordId) -> Result<bool> {
        let record = self.record_mut(filename)?;
        if record.status.is_terminal() {
            return Ok(false);
        }

        record.status = FileStatus::Completed;
        record.analysis_id = Some(analysis_id);
        record.processed_at = Some(Utc::now());
        record.upload_progress = 100.0;
        record.processing_progress = 100.0;
        record.current_operation = operation::COMPLETED.to_string();
        record.error = None;
        self.processed_files += 1;

        self.recompute_progress();
        self.finish_if_complete();
        Ok(true)
    }

    /// Record a failed attempt.
    ///
    /// A failure against a file that never started (e.g. missing payload)
    /// still consumes an attempt, so such files exhaust their budget instead
    /// of cycling forever.
    pub fn mark_failed(&mut self, filename: &str, error: &str) -> Result<FailureOutcome> {
        let cancelled = self.is_cancelled;
        let record = self.record_mut(filename)?;
        if record.status.is_terminal() {
            return Ok(FailureOutcome::Ignored);
        }

        if record.status == FileStatus::Pending {
            record.attempts = (record.attempts + 1).min(MAX_ATTEMPTS);
        }
        record.error = Some(error.to_string());
        record.processing_progress = 0.0;

        let outcome = if record.attempts >= MAX_ATTEMPTS {
            record.status = FileStatus::Failed;
            record.current_operation = operation::FAILED.to_string();
            self.failed_files += 1;
            FailureOutcome::Exhausted
        } else if cancelled {
            // Nothing dispatches a cancelled batch again.
            record.status = FileStatus::Cancelled;
            record.current_operation = operation::CANCELLED.to_string();
            FailureOutcome::Cancelled
        } else {
            record.status = FileStatus::Pending;
            record.current_operation = operation::RETRYING.to_string();
            FailureOutcome::Retryable {
                attempts: record.attempts,
            }
        };

        self.recompute_progress();
        self.finish_if_complete();
        Ok(outcome)
    }

    /// Cooperative cancel: pending files become cancelled, processing files
    /// are left to finish. No-op when every file is already terminal.
    pub fn cancel(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }

        self.is_cancelled = true;
        for record in self.files.values_mut() {
            if record.status == FileStatus::Pending {
                record.status = FileStatus::Cancelled;
                record.current_operation = operation::CANCELLED.to_string();
            }
        }

        self.recompute_progress();
        self.finish_if_complete();
        true
    }

    /// Operator retry: failed files go back to pending with a fresh attempt
    /// budget. Returns how many files were reset.
    pub fn reset_failed(&mut self) -> Result<usize> {
        if self.is_cancelled {
            return Err(BatchError::Cancelled(self.id.clone()));
        }

        let mut reset = 0;
        for record in self.files.values_mut() {
            if record.status == FileStatus::Failed {
                record.status = FileStatus::Pending;
                record.attempts = 0;
                record.error = None;
                record.upload_progress = 0.0;
                record.processing_progress = 0.0;
                record.current_operation = operation::WAITING.to_string();
                reset += 1;
            }
        }

        if reset > 0 {
            self.failed_files = self.failed_files.saturating_sub(reset);
            self.completed_at = None;
            self.recompute_progress();
        }
        Ok(reset)
    }

    /// Treat files stuck in `processing` since before `now - older_than` as a
    /// failed attempt. Returns how many files were recovered.
    pub fn recover_stale(&mut self, now: DateTime<Utc>, older_than: Duration) -> Result<usize> {
        let cutoff = now - older_than;
        let stale: Vec<String> = self
            .files
            .iter()
            .filter(|(_, r)| {
                r.status == FileStatus::Processing
                    && r.started_at.map(|t| t < cutoff).unwrap_or(true)
            })
            .map(|(name, _)| name.clone())
            .collect();

        for name in &stale {
            self.mark_failed(name, "Processing was interrupted before it finished")?;
        }
        Ok(stale.len())
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(names: &[&str]) -> Batch {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        Batch::new(BatchId::new(), &names).unwrap()
    }

    fn assert_counter_invariant(b: &Batch) {
        let terminal = b.processed_files + b.failed_files + b.count(FileStatus::Cancelled);
        if b.completed_at.is_some() {
            assert_eq!(terminal, b.total_files);
        } else {
            assert!(terminal < b.total_files);
        }
    }

    #[test]
    fn test_new_batch_is_all_pending() {
        let b = batch(&["a.mp3", "b.mp3"]);
        assert_eq!(b.total_files, 2);
        assert_eq!(b.count(FileStatus::Pending), 2);
        assert!(b.files.values().all(|r| r.attempts == 0));
        assert_eq!(b.file("a.mp3").unwrap().current_operation, "waiting");
        assert!(b.completed_at.is_none());
    }

    #[test]
    fn test_new_rejects_empty_and_duplicates() {
        assert!(matches!(
            Batch::new(BatchId::new(), &[]),
            Err(BatchError::EmptyBatch)
        ));
        let dup = vec!["a.mp3".to_string(), "a.mp3".to_string()];
        assert!(matches!(
            Batch::new(BatchId::new(), &dup),
            Err(BatchError::DuplicateFile(name)) if name == "a.mp3"
        ));
    }

    #[test]
    fn test_completion_and_retry_ceiling_scenario() {
        let mut b = batch(&["a.mp3", "b.mp3"]);

        assert!(b.mark_started("a.mp3").unwrap());
        assert!(b.mark_completed("a.mp3", RecordId::new(7)).unwrap());
        assert_eq!(b.processed_files, 1);
        assert_eq!(b.overall_progress, 50.0);
        assert_counter_invariant(&b);

        for expected in 1..MAX_ATTEMPTS {
            assert!(b.mark_started("b.mp3").unwrap());
            let outcome = b.mark_failed("b.mp3", "analyzer timeout").unwrap();
            assert_eq!(outcome, FailureOutcome::Retryable { attempts: expected });
            assert_eq!(b.file("b.mp3").unwrap().status, FileStatus::Pending);
            assert!(!b.is_complete());
            assert_counter_invariant(&b);
        }

        assert!(b.mark_started("b.mp3").unwrap());
        let outcome = b.mark_failed("b.mp3", "analyzer timeout").unwrap();
        assert_eq!(outcome, FailureOutcome::Exhausted);

        let record = b.file("b.mp3").unwrap();
        assert_eq!(record.status, FileStatus::Failed);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.error.as_deref(), Some("analyzer timeout"));
        assert_eq!(b.failed_files, 1);
        assert!(b.completed_at.is_some());
        assert!(b.is_complete());
        assert_counter_invariant(&b);
    }

    #[test]
    fn test_exhausted_file_never_returns_to_pending() {
        let mut b = batch(&["a.mp3"]);
        for _ in 0..MAX_ATTEMPTS {
            b.mark_started("a.mp3").unwrap();
            b.mark_failed("a.mp3", "boom").unwrap();
        }
        assert_eq!(b.file("a.mp3").unwrap().status, FileStatus::Failed);

        assert!(!b.mark_started("a.mp3").unwrap());
        assert_eq!(
            b.mark_failed("a.mp3", "again").unwrap(),
            FailureOutcome::Ignored
        );
        assert_eq!(b.file("a.mp3").unwrap().attempts, MAX_ATTEMPTS);
        assert_eq!(b.failed_files, 1);
        assert!(b.eligible_files().is_empty());
    }

    #[test]
    fn test_failure_without_start_consumes_attempts() {
        let mut b = batch(&["missing.mp3"]);
        assert_eq!(
            b.mark_failed("missing.mp3", "File not found before processing")
                .unwrap(),
            FailureOutcome::Retryable { attempts: 1 }
        );
        b.mark_failed("missing.mp3", "File not found before processing")
            .unwrap();
        assert_eq!(
            b.mark_failed("missing.mp3", "File not found before processing")
                .unwrap(),
            FailureOutcome::Exhausted
        );
        assert_eq!(b.file("missing.mp3").unwrap().attempts, MAX_ATTEMPTS);
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut b = batch(&["a.mp3", "b.mp3"]);
        assert!(b.mark_completed("a.mp3", RecordId::new(1)).unwrap());
        assert!(!b.mark_completed("a.mp3", RecordId::new(2)).unwrap());
        assert_eq!(b.processed_files, 1);
        assert_eq!(b.file("a.mp3").unwrap().analysis_id, Some(RecordId::new(1)));
    }

    #[test]
    fn test_cancel_flips_pending_and_spares_processing() {
        let mut b = batch(&["a.mp3", "b.mp3", "c.mp3"]);
        b.mark_started("a.mp3").unwrap();

        assert!(b.cancel());
        assert!(b.eligible_files().is_empty());
        assert_eq!(b.file("a.mp3").unwrap().status, FileStatus::Processing);
        assert_eq!(b.file("b.mp3").unwrap().status, FileStatus::Cancelled);
        assert_eq!(b.file("c.mp3").unwrap().status, FileStatus::Cancelled);
        assert!(!b.mark_started("b.mp3").unwrap());
        assert!(b.completed_at.is_none());

        // The in-flight file finishes naturally and closes the batch.
        b.mark_completed("a.mp3", RecordId::new(3)).unwrap();
        assert!(b.completed_at.is_some());
        assert_counter_invariant(&b);
    }

    #[test]
    fn test_in_flight_failure_after_cancel_closes_batch() {
        let mut b = batch(&["a.mp3", "b.mp3"]);
        b.mark_started("a.mp3").unwrap();
        assert!(b.cancel());

        let outcome = b.mark_failed("a.mp3", "analyzer error").unwrap();
        assert_eq!(outcome, FailureOutcome::Cancelled);

        let record = b.file("a.mp3").unwrap();
        assert_eq!(record.status, FileStatus::Cancelled);
        assert_eq!(record.current_operation, "cancelled");
        assert_eq!(record.error.as_deref(), Some("analyzer error"));
        assert_eq!(record.attempts, 1);
        assert_eq!(b.failed_files, 0);
        assert!(b.eligible_files().is_empty());
        assert!(b.is_complete());
        assert!(b.completed_at.is_some());
        assert_counter_invariant(&b);

        // Terminal now; later failures change nothing.
        assert_eq!(
            b.mark_failed("a.mp3", "again").unwrap(),
            FailureOutcome::Ignored
        );
    }

    #[test]
    fn test_last_attempt_failing_after_cancel_is_still_failed() {
        let mut b = batch(&["a.mp3", "b.mp3"]);
        for _ in 1..MAX_ATTEMPTS {
            b.mark_started("a.mp3").unwrap();
            b.mark_failed("a.mp3", "boom").unwrap();
        }
        b.mark_started("a.mp3").unwrap();
        b.cancel();

        assert_eq!(
            b.mark_failed("a.mp3", "boom").unwrap(),
            FailureOutcome::Exhausted
        );
        assert_eq!(b.file("a.mp3").unwrap().status, FileStatus::Failed);
        assert_eq!(b.failed_files, 1);
        assert!(b.completed_at.is_some());
        assert_counter_invariant(&b);
    }

    #[test]
    fn test_cancel_on_finished_batch_is_noop() {
        let mut b = batch(&["a.mp3"]);
        b.mark_completed("a.mp3", RecordId::new(1)).unwrap();
        let before = b.clone();

        assert!(!b.cancel());
        assert_eq!(b, before);
    }

    #[test]
    fn test_eligible_files_follow_submission_order() {
        let mut b = batch(&["zeta.mp3", "alpha.mp3", "mid.mp3"]);
        assert_eq!(b.eligible_files(), vec!["zeta.mp3", "alpha.mp3", "mid.mp3"]);

        b.mark_started("zeta.mp3").unwrap();
        b.mark_failed("zeta.mp3", "transient").unwrap();
        b.mark_completed("alpha.mp3", RecordId::new(1)).unwrap();
        assert_eq!(b.eligible_files(), vec!["zeta.mp3", "mid.mp3"]);
    }

    #[test]
    fn test_update_progress_clamps_and_recomputes() {
        let mut b = batch(&["a.mp3", "b.mp3"]);
        b.update_progress(
            "a.mp3",
            ProgressUpdate {
                upload: Some(150.0),
                processing: Some(-5.0),
                operation: Some("uploading".to_string()),
            },
        )
        .unwrap();

        let record = b.file("a.mp3").unwrap();
        assert_eq!(record.upload_progress, 100.0);
        assert_eq!(record.processing_progress, 0.0);
        assert_eq!(record.current_operation, "uploading");
        assert_eq!(b.overall_progress, 25.0);

        b.update_progress("b.mp3", ProgressUpdate::processing(f64::NAN))
            .unwrap();
        assert_eq!(b.file("b.mp3").unwrap().processing_progress, 0.0);
    }

    #[test]
    fn test_unknown_file_is_an_error() {
        let mut b = batch(&["a.mp3"]);
        assert!(matches!(
            b.mark_started("nope.mp3"),
            Err(BatchError::UnknownFile { .. })
        ));
    }

    #[test]
    fn test_reset_failed_reopens_batch() {
        let mut b = batch(&["a.mp3", "b.mp3"]);
        b.mark_completed("a.mp3", RecordId::new(1)).unwrap();
        for _ in 0..MAX_ATTEMPTS {
            b.mark_started("b.mp3").unwrap();
            b.mark_failed("b.mp3", "boom").unwrap();
        }
        assert!(b.completed_at.is_some());

        assert_eq!(b.reset_failed().unwrap(), 1);
        let record = b.file("b.mp3").unwrap();
        assert_eq!(record.status, FileStatus::Pending);
        assert_eq!(record.attempts, 0);
        assert!(record.error.is_none());
        assert_eq!(b.failed_files, 0);
        assert!(b.completed_at.is_none());
        assert_eq!(b.eligible_files(), vec!["b.mp3"]);
        assert_eq!(b.file("a.mp3").unwrap().status, FileStatus::Completed);
    }

    #[test]
    fn test_reset_failed_rejected_for_cancelled_batch() {
        let mut b = batch(&["a.mp3"]);
        b.cancel();
        assert!(matches!(b.reset_failed(), Err(BatchError::Cancelled(_))));
    }

    #[test]
    fn test_recover_stale_processing() {
        let mut b = batch(&["old.mp3", "fresh.mp3"]);
        b.mark_started("old.mp3").unwrap();
        b.mark_started("fresh.mp3").unwrap();
        b.files.get_mut("old.mp3").unwrap().started_at =
            Some(Utc::now() - Duration::hours(2));

        let recovered = b.recover_stale(Utc::now(), Duration::hours(1)).unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(b.file("old.mp3").unwrap().status, FileStatus::Pending);
        assert_eq!(b.file("old.mp3").unwrap().attempts, 1);
        assert_eq!(b.file("fresh.mp3").unwrap().status, FileStatus::Processing);
    }

    #[test]
    fn test_json_document_shape() {
        let b = batch(&["a.mp3"]);
        let value = serde_json::to_value(&b).unwrap();
        assert_eq!(value["files"]["a.mp3"]["status"], "pending");
        assert_eq!(value["total_files"], 1);
        assert_eq!(value["is_cancelled"], false);

        let parsed: Batch = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, b);
    }
}
