//! Batch Tracker - authoritative in-memory batch state
//!
//! The tracker owns a registry of resident batches, each behind its own
//! mutex. Every mutation runs under that batch's lock and writes the whole
//! document through to the [`StatusStore`] before the lock is released, so
//! two writers on one batch can never interleave a read-modify-write.
//!
//! Batches that are not resident (e.g. after a restart) are loaded from the
//! store on first use.

use crate::batch::{Batch, FailureOutcome, ProgressUpdate};
use crate::error::{BatchError, Result};
use crate::store::StatusStore;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use storyscope_ids::{BatchId, RecordId};
use tracing::{debug, error, info, warn};

type BatchSlot = Arc<Mutex<Batch>>;

/// Thread-safe batch state machine with write-through persistence.
pub struct BatchTracker {
    store: StatusStore,
    batches: Mutex<HashMap<BatchId, BatchSlot>>,
}

impl BatchTracker {
    pub fn new(store: StatusStore) -> Self {
        Self {
            store,
            batches: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    /// Look up a batch, loading it from the store when not resident.
    fn slot(&self, id: &BatchId) -> Result<Option<BatchSlot>> {
        {
            let registry = self
                .batches
                .lock()
                .map_err(|_| BatchError::Poisoned(id.clone()))?;
            if let Some(slot) = registry.get(id) {
                return Ok(Some(Arc::clone(slot)));
            }
        }

        let Some(batch) = self.store.load(id)? else {
            return Ok(None);
        };
        debug!("Loaded batch {} from status store", id);

        let mut registry = self
            .batches
            .lock()
            .map_err(|_| BatchError::Poisoned(id.clone()))?;
        // Another caller may have loaded it while the registry was unlocked.
        let slot = registry
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(batch)));
        Ok(Some(Arc::clone(slot)))
    }

    fn require(&self, id: &BatchId) -> Result<BatchSlot> {
        self.slot(id)?
            .ok_or_else(|| BatchError::NotFound(id.clone()))
    }

    /// Run `f` under the batch lock and persist when it reports a change.
    fn mutate<T>(
        &self,
        id: &BatchId,
        f: impl FnOnce(&mut Batch) -> Result<(T, bool)>,
    ) -> Result<T> {
        let slot = self.require(id)?;
        let mut batch = slot.lock().map_err(|_| BatchError::Poisoned(id.clone()))?;
        let (value, changed) = f(&mut batch)?;
        if changed {
            self.persist(&batch);
        }
        Ok(value)
    }

    fn read<T>(&self, id: &BatchId, f: impl FnOnce(&Batch) -> T) -> Result<Option<T>> {
        let Some(slot) = self.slot(id)? else {
            return Ok(None);
        };
        let batch = slot.lock().map_err(|_| BatchError::Poisoned(id.clone()))?;
        Ok(Some(f(&batch)))
    }

    /// Blocking write and sync, made while the batch lock is held. Async
    /// callers run transitions through `spawn_blocking`. Store failures
    /// never undo the in-memory transition.
    fn persist(&self, batch: &Batch) {
        if let Err(e) = self.store.save(batch) {
            error!("Failed to persist batch {}: {:#}", batch.id, e);
        }
    }

    /// Create and persist a batch with one pending record per filename.
    pub fn create_batch(&self, filenames: &[String]) -> Result<Batch> {
        let batch = Batch::new(BatchId::new(), filenames)?;
        self.persist(&batch);

        let mut registry = self
            .batches
            .lock()
            .map_err(|_| BatchError::Poisoned(batch.id.clone()))?;
        registry.insert(batch.id.clone(), Arc::new(Mutex::new(batch.clone())));

        info!("Created batch: {} ({} files)", batch.id, batch.total_files);
        Ok(batch)
    }

    pub fn mark_started(&self, id: &BatchId, filename: &str) -> Result<bool> {
        let started = self.mutate(id, |b| {
            let started = b.mark_started(filename)?;
            Ok((started, started))
        })?;
        if started {
            debug!("Batch {}: started {}", id, filename);
        }
        Ok(started)
    }

    pub fn update_progress(
        &self,
        id: &BatchId,
        filename: &str,
        update: ProgressUpdate,
    ) -> Result<bool> {
        self.mutate(id, |b| {
            let applied = b.update_progress(filename, update)?;
            Ok((applied, applied))
        })
    }

    pub fn mark_completed(
        &self,
        id: &BatchId,
        filename: &str,
        analysis_id: RecordId,
    ) -> Result<bool> {
        let (completed, finished) = self.mutate(id, |b| {
            let was_open = b.completed_at.is_none();
            let completed = b.mark_completed(filename, analysis_id)?;
            let finished = was_open && b.completed_at.is_some();
            Ok(((completed, finished), completed))
        })?;

        if completed {
            info!("Batch {}: completed {} (record {})", id, filename, analysis_id);
        }
        if finished {
            info!("Batch {} finished", id);
        }
        Ok(completed)
    }

    pub fn mark_failed(&self, id: &BatchId, filename: &str, error: &str) -> Result<FailureOutcome> {
        let outcome = self.mutate(id, |b| {
            let outcome = b.mark_failed(filename, error)?;
            Ok((outcome, outcome != FailureOutcome::Ignored))
        })?;

        match outcome {
            FailureOutcome::Retryable { attempts } => {
                warn!(
                    "Batch {}: {} failed (attempt {}), will retry: {}",
                    id, filename, attempts, error
                );
            }
            FailureOutcome::Exhausted => {
                warn!("Batch {}: {} failed permanently: {}", id, filename, error);
            }
            FailureOutcome::Cancelled => {
                info!(
                    "Batch {}: {} failed after cancel, marked cancelled: {}",
                    id, filename, error
                );
            }
            FailureOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    /// Cancel a batch. Returns false when every file was already terminal.
    pub fn cancel(&self, id: &BatchId) -> Result<bool> {
        let cancelled = self.mutate(id, |b| {
            let cancelled = b.cancel();
            Ok((cancelled, cancelled))
        })?;
        if cancelled {
            info!("Cancelled batch: {}", id);
        }
        Ok(cancelled)
    }

    /// Files the pipeline should process next. Empty for unknown batches.
    pub fn eligible_files(&self, id: &BatchId) -> Result<Vec<String>> {
        Ok(self.read(id, Batch::eligible_files)?.unwrap_or_default())
    }

    /// False for unknown batches.
    pub fn is_complete(&self, id: &BatchId) -> Result<bool> {
        Ok(self.read(id, Batch::is_complete)?.unwrap_or(false))
    }

    pub fn is_cancelled(&self, id: &BatchId) -> Result<bool> {
        Ok(self.read(id, |b| b.is_cancelled)?.unwrap_or(false))
    }

    pub fn snapshot(&self, id: &BatchId) -> Result<Option<Batch>> {
        self.read(id, Batch::clone)
    }

    /// Every batch in the store, with resident batches taking precedence.
    pub fn list(&self) -> Result<Vec<Batch>> {
        let mut batches = self.store.list()?;
        for batch in batches.iter_mut() {
            if let Some(current) = self.snapshot(&batch.id)? {
                *batch = current;
            }
        }
        Ok(batches)
    }

    pub fn reset_failed(&self, id: &BatchId) -> Result<usize> {
        let reset = self.mutate(id, |b| {
            let reset = b.reset_failed()?;
            Ok((reset, reset > 0))
        })?;
        if reset > 0 {
            info!("Batch {}: reset {} failed files for retry", id, reset);
        }
        Ok(reset)
    }

    pub fn recover_stale(&self, id: &BatchId, older_than: Duration) -> Result<usize> {
        let recovered = self.mutate(id, |b| {
            let recovered = b.recover_stale(Utc::now(), older_than)?;
            Ok((recovered, recovered > 0))
        })?;
        if recovered > 0 {
            warn!(
                "Batch {}: recovered {} files stuck in processing",
                id, recovered
            );
        }
        Ok(recovered)
    }
}
