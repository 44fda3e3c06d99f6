//! Run Supervisor - owns the background pipeline tasks
//!
//! Every launched run is a tokio task tracked by its `JoinHandle`. Shutdown
//! cancels the shared token (observed between files and during the payload
//! grace wait), waits for runs up to a deadline, and aborts whatever is
//! still going.

use crate::error::{BatchError, Result};
use crate::pipeline::BatchPipeline;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storyscope_ids::BatchId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ActiveRun {
    batch_id: BatchId,
    handle: JoinHandle<()>,
}

/// Result of `RunSupervisor::shutdown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Runs that finished within the timeout.
    pub finished: usize,
    /// Runs aborted after the timeout.
    pub aborted: usize,
}

pub struct RunSupervisor {
    shutdown: CancellationToken,
    runs: Mutex<HashMap<u64, ActiveRun>>,
    next_run: AtomicU64,
}

impl Default for RunSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSupervisor {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            runs: Mutex::new(HashMap::new()),
            next_run: AtomicU64::new(1),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Spawn a pipeline run for `batch_id`. Does not wait for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(&self, pipeline: Arc<BatchPipeline>, batch_id: BatchId) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(BatchError::ShuttingDown);
        }

        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.clone();
        let task_batch = batch_id.clone();
        let handle = tokio::spawn(async move {
            match pipeline.run(&task_batch, token).await {
                Ok(summary) => debug!("Run {} for batch {} done: {:?}", run_id, task_batch, summary),
                Err(e) => error!("Run {} for batch {} failed: {}", run_id, task_batch, e),
            }
        });

        let mut runs = self
            .runs
            .lock()
            .map_err(|_| BatchError::Poisoned(batch_id.clone()))?;
        reap_finished(&mut runs);
        runs.insert(run_id, ActiveRun { batch_id: batch_id.clone(), handle });

        debug!("Launched run {} for batch {} ({} active)", run_id, batch_id, runs.len());
        Ok(())
    }

    pub fn is_running(&self, batch_id: &BatchId) -> bool {
        self.runs
            .lock()
            .map(|runs| {
                runs.values()
                    .any(|run| run.batch_id == *batch_id && !run.handle.is_finished())
            })
            .unwrap_or(false)
    }

    pub fn active_runs(&self) -> usize {
        match self.runs.lock() {
            Ok(mut runs) => {
                reap_finished(&mut runs);
                runs.len()
            }
            Err(_) => 0,
        }
    }

    fn take_runs(&self) -> Vec<ActiveRun> {
        match self.runs.lock() {
            Ok(mut runs) => runs.drain().map(|(_, run)| run).collect(),
            Err(poisoned) => poisoned.into_inner().drain().map(|(_, run)| run).collect(),
        }
    }

    /// Wait until no run is active, including runs launched while waiting.
    pub async fn wait_idle(&self) {
        loop {
            let runs = self.take_runs();
            if runs.is_empty() {
                return;
            }
            for run in runs {
                if let Err(e) = run.handle.await {
                    warn!("Run for batch {} panicked: {:?}", run.batch_id, e);
                }
            }
        }
    }

    /// Stop dispatch, wait up to `timeout` for active runs, abort the rest.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        self.shutdown.cancel();

        let runs = self.take_runs();
        info!(
            "Shutdown: waiting up to {:?} for {} active runs",
            timeout,
            runs.len()
        );

        let deadline = tokio::time::Instant::now() + timeout;
        let mut report = ShutdownReport::default();
        for mut run in runs {
            match tokio::time::timeout_at(deadline, &mut run.handle).await {
                Ok(Ok(())) => report.finished += 1,
                Ok(Err(e)) => {
                    warn!("Run for batch {} panicked during shutdown: {:?}", run.batch_id, e);
                    report.finished += 1;
                }
                Err(_) => {
                    warn!("Abandoning run for batch {} after timeout", run.batch_id);
                    run.handle.abort();
                    report.aborted += 1;
                }
            }
        }

        info!(
            "Shutdown complete: {} runs finished, {} aborted",
            report.finished, report.aborted
        );
        report
    }
}

fn reap_finished(runs: &mut HashMap<u64, ActiveRun>) {
    runs.retain(|run_id, run| {
        if run.handle.is_finished() {
            debug!("Reaped run {} for batch {}", run_id, run.batch_id);
            false
        } else {
            true
        }
    });
}
