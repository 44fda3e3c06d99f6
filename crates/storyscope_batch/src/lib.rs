//! Storyscope batch core.
//!
//! Accepts a set of uploaded media files, tracks each through analysis and
//! persistence, and survives restarts by writing every state change to a
//! JSON status document per batch.
//!
//! Layering, leaves first:
//!
//! - [`store`]: one JSON document per batch, written atomically
//! - [`batch`] / [`tracker`]: per-file state machine with write-through
//! - [`pipeline`]: sequential worker that drains a batch
//! - [`supervisor`]: background run handles and shutdown
//! - [`orchestrator`]: submit / status / retry / cancel

pub mod analysis;
pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod payload;
pub mod pipeline;
pub mod policy;
pub mod store;
pub mod supervisor;
pub mod tracker;

pub use analysis::{AnalysisRepository, AnalysisResult, AnalyzerError, ContentAnalyzer};
pub use batch::{Batch, FailureOutcome, FileRecord, FileStatus, ProgressUpdate, MAX_ATTEMPTS};
pub use error::{BatchError, SubmitError};
pub use orchestrator::{
    BatchStatus, Orchestrator, OrchestratorConfig, RetryReceipt, SubmitReceipt,
};
pub use payload::{PayloadStore, Upload, UploadSource};
pub use pipeline::{BatchPipeline, PipelineConfig, RunOutcome, RunSummary};
pub use policy::{FileKind, UploadPolicy};
pub use store::StatusStore;
pub use supervisor::{RunSupervisor, ShutdownReport};
pub use tracker::BatchTracker;
pub use storyscope_ids::{BatchId, RecordId};
