//! Error types for batch tracking and submission.

use storyscope_ids::BatchId;
use thiserror::Error;

/// Errors raised by batch state transitions.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch not found: {0}")]
    NotFound(BatchId),

    #[error("A batch needs at least one file")]
    EmptyBatch,

    #[error("Duplicate filename in batch: {0}")]
    DuplicateFile(String),

    #[error("File {filename} is not part of batch {batch_id}")]
    UnknownFile { batch_id: BatchId, filename: String },

    #[error("Batch {0} was cancelled")]
    Cancelled(BatchId),

    #[error("Batch {0} lock poisoned")]
    Poisoned(BatchId),

    #[error("Shutting down; no new batch runs are accepted")]
    ShuttingDown,

    #[error("Status store error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Errors returned synchronously by `Orchestrator::submit`.
///
/// Nothing is created or stored when one of the validation variants is returned.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No files uploaded")]
    NoFiles,

    #[error("Invalid file types: {}. Allowed types: {}", .files.join(", "), .allowed.join(", "))]
    InvalidTypes {
        files: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("File {filename} is {size} bytes; the per-file limit is {limit} bytes")]
    FileTooLarge {
        filename: String,
        size: u64,
        limit: u64,
    },

    #[error("Total batch size exceeds the {limit} byte limit")]
    BatchTooLarge { limit: u64 },

    #[error("No valid files selected{}", duplicates_suffix(.duplicates))]
    NoValidFiles { duplicates: Vec<String> },

    #[error("Failed to store uploaded files: {0:#}")]
    Payload(anyhow::Error),

    #[error("Failed to check existing analyses: {0:#}")]
    Repository(anyhow::Error),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

fn duplicates_suffix(duplicates: &[String]) -> String {
    if duplicates.is_empty() {
        String::new()
    } else {
        format!(". Duplicates found: {}", duplicates.join(", "))
    }
}

impl SubmitError {
    /// Input errors are the caller's fault (bad request); the rest are ours.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NoFiles
                | Self::InvalidTypes { .. }
                | Self::FileTooLarge { .. }
                | Self::BatchTooLarge { .. }
                | Self::NoValidFiles { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;
