//! Helpful error types for CLI commands
//!
//! Every error carries what went wrong, optional context, and `TRY:`
//! suggestions for getting unstuck.

use std::fmt;
use std::path::Path;
use storyscope_batch::{BatchError, BatchId, SubmitError};

#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    pub fn invalid_batch_id(raw: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("Invalid batch ID: '{}'", raw))
            .with_context(reason.to_string())
            .with_suggestion("TRY: storyscope list   # Show known batch IDs")
    }

    pub fn batch_not_found(id: &BatchId) -> Self {
        Self::new(format!("Batch not found: {}", id))
            .with_context("No status document exists for this batch")
            .with_suggestions([
                "TRY: storyscope list   # Show known batch IDs".to_string(),
                "TRY: Check STORYSCOPE_HOME points at the right directory".to_string(),
            ])
    }

    pub fn no_analyzer(config_path: &Path) -> Self {
        Self::new("No analyzer configured")
            .with_context("Processing files needs an external analyzer program")
            .with_suggestions([
                format!(
                    "TRY: Add an [analyzer] section to {}:\n      [analyzer]\n      program = \"/path/to/analyzer\"",
                    config_path.display()
                ),
                "TRY: The program is called as `<program> <args..> <path> <mime>` and must print JSON"
                    .to_string(),
            ])
    }

    pub fn from_batch_error(err: BatchError) -> Self {
        match err {
            BatchError::NotFound(id) => Self::batch_not_found(&id),
            BatchError::Cancelled(id) => Self::new(format!("Batch {} was cancelled", id))
                .with_context("Cancelled batches cannot be retried")
                .with_suggestion("TRY: storyscope submit <files...>   # Start a new batch"),
            other => Self::new(other.to_string()),
        }
    }

    pub fn from_submit_error(err: SubmitError) -> Self {
        match err {
            SubmitError::InvalidTypes { files, allowed } => {
                Self::new(format!("Invalid file types: {}", files.join(", ")))
                    .with_context(format!("Allowed types: {}", allowed.join(", ")))
                    .with_suggestion(
                        "TRY: Add the extension to upload.allowed_extensions in config.toml",
                    )
            }
            SubmitError::NoValidFiles { duplicates } if !duplicates.is_empty() => {
                Self::new("No valid files selected")
                    .with_context(format!(
                        "Already analyzed: {}",
                        duplicates.join(", ")
                    ))
                    .with_suggestion("TRY: Rename the file if it is a different recording")
            }
            err @ (SubmitError::FileTooLarge { .. } | SubmitError::BatchTooLarge { .. }) => {
                Self::new(err.to_string()).with_suggestions([
                    "TRY: Split the files across several batches",
                    "TRY: Raise upload.max_file_bytes / upload.max_batch_bytes in config.toml",
                ])
            }
            SubmitError::Batch(inner) => Self::from_batch_error(inner),
            other => Self::new(other.to_string()),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
