//! Content analyzer backed by an external program.
//!
//! Invocation: `<program> <args..> <path> <mime>`. The program prints one
//! JSON analysis object on stdout and exits 0; anything else is a failed
//! attempt.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use storyscope_batch::{AnalysisResult, AnalyzerError, ContentAnalyzer};
use tokio::process::Command;
use tracing::debug;

/// Cap on how much stderr ends up in a file's error message.
const MAX_STDERR_CHARS: usize = 500;

pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

fn truncate_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() > MAX_STDERR_CHARS {
        let head: String = trimmed.chars().take(MAX_STDERR_CHARS).collect();
        format!("{}... (truncated)", head)
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl ContentAnalyzer for CommandAnalyzer {
    async fn analyze(&self, path: &Path, mime_type: &str) -> Result<AnalysisResult, AnalyzerError> {
        debug!("Running analyzer {} on {} ({})", self.program, path.display(), mime_type);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(path)
            .arg(mime_type)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                AnalyzerError::new(format!(
                    "Analyzer timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                AnalyzerError::new(format!("Failed to run analyzer '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = truncate_stderr(&String::from_utf8_lossy(&output.stderr));
            let status = match output.status.code() {
                Some(code) => format!("code {}", code),
                None => "a signal".to_string(),
            };
            let message = if stderr.is_empty() {
                format!("Analyzer exited with {}", status)
            } else {
                format!("Analyzer exited with {}: {}", status, stderr)
            };
            return Err(AnalyzerError::new(message));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| AnalyzerError::new(format!("Analyzer returned invalid JSON: {}", e)))
    }
}
