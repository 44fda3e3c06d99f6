//! Collaborators the pipeline calls out to.
//!
//! The analyzer and the record repository are black boxes to the batch
//! core: the pipeline only needs their call contract and failure modes.

use crate::policy::FileKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use storyscope_ids::RecordId;
use thiserror::Error;

/// Structured output of one content analysis.
///
/// Every field is optional on the wire so partial analyzer output still
/// parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub format: Option<String>,
    /// `HH:MM:SS`
    pub duration: Option<String>,
    pub has_narration: bool,
    pub has_underscore: bool,
    pub has_sound_effects: bool,
    pub songs_count: u32,
    pub characters_mentioned: Vec<String>,
    pub speaking_characters: Vec<String>,
    pub environments: Vec<String>,
    pub themes: Vec<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub emotion_scores: BTreeMap<String, f64>,
    pub dominant_emotion: Option<String>,
    pub tone_analysis: BTreeMap<String, String>,
    pub confidence_score: f64,
}

/// Analyzer failure. Opaque: every analyzer error is retried the same way.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AnalyzerError {
    message: String,
}

impl AnalyzerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for AnalyzerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{:#}", err))
    }
}

/// External content analysis service.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(&self, path: &Path, mime_type: &str) -> Result<AnalysisResult, AnalyzerError>;

    /// Drop any per-file resources held by the analyzer. Called once per
    /// attempt, whatever its outcome.
    async fn release(&self, _path: &Path) {}
}

/// Persistence for finished analyses, keyed by filename.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn create_record(
        &self,
        result: &AnalysisResult,
        filename: &str,
        title: &str,
        kind: FileKind,
    ) -> anyhow::Result<RecordId>;

    async fn find_by_filename(&self, filename: &str) -> anyhow::Result<Option<RecordId>>;

    async fn record_exists_for_filename(&self, filename: &str) -> anyhow::Result<bool> {
        Ok(self.find_by_filename(filename).await?.is_some())
    }
}
