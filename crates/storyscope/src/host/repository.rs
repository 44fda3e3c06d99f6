//! Analysis records stored as JSON files.
//!
//! ```text
//! <records_dir>/
//! ├── record_1.json
//! ├── record_2.json
//! └── ...
//! ```
//!
//! Ids are allocated monotonically from the highest id on disk. A filename
//! index is built when the repository is opened and kept current on writes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use storyscope_batch::{AnalysisRepository, AnalysisResult, FileKind, RecordId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: RecordId,
    pub filename: String,
    pub title: String,
    pub file_type: FileKind,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

struct Index {
    next_id: u64,
    by_filename: HashMap<String, RecordId>,
}

pub struct JsonRecordRepository {
    dir: PathBuf,
    index: Mutex<Index>,
}

impl JsonRecordRepository {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create records directory: {}", dir.display()))?;

        let mut next_id = 1;
        let mut by_filename = HashMap::new();
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read records directory: {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !is_record_file(&path) {
                continue;
            }
            match read_record(&path) {
                Ok(record) => {
                    next_id = next_id.max(record.id.as_u64() + 1);
                    by_filename.insert(record.filename, record.id);
                }
                Err(e) => warn!("Skipping unreadable record {}: {:#}", path.display(), e),
            }
        }

        debug!(
            "Opened record repository at {} ({} records)",
            dir.display(),
            by_filename.len()
        );
        Ok(Self {
            dir,
            index: Mutex::new(Index {
                next_id,
                by_filename,
            }),
        })
    }

    fn record_path(&self, id: RecordId) -> PathBuf {
        self.dir.join(format!("record_{}.json", id))
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<StoredAnalysis>> {
        let path = self.record_path(id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read record: {}", path.display()))?;
        let record = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse record: {}", path.display()))?;
        Ok(Some(record))
    }
}

fn is_record_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("record_") && n.ends_with(".json"))
        .unwrap_or(false)
}

fn read_record(path: &Path) -> Result<StoredAnalysis> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read record: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse record: {}", path.display()))
}

#[async_trait]
impl AnalysisRepository for JsonRecordRepository {
    async fn create_record(
        &self,
        result: &AnalysisResult,
        filename: &str,
        title: &str,
        kind: FileKind,
    ) -> Result<RecordId> {
        let mut index = self.index.lock().await;
        let id = RecordId::new(index.next_id);
        let record = StoredAnalysis {
            id,
            filename: filename.to_string(),
            title: title.to_string(),
            file_type: kind,
            created_at: Utc::now(),
            analysis: result.clone(),
        };

        let json = serde_json::to_string_pretty(&record)?;
        let path = self.record_path(id);
        let temp = self.dir.join(format!(".tmp_record_{}", id));
        tokio::fs::write(&temp, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write temp file: {}", temp.display()))?;
        tokio::fs::rename(&temp, &path)
            .await
            .with_context(|| format!("Failed to rename temp file to {}", path.display()))?;

        index.next_id += 1;
        index.by_filename.insert(filename.to_string(), id);
        info!("Saved analysis {} for {}", id, filename);
        Ok(id)
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Option<RecordId>> {
        Ok(self.index.lock().await.by_filename.get(filename).copied())
    }
}
