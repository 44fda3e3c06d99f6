//! Status Store - one JSON document per batch
//!
//! ```text
//! <data_dir>/
//! ├── batch_{id_1}_status.json
//! ├── batch_{id_2}_status.json
//! └── ...
//! ```
//!
//! Writes go through a temp file in the same directory followed by a rename,
//! so a reader never observes a half-written document.

use crate::batch::Batch;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use storyscope_ids::BatchId;
use tracing::{debug, warn};

const FILE_PREFIX: &str = "batch_";
const FILE_SUFFIX: &str = "_status.json";

/// Durable batch status documents.
#[derive(Debug, Clone)]
pub struct StatusStore {
    dir: PathBuf,
}

impl StatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| {
            format!("Failed to create status directory: {}", dir.display())
        })?;
        Ok(Self { dir })
    }

    fn batch_path(&self, id: &BatchId) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, id.as_str(), FILE_SUFFIX))
    }

    pub fn save(&self, batch: &Batch) -> Result<()> {
        let path = self.batch_path(&batch.id);
        let json = serde_json::to_string_pretty(batch)
            .with_context(|| format!("Failed to serialize batch {}", batch.id))?;

        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Failed to write status file: {}", path.display()))?;

        debug!("Saved batch {} to {}", batch.id, path.display());
        Ok(())
    }

    pub fn load(&self, id: &BatchId) -> Result<Option<Batch>> {
        let path = self.batch_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_batch(&path).map(Some)
    }

    /// Every saved batch, oldest id first. Unreadable documents are skipped
    /// with a warning so one corrupt file does not hide the rest.
    pub fn list(&self) -> Result<Vec<Batch>> {
        let entries = fs::read_dir(&self.dir).with_context(|| {
            format!("Failed to read status directory: {}", self.dir.display())
        })?;

        let mut batches = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("Failed to read status directory: {}", self.dir.display())
            })?;
            let path = entry.path();
            let is_status_file = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
                .unwrap_or(false);
            if !is_status_file {
                continue;
            }

            match read_batch(&path) {
                Ok(batch) => batches.push(batch),
                Err(e) => warn!("Skipping unreadable status file {}: {:#}", path.display(), e),
            }
        }

        batches.sort_by(|a, b| a.id.cmp(&b.id));
        debug!("Loaded {} batches from {}", batches.len(), self.dir.display());
        Ok(batches)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn read_batch(path: &Path) -> Result<Batch> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read status file: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse status file: {}", path.display()))
}

/// Atomic write via temp file + rename
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));

    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file: {}", temp_path.display()))?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e).with_context(|| format!("Failed to rename temp file to {}", path.display()));
    }
    Ok(())
}
