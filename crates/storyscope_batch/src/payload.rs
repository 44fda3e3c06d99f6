//! Payload Store - uploaded file bodies awaiting analysis
//!
//! Payloads live under `<uploads>/<batch_id>/`, addressed by their
//! sanitized filename. The pipeline removes a payload once its file is done
//! with it, and the batch directory once it is empty.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use storyscope_ids::BatchId;
use tokio::fs;
use tracing::debug;

/// Where an uploaded body comes from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Body already in memory.
    Bytes(Vec<u8>),
    /// Body on local disk; copied into the payload store.
    File(PathBuf),
}

/// One file handed to `Orchestrator::submit`.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied name, sanitized on submit.
    pub filename: String,
    pub source: UploadSource,
}

impl Upload {
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            source: UploadSource::Bytes(bytes.into()),
        }
    }

    /// Upload named after the file's own name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            filename,
            source: UploadSource::File(path),
        }
    }

    pub async fn size(&self) -> Result<u64> {
        match &self.source {
            UploadSource::Bytes(bytes) => Ok(bytes.len() as u64),
            UploadSource::File(path) => {
                let meta = fs::metadata(path)
                    .await
                    .with_context(|| format!("Failed to stat upload: {}", path.display()))?;
                Ok(meta.len())
            }
        }
    }
}

/// Uploaded bodies, one subdirectory per batch so equal filenames in
/// different batches never share a path.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    dir: PathBuf,
}

impl PayloadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).with_context(|| {
            format!("Failed to create uploads directory: {}", dir.display())
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn batch_dir(&self, batch_id: &BatchId) -> PathBuf {
        self.dir.join(batch_id.as_str())
    }

    pub fn path(&self, batch_id: &BatchId, filename: &str) -> PathBuf {
        self.batch_dir(batch_id).join(filename)
    }

    pub async fn exists(&self, batch_id: &BatchId, filename: &str) -> bool {
        fs::try_exists(self.path(batch_id, filename))
            .await
            .unwrap_or(false)
    }

    pub async fn store(
        &self,
        batch_id: &BatchId,
        filename: &str,
        source: &UploadSource,
    ) -> Result<PathBuf> {
        let batch_dir = self.batch_dir(batch_id);
        fs::create_dir_all(&batch_dir).await.with_context(|| {
            format!("Failed to create payload directory: {}", batch_dir.display())
        })?;

        let path = batch_dir.join(filename);
        match source {
            UploadSource::Bytes(bytes) => fs::write(&path, bytes)
                .await
                .with_context(|| format!("Failed to write payload: {}", path.display()))?,
            UploadSource::File(from) => {
                fs::copy(from, &path).await.with_context(|| {
                    format!(
                        "Failed to copy {} to {}",
                        from.display(),
                        path.display()
                    )
                })?;
            }
        }
        debug!("Stored payload {}", path.display());
        Ok(path)
    }

    /// Returns false when there was nothing to remove.
    pub async fn remove(&self, batch_id: &BatchId, filename: &str) -> Result<bool> {
        let path = self.path(batch_id, filename);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed payload {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove payload: {}", path.display()))
            }
        }
    }

    /// Remove the batch's payload directory once it holds nothing. Returns
    /// true when the directory is gone afterwards.
    pub async fn prune(&self, batch_id: &BatchId) -> Result<bool> {
        let batch_dir = self.batch_dir(batch_id);
        let mut entries = match fs::read_dir(&batch_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", batch_dir.display()))
            }
        };
        if entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to read {}", batch_dir.display()))?
            .is_some()
        {
            return Ok(false);
        }

        fs::remove_dir(&batch_dir)
            .await
            .with_context(|| format!("Failed to remove {}", batch_dir.display()))?;
        debug!("Removed payload directory {}", batch_dir.display());
        Ok(true)
    }
}
