//! Fake collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storyscope_batch::{
    AnalysisRepository, AnalysisResult, AnalyzerError, ContentAnalyzer, FileKind,
    OrchestratorConfig, PipelineConfig, RecordId,
};
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Analyzer whose per-file outcomes are scripted. Files without a script
/// succeed.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    scripts: Mutex<HashMap<String, VecDeque<Result<(), String>>>>,
    always_fail: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    releases: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
    delay: Option<Duration>,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `analyze` call waits for a permit on the returned semaphore.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let analyzer = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (analyzer, gate)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_once(&self, filename: &str, error: &str) {
        self.scripts
            .lock()
            .unwrap()
            .entry(filename.to_string())
            .or_default()
            .push_back(Err(error.to_string()));
    }

    pub fn fail_always(&self, filename: &str, error: &str) {
        self.always_fail
            .lock()
            .unwrap()
            .insert(filename.to_string(), error.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, filename: &str) -> usize {
        self.calls().iter().filter(|c| *c == filename).count()
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Signalled each time `analyze` is entered.
    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }
}

#[async_trait]
impl ContentAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, path: &Path, mime_type: &str) -> Result<AnalysisResult, AnalyzerError> {
        let name = file_name(path);
        self.calls.lock().unwrap().push(name.clone());
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.always_fail.lock().unwrap().get(&name) {
            return Err(AnalyzerError::new(error.clone()));
        }
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&name)
            .and_then(VecDeque::pop_front);
        if let Some(Err(error)) = scripted {
            return Err(AnalyzerError::new(error));
        }

        Ok(AnalysisResult {
            format: Some(mime_type.to_string()),
            summary: Some(format!("summary of {}", name)),
            confidence_score: 0.9,
            ..AnalysisResult::default()
        })
    }

    async fn release(&self, _path: &Path) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub filename: String,
    pub title: String,
    pub kind: FileKind,
    pub summary: Option<String>,
}

/// In-memory analysis repository.
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<Vec<StoredRecord>>,
    next_id: AtomicU64,
    failing_creates: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Pretend an analysis already exists for `filename`.
    pub fn insert_existing(&self, filename: &str) -> RecordId {
        let id = RecordId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(StoredRecord {
            id,
            filename: filename.to_string(),
            title: String::new(),
            kind: FileKind::Audio,
            summary: None,
        });
        id
    }

    /// Make the next `n` `create_record` calls fail.
    pub fn fail_creates(&self, n: usize) {
        self.failing_creates.store(n, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn record_for(&self, filename: &str) -> Option<StoredRecord> {
        self.records()
            .into_iter()
            .find(|r| r.filename == filename)
    }
}

#[async_trait]
impl AnalysisRepository for MemoryRepository {
    async fn create_record(
        &self,
        result: &AnalysisResult,
        filename: &str,
        title: &str,
        kind: FileKind,
    ) -> anyhow::Result<RecordId> {
        let should_fail = self
            .failing_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            anyhow::bail!("database is locked");
        }

        let id = RecordId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(StoredRecord {
            id,
            filename: filename.to_string(),
            title: title.to_string(),
            kind,
            summary: result.summary.clone(),
        });
        Ok(id)
    }

    async fn find_by_filename(&self, filename: &str) -> anyhow::Result<Option<RecordId>> {
        Ok(self.record_for(filename).map(|r| r.id))
    }
}

pub struct TestDirs {
    pub temp: TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.temp.path().join("uploads")
    }

    /// Short grace period so runs finish quickly.
    pub fn config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::new(self.data_dir(), self.uploads_dir());
        config.pipeline = fast_pipeline();
        config
    }
}

pub fn fast_pipeline() -> PipelineConfig {
    PipelineConfig {
        cleanup_grace: Duration::from_millis(200),
        cleanup_poll: Duration::from_millis(20),
    }
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
