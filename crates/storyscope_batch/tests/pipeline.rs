//! Pipeline runs driven directly, without the orchestrator.

mod support;

use std::sync::Arc;
use std::time::Duration;
use storyscope_batch::{
    BatchId, BatchPipeline, BatchTracker, FileStatus, PayloadStore, PipelineConfig,
    RunOutcome, StatusStore, UploadSource, MAX_ATTEMPTS,
};
use support::{fast_pipeline, names, MemoryRepository, ScriptedAnalyzer, TestDirs};
use tokio_util::sync::CancellationToken;

struct Harness {
    dirs: TestDirs,
    tracker: Arc<BatchTracker>,
    payloads: PayloadStore,
    analyzer: Arc<ScriptedAnalyzer>,
    repository: Arc<MemoryRepository>,
    pipeline: Arc<BatchPipeline>,
}

impl Harness {
    fn new(analyzer: ScriptedAnalyzer, config: PipelineConfig) -> Self {
        let dirs = TestDirs::new();
        let tracker = Arc::new(BatchTracker::new(StatusStore::new(dirs.data_dir()).unwrap()));
        let payloads = PayloadStore::new(dirs.uploads_dir()).unwrap();
        let analyzer = Arc::new(analyzer);
        let repository = Arc::new(MemoryRepository::new());
        let pipeline = Arc::new(BatchPipeline::new(
            Arc::clone(&tracker),
            payloads.clone(),
            analyzer.clone(),
            repository.clone(),
            config,
        ));
        Self {
            dirs,
            tracker,
            payloads,
            analyzer,
            repository,
            pipeline,
        }
    }

    async fn batch_with_payloads(&self, files: &[&str]) -> BatchId {
        let id = self.tracker.create_batch(&names(files)).unwrap().id;
        for name in files {
            self.payloads
                .store(&id, name, &UploadSource::Bytes(b"payload".to_vec()))
                .await
                .unwrap();
        }
        id
    }
}

#[tokio::test]
async fn test_missing_payload_exhausts_attempts_without_analysis() {
    let h = Harness::new(ScriptedAnalyzer::new(), fast_pipeline());
    let id = h.tracker.create_batch(&names(&["ghost.mp3"])).unwrap().id;

    let summary = h.pipeline.run(&id, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.outcome, RunOutcome::Drained);
    assert_eq!(summary.failures, MAX_ATTEMPTS as usize);

    let batch = h.tracker.snapshot(&id).unwrap().unwrap();
    let record = batch.file("ghost.mp3").unwrap();
    assert_eq!(record.status, FileStatus::Failed);
    assert_eq!(record.attempts, MAX_ATTEMPTS);
    assert_eq!(record.error.as_deref(), Some("File not found before processing"));
    assert!(h.analyzer.calls().is_empty());
}

#[tokio::test]
async fn test_existing_record_short_circuits_analysis() {
    let h = Harness::new(ScriptedAnalyzer::new(), fast_pipeline());
    let id = h.batch_with_payloads(&["a.mp3", "b.mp3"]).await;
    let existing = h.repository.insert_existing("a.mp3");

    let summary = h.pipeline.run(&id, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.completed, 2);

    let batch = h.tracker.snapshot(&id).unwrap().unwrap();
    assert_eq!(batch.file("a.mp3").unwrap().analysis_id, Some(existing));
    assert_eq!(batch.file("a.mp3").unwrap().attempts, 0);
    assert_eq!(h.analyzer.calls(), vec!["b.mp3"]);
    assert!(!h.payloads.exists(&id, "a.mp3").await);
    assert!(!h.payloads.exists(&id, "b.mp3").await);
}

#[tokio::test]
async fn test_persistence_failure_is_retried() {
    let h = Harness::new(ScriptedAnalyzer::new(), fast_pipeline());
    h.repository.fail_creates(1);
    let id = h.batch_with_payloads(&["a.wav"]).await;

    let summary = h.pipeline.run(&id, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failures, 1);

    let record = h.tracker.snapshot(&id).unwrap().unwrap().files["a.wav"].clone();
    assert_eq!(record.status, FileStatus::Completed);
    assert_eq!(record.attempts, 2);
    assert_eq!(record.processing_progress, 100.0);
    assert_eq!(h.analyzer.releases(), 2);
    assert_eq!(h.repository.records().len(), 1);
}

#[tokio::test]
async fn test_failure_message_is_recorded_between_attempts() {
    let h = Harness::new(ScriptedAnalyzer::new(), fast_pipeline());
    h.repository.fail_creates(MAX_ATTEMPTS as usize);
    let id = h.batch_with_payloads(&["a.mp3"]).await;

    h.pipeline.run(&id, CancellationToken::new()).await.unwrap();

    let batch = h.tracker.snapshot(&id).unwrap().unwrap();
    let record = batch.file("a.mp3").unwrap();
    assert_eq!(record.status, FileStatus::Failed);
    assert_eq!(
        record.error.as_deref(),
        Some("Failed to save analysis: database is locked")
    );
    assert_eq!(record.current_operation, "failed");
    assert!(!h.payloads.exists(&id, "a.mp3").await);
}

#[tokio::test]
async fn test_runs_on_one_batch_are_serialized() {
    let h = Harness::new(
        ScriptedAnalyzer::with_delay(Duration::from_millis(10)),
        fast_pipeline(),
    );
    let id = h.batch_with_payloads(&["a.mp3", "b.mp3", "c.mp3"]).await;

    let first = {
        let pipeline = Arc::clone(&h.pipeline);
        let id = id.clone();
        tokio::spawn(async move { pipeline.run(&id, CancellationToken::new()).await })
    };
    let second = {
        let pipeline = Arc::clone(&h.pipeline);
        let id = id.clone();
        tokio::spawn(async move { pipeline.run(&id, CancellationToken::new()).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.completed + second.completed, 3);
    assert_eq!(h.analyzer.calls().len(), 3);
    assert!(h.tracker.is_complete(&id).unwrap());
}

#[tokio::test]
async fn test_grace_cleanup_removes_terminal_payloads_only() {
    let h = Harness::new(ScriptedAnalyzer::new(), fast_pipeline());
    let id = h.batch_with_payloads(&["a.mp3", "b.mp3"]).await;
    h.tracker.mark_started(&id, "a.mp3").unwrap();
    h.tracker.cancel(&id).unwrap();

    let summary = h.pipeline.run(&id, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.outcome, RunOutcome::Cancelled);

    // b was cancelled (terminal); a is still processing, so its payload stays.
    assert!(!h.payloads.exists(&id, "b.mp3").await);
    assert!(h.payloads.exists(&id, "a.mp3").await);
}

#[tokio::test]
async fn test_shutdown_interrupts_run_and_grace_wait() {
    let h = Harness::new(
        ScriptedAnalyzer::new(),
        PipelineConfig {
            cleanup_grace: Duration::from_secs(600),
            cleanup_poll: Duration::from_secs(60),
        },
    );
    let id = h.batch_with_payloads(&["a.mp3"]).await;
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), h.pipeline.run(&id, shutdown))
        .await
        .expect("shutdown should cut the grace wait short")
        .unwrap();
    assert_eq!(summary.outcome, RunOutcome::Interrupted);
    assert!(h.analyzer.calls().is_empty());
    assert!(h.payloads.exists(&id, "a.mp3").await);
    assert_eq!(
        h.tracker.snapshot(&id).unwrap().unwrap().files["a.mp3"].status,
        FileStatus::Pending
    );
}

#[tokio::test]
async fn test_unsupported_type_fails_without_analysis() {
    let h = Harness::new(ScriptedAnalyzer::new(), fast_pipeline());
    let id = h.batch_with_payloads(&["notes.txt"]).await;

    h.pipeline.run(&id, CancellationToken::new()).await.unwrap();

    let batch = h.tracker.snapshot(&id).unwrap().unwrap();
    let record = batch.file("notes.txt").unwrap();
    assert_eq!(record.status, FileStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("Unsupported file type: notes.txt"));
    assert!(h.analyzer.calls().is_empty());
}

#[tokio::test]
async fn test_grace_cleanup_leaves_other_batches_alone() {
    let h = Harness::new(ScriptedAnalyzer::new(), fast_pipeline());
    let cancelled = h.batch_with_payloads(&["x.mp3"]).await;
    let live = h.batch_with_payloads(&["x.mp3"]).await;
    h.tracker.cancel(&cancelled).unwrap();

    let summary = h
        .pipeline
        .run(&cancelled, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.outcome, RunOutcome::Cancelled);

    assert!(!h.payloads.exists(&cancelled, "x.mp3").await);
    assert!(!h.payloads.batch_dir(&cancelled).exists());
    assert!(h.payloads.exists(&live, "x.mp3").await);

    // The other batch still processes its own copy.
    let summary = h.pipeline.run(&live, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(h.analyzer.calls(), vec!["x.mp3"]);
    assert!(!h.payloads.batch_dir(&live).exists());
}

#[tokio::test(flavor = "current_thread")]
async fn test_transitions_reach_disk_while_run_is_in_flight() {
    let (analyzer, gate) = ScriptedAnalyzer::gated();
    let h = Harness::new(analyzer, fast_pipeline());
    let entered = h.analyzer.entered();
    let id = h.batch_with_payloads(&["a.mp3"]).await;

    let run = {
        let pipeline = Arc::clone(&h.pipeline);
        let id = id.clone();
        tokio::spawn(async move { pipeline.run(&id, CancellationToken::new()).await })
    };
    entered.notified().await;

    // A second tracker sees only what was written to the status document.
    let on_disk = BatchTracker::new(StatusStore::new(h.dirs.data_dir()).unwrap());
    let record = on_disk.snapshot(&id).unwrap().unwrap().files["a.mp3"].clone();
    assert_eq!(record.status, FileStatus::Processing);
    assert_eq!(record.attempts, 1);
    assert_eq!(record.current_operation, "analyzing content");

    gate.add_permits(1);
    let summary = run.await.unwrap().unwrap();
    assert_eq!(summary.completed, 1);

    let on_disk = BatchTracker::new(StatusStore::new(h.dirs.data_dir()).unwrap());
    let batch = on_disk.snapshot(&id).unwrap().unwrap();
    assert_eq!(batch.files["a.mp3"].status, FileStatus::Completed);
    assert!(batch.completed_at.is_some());
}
