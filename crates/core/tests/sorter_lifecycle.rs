//! Sorter lifecycle integration tests.
//!
//! These tests drive the full pipeline (queue, workers, placer, status
//! channel, listener) against temporary folders:
//! - Files land in the right category folder and are reported once
//! - Paths outside the root are rejected and left alone
//! - Many files across several workers are each moved exactly once
//! - Move failures and vanishing files end in the right state

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::task::JoinHandle;

use orionis_core::{
    placer::{FsPlacer, Placer, PlacerError},
    testing::{fixtures, MockPlacer, RecordingNotifier},
    status_channel, Config, DownloadWatcher, FileSorter, StatusListener, StopSignal,
};

/// Test helper wiring a sorter to a recording notifier.
struct TestHarness {
    sorter: FileSorter,
    notifier: RecordingNotifier,
    listener_stop: StopSignal,
    listener: JoinHandle<usize>,
    root: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_placer(Arc::new(FsPlacer::with_defaults()), |_| {})
    }

    fn with_placer(placer: Arc<dyn Placer>, tweak: impl FnOnce(&mut Config)) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let mut config = fixtures::fast_config(root.path());
        config.categories = fixtures::small_categories();
        tweak(&mut config);

        let (status, status_rx) = status_channel(config.sorter.status_buffer);
        let sorter = FileSorter::new(&config, placer, status, StopSignal::new())
            .expect("Failed to create sorter");

        let notifier = RecordingNotifier::new();
        let listener_stop = StopSignal::new();
        let listener = tokio::spawn(
            StatusListener::new(status_rx, Arc::new(notifier.clone()), listener_stop.clone())
                .run(),
        );

        Self {
            sorter,
            notifier,
            listener_stop,
            listener,
            root,
        }
    }

    fn path(&self) -> &Path {
        self.sorter.root()
    }

    fn create_file(&self, name: &str, size: usize) -> std::path::PathBuf {
        fixtures::write_file(self.path(), name, size).expect("Failed to create file")
    }

    async fn wait_for(&self, what: &str, condition: impl Fn(&FileSorter) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !condition(&self.sorter) {
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {}: {:?}",
                what,
                self.sorter.status()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Stop the pool, then the listener; returns delivered message count.
    async fn shutdown(self) -> usize {
        self.sorter.stop().await;
        self.listener_stop.trigger();
        let delivered = self.listener.await.expect("listener panicked");
        drop(self.root);
        delivered
    }
}

#[tokio::test]
async fn test_photo_is_sorted_and_reported_once() {
    let harness = TestHarness::new();
    harness.sorter.start().await;

    let source = harness.create_file("photo.jpg", 500);
    harness.sorter.enqueue(source.clone());
    harness.wait_for("move", |s| s.status().moved == 1).await;

    assert!(harness.path().join("Images").join("photo.jpg").exists());
    assert!(!source.exists());

    let notifier = harness.notifier.clone();
    assert_eq!(harness.shutdown().await, 1);
    let sorted = notifier.messages_titled("File Sorted").await;
    assert_eq!(sorted.len(), 1);
    assert_eq!(sorted[0].text, "photo.jpg was moved to Images.");
}

#[tokio::test]
async fn test_path_outside_root_is_rejected() {
    let harness = TestHarness::new();
    let outside = TempDir::new().unwrap();
    let stray = fixtures::write_file(outside.path(), "stray.jpg", 10).unwrap();
    harness.sorter.start().await;

    harness.sorter.enqueue(stray.clone());
    harness.sorter.enqueue(harness.path().join("..").join("escape.jpg"));
    harness.wait_for("rejections", |s| s.status().rejected == 2).await;

    assert!(stray.exists());
    let notifier = harness.notifier.clone();
    assert_eq!(harness.shutdown().await, 0);
    assert!(notifier.messages().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_files_many_workers_exactly_once() {
    const FILES: usize = 40;
    let harness = TestHarness::with_placer(Arc::new(FsPlacer::with_defaults()), |config| {
        config.sorter.workers = 4;
    });
    harness.sorter.start().await;

    for i in 0..FILES {
        let path = harness.create_file(&format!("file{:02}.jpg", i), 64);
        harness.sorter.enqueue(path);
    }
    harness
        .wait_for("all moves", |s| s.status().moved == FILES as u64)
        .await;

    let sorted: HashSet<_> = std::fs::read_dir(harness.path().join("Images"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(sorted.len(), FILES);
    for i in 0..FILES {
        let name = format!("file{:02}.jpg", i);
        assert!(sorted.contains(std::ffi::OsStr::new(&name)), "{} missing", name);
    }

    let status = harness.sorter.status();
    assert_eq!(status.received, FILES as u64);
    assert_eq!(status.failed + status.skipped + status.rejected, 0);

    let notifier = harness.notifier.clone();
    harness.shutdown().await;
    assert_eq!(notifier.messages().await.len(), FILES);
}

#[tokio::test]
async fn test_sort_existing_files() {
    let harness = TestHarness::new();
    harness.create_file("notes.txt", 20);
    harness.create_file("scan.pdf", 20);
    harness.create_file("mystery.bin", 20);
    std::fs::create_dir(harness.path().join("Projects")).unwrap();

    let queued = harness.sorter.sort_existing_files().await.unwrap();
    assert_eq!(queued, 3);

    harness.sorter.start().await;
    harness.wait_for("moves", |s| s.status().moved == 3).await;

    assert!(harness.path().join("Documents").join("notes.txt").exists());
    assert!(harness.path().join("Documents").join("scan.pdf").exists());
    assert!(harness.path().join("Others").join("mystery.bin").exists());
    assert!(harness.path().join("Projects").is_dir());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_name_collision_gets_suffix() {
    let harness = TestHarness::new();
    harness.sorter.start().await;
    std::fs::write(harness.path().join("Images").join("photo.jpg"), b"old").unwrap();

    let source = harness.create_file("photo.jpg", 5);
    harness.sorter.enqueue(source);
    harness.wait_for("move", |s| s.status().moved == 1).await;

    let images = harness.path().join("Images");
    assert_eq!(std::fs::read(images.join("photo.jpg")).unwrap(), b"old");
    assert!(images.join("photo_1.jpg").exists());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_move_error_is_reported_and_file_kept() {
    let placer = Arc::new(MockPlacer::moving());
    placer
        .set_next_error(PlacerError::PermissionDenied {
            path: "a.txt".into(),
        })
        .await;
    let harness = TestHarness::with_placer(placer.clone(), |_| {});
    harness.sorter.start().await;

    let source = harness.create_file("a.txt", 10);
    harness.sorter.enqueue(source.clone());
    harness.wait_for("failure", |s| s.status().failed == 1).await;

    assert!(source.exists());
    assert_eq!(placer.placement_count().await, 1);

    let notifier = harness.notifier.clone();
    harness.shutdown().await;
    let errors = notifier.messages_titled("Move Error").await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].text, "Could not move a.txt. Check permissions.");
}

#[tokio::test]
async fn test_vanished_file_is_skipped_without_move() {
    let placer = Arc::new(MockPlacer::moving());
    let harness = TestHarness::with_placer(placer.clone(), |config| {
        config.stability.poll_interval_ms = 100;
    });
    let source = harness.create_file("big.jpg", 4096);

    let worker = harness.sorter.worker();
    let task = {
        let source = source.clone();
        tokio::spawn(async move { worker.process(&source).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    std::fs::remove_file(&source).unwrap();

    let outcome = task.await.unwrap();
    assert!(outcome.is_skipped(), "unexpected outcome: {:?}", outcome);
    assert_eq!(placer.placement_count().await, 0);
    assert_eq!(harness.sorter.status().skipped, 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_watcher_feeds_the_pool() {
    let harness = TestHarness::new();
    harness.sorter.start().await;
    let watcher = DownloadWatcher::start(harness.path(), harness.sorter.queue()).unwrap();

    harness.create_file("arrived.pdf", 100);
    harness.wait_for("watched move", |s| s.status().moved == 1).await;

    assert!(harness.path().join("Documents").join("arrived.pdf").exists());

    drop(watcher);
    harness.shutdown().await;
}
