//! Mock placer for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::placer::{PlacedFile, PlacementMethod, Placer, PlacerError};

/// A recorded placement for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPlacement {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Whether the placement succeeded.
    pub success: bool,
}

/// Mock implementation of the Placer trait.
///
/// Provides controllable behavior for testing:
/// - Track placements for assertions
/// - Simulate failure of the next placement
/// - Simulate slow moves
/// - Optionally perform a real rename
///
/// # Example
///
/// ```rust,ignore
/// use orionis_core::testing::MockPlacer;
///
/// let placer = MockPlacer::new();
/// placer.set_next_error(PlacerError::PermissionDenied { path }).await;
///
/// // ... run the sorter
///
/// assert_eq!(placer.placement_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockPlacer {
    /// Recorded placements.
    placements: Arc<RwLock<Vec<RecordedPlacement>>>,
    /// If set, the next placement will fail with this error.
    next_error: Arc<RwLock<Option<PlacerError>>>,
    /// Simulated placement duration in milliseconds.
    placement_duration_ms: Arc<RwLock<u64>>,
    /// Whether to actually rename the file.
    move_files: Arc<RwLock<bool>>,
}

impl Default for MockPlacer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlacer {
    /// Create a new mock placer that records placements without touching
    /// the filesystem.
    pub fn new() -> Self {
        Self {
            placements: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            placement_duration_ms: Arc::new(RwLock::new(0)),
            move_files: Arc::new(RwLock::new(false)),
        }
    }

    /// Create a mock placer that renames files for real.
    pub fn moving() -> Self {
        Self {
            move_files: Arc::new(RwLock::new(true)),
            ..Self::new()
        }
    }

    /// Get all recorded placements.
    pub async fn recorded_placements(&self) -> Vec<RecordedPlacement> {
        self.placements.read().await.clone()
    }

    /// Get the number of placements attempted.
    pub async fn placement_count(&self) -> usize {
        self.placements.read().await.len()
    }

    /// Configure the next placement to fail with the given error.
    pub async fn set_next_error(&self, error: PlacerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Set the simulated placement duration.
    pub async fn set_placement_duration(&self, duration: Duration) {
        *self.placement_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<PlacerError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, source: &Path, destination: &Path, success: bool) {
        self.placements.write().await.push(RecordedPlacement {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            success,
        });
    }
}

#[async_trait]
impl Placer for MockPlacer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn place(&self, source: &Path, destination: &Path) -> Result<PlacedFile, PlacerError> {
        if let Some(err) = self.take_error().await {
            self.record(source, destination, false).await;
            return Err(err);
        }

        // Simulate placement time
        let duration_ms = *self.placement_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        let mut size_bytes = 0;
        if *self.move_files.read().await {
            size_bytes = tokio::fs::metadata(source).await.map(|m| m.len()).unwrap_or(0);
            if let Err(e) = tokio::fs::rename(source, destination).await {
                self.record(source, destination, false).await;
                return Err(PlacerError::move_failed(
                    source.to_path_buf(),
                    destination.to_path_buf(),
                    e,
                ));
            }
        }

        self.record(source, destination, true).await;

        Ok(PlacedFile {
            destination: destination.to_path_buf(),
            size_bytes,
            checksum: None,
            method: PlacementMethod::Renamed,
        })
    }
}
