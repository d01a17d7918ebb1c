//! Types for the sorter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::{Disposition, SortError};
use crate::placer::PlacedFile;

/// A file that was moved into its category folder.
#[derive(Debug, Clone)]
pub struct SortedFile {
    /// Where the file was picked up.
    pub source: PathBuf,
    /// Category folder name.
    pub category: String,
    pub placed: PlacedFile,
}

impl SortedFile {
    pub fn destination(&self) -> &std::path::Path {
        &self.placed.destination
    }
}

/// How processing a single path ended.
#[derive(Debug)]
pub enum SortOutcome {
    Moved(SortedFile),
    Rejected(SortError),
    Skipped(SortError),
    Failed(SortError),
}

impl SortOutcome {
    /// Classify an error by its disposition.
    pub fn from_error(error: SortError) -> Self {
        match error.disposition() {
            Disposition::Rejected => Self::Rejected(error),
            Disposition::Skipped => Self::Skipped(error),
            Disposition::Failed => Self::Failed(error),
        }
    }

    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The error, unless the file was moved.
    pub fn error(&self) -> Option<&SortError> {
        match self {
            Self::Moved(_) => None,
            Self::Rejected(e) | Self::Skipped(e) | Self::Failed(e) => Some(e),
        }
    }
}

/// Snapshot of the sorter's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SorterStatus {
    /// Whether the worker pool is running.
    pub running: bool,
    /// Number of workers the pool runs.
    pub workers: usize,
    /// Paths waiting in the queue.
    pub queued: usize,
    /// Paths taken off the queue since startup.
    pub received: u64,
    pub moved: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Counters shared by all workers.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    received: AtomicU64,
    moved: AtomicU64,
    skipped: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl PoolStats {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, outcome: &SortOutcome) {
        let counter = match outcome {
            SortOutcome::Moved(_) => &self.moved,
            SortOutcome::Skipped(_) => &self.skipped,
            SortOutcome::Rejected(_) => &self.rejected,
            SortOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn to_status(&self, running: bool, workers: usize, queued: usize) -> SorterStatus {
        SorterStatus {
            running,
            workers,
            queued,
            received: self.received.load(Ordering::Relaxed),
            moved: self.moved.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
