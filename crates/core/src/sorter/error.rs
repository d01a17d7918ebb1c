//! Error types for the sorter module.

use std::path::PathBuf;
use thiserror::Error;

use crate::guard::PathTraversal;
use crate::placer::PlacerError;
use crate::resolver::InvalidName;

/// Why a file was not sorted.
#[derive(Debug, Error)]
pub enum SortError {
    #[error(transparent)]
    PathTraversal(#[from] PathTraversal),

    #[error(transparent)]
    InvalidName(#[from] InvalidName),

    /// The file disappeared before or while it was processed.
    #[error("File no longer exists: {path}")]
    Vanished { path: PathBuf },

    /// Directories and other non-regular entries are left alone.
    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Filtered out (hidden file, or not directly inside the root).
    #[error("Ignored {path}: {reason}")]
    Ignored { path: PathBuf, reason: &'static str },

    /// The file was still being written when the stability window ran out.
    #[error("File never stabilized: {path}")]
    Unstable { path: PathBuf },

    #[error("Move failed: {0}")]
    Placement(#[from] PlacerError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Processing panicked.
    #[error("Unexpected error while processing {path}: {message}")]
    Unexpected { path: PathBuf, message: String },
}

/// Errors from setting up or driving the worker pool.
#[derive(Debug, Error)]
pub enum SorterError {
    #[error("Monitored folder is not accessible: {path}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Monitored path is not a directory: {path}")]
    RootNotADirectory { path: PathBuf },

    #[error("Failed to scan {path}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal classification of a [`SortError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Security or validation failure; the file is left alone.
    Rejected,
    /// Nothing to do, or not ready yet.
    Skipped,
    /// An attempt was made and failed; the user is told.
    Failed,
}

impl SortError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::PathTraversal(_) | Self::InvalidName(_) => Disposition::Rejected,
            Self::Vanished { .. }
            | Self::NotAFile { .. }
            | Self::Ignored { .. }
            | Self::Unstable { .. } => Disposition::Skipped,
            Self::Placement(e) if e.is_source_missing() => Disposition::Skipped,
            Self::Placement(_) | Self::Io { .. } | Self::Unexpected { .. } => Disposition::Failed,
        }
    }
}
