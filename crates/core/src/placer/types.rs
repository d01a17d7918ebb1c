//! Types for the placer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a file ended up at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMethod {
    /// Same-volume move, no data copied.
    Renamed,
    /// Copy, size verification, then source deletion.
    Copied,
}

/// Information about a placed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedFile {
    /// Final location.
    pub destination: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// SHA-256 of the content, when checksum verification ran.
    pub checksum: Option<String>,
    /// Strategy that completed the move.
    pub method: PlacementMethod,
}
