//! Trait definitions for the placer module.

use async_trait::async_trait;
use std::path::Path;

use super::error::PlacerError;
use super::types::PlacedFile;

/// Moves a file to its final destination.
///
/// Implementations must leave the source untouched whenever they return an
/// error.
#[async_trait]
pub trait Placer: Send + Sync {
    /// Returns the name of this placer implementation.
    fn name(&self) -> &str;

    /// Moves `source` to `destination`. The destination must not exist.
    async fn place(&self, source: &Path, destination: &Path) -> Result<PlacedFile, PlacerError>;
}
