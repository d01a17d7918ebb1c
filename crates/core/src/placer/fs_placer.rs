//! File system placer implementation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, warn};

use super::config::PlacerConfig;
use super::error::PlacerError;
use super::traits::Placer;
use super::types::{PlacedFile, PlacementMethod};

/// File system based placer implementation.
///
/// Moves without copying when possible. Across volumes (or with atomic
/// moves disabled) it copies, verifies the copy, and only then deletes the
/// source. An existing destination is never replaced.
#[derive(Debug, Clone)]
pub struct FsPlacer {
    config: PlacerConfig,
}

impl FsPlacer {
    /// Creates a new file system placer with the given configuration.
    pub fn new(config: PlacerConfig) -> Self {
        Self { config }
    }

    /// Creates a placer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlacerConfig::default())
    }

    /// Attempts to move a file without copying it.
    ///
    /// The file is hard-linked into place and the source name is removed.
    /// Linking fails when the destination exists, so a file that appeared
    /// there in the meantime is never replaced. Returns `Ok(false)` when
    /// linking cannot work here: different filesystems, or no hard link
    /// support.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, PlacerError> {
        match fs::hard_link(source, destination).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(PlacerError::DestinationExists {
                    path: destination.to_path_buf(),
                });
            }
            Err(e) if Self::link_unsupported(&e) => return Ok(false),
            Err(e) => {
                return Err(PlacerError::move_failed(
                    source.to_path_buf(),
                    destination.to_path_buf(),
                    e,
                ))
            }
        }

        match fs::remove_file(source).await {
            Ok(()) => Ok(true),
            // Someone else removed the old name; the data lives on at the destination.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => {
                Self::discard_copy(destination).await;
                Err(PlacerError::CleanupFailed {
                    path: source.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    /// Whether a failed hard link means "copy instead" rather than a real error.
    fn link_unsupported(e: &std::io::Error) -> bool {
        // EXDEV (18) across filesystems, EPERM (1) or EOPNOTSUPP (95) where
        // the filesystem has no hard links.
        e.kind() == std::io::ErrorKind::CrossesDevices
            || e.kind() == std::io::ErrorKind::Unsupported
            || matches!(e.raw_os_error(), Some(1) | Some(18) | Some(95))
    }

    /// Describes a file that was moved into place.
    ///
    /// The move already happened, so size and checksum lookups are best
    /// effort: failures are logged and never turn the placement into an error.
    async fn moved_file(&self, destination: &Path, size_hint: u64) -> PlacedFile {
        let size_bytes = match fs::metadata(destination).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(
                    "Moved {} but could not read its size: {}",
                    destination.display(),
                    e
                );
                size_hint
            }
        };

        let checksum = if self.config.verify_checksums {
            match self.calculate_checksum(destination).await {
                Ok(sum) => Some(sum),
                Err(e) => {
                    warn!("Moved {} but {}", destination.display(), e);
                    None
                }
            }
        } else {
            None
        };

        PlacedFile {
            destination: destination.to_path_buf(),
            size_bytes,
            checksum,
            method: PlacementMethod::Renamed,
        }
    }

    /// Copies a file with optional checksum calculation.
    ///
    /// The destination is created exclusively, so an existing file is never
    /// truncated.
    async fn copy_file(
        &self,
        source: &Path,
        destination: &Path,
        calculate_checksum: bool,
    ) -> Result<(u64, Option<String>), PlacerError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            }
        })?;

        let dest_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    PlacerError::DestinationExists {
                        path: destination.to_path_buf(),
                    }
                } else {
                    PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
                }
            })?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, dest_file);

        let mut hasher = if calculate_checksum {
            Some(Sha256::new())
        } else {
            None
        };

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.config.buffer_size];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            if bytes_read == 0 {
                break;
            }

            if let Some(ref mut h) = hasher {
                h.update(&buffer[..bytes_read]);
            }

            writer.write_all(&buffer[..bytes_read]).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;
        writer.get_ref().sync_all().await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        let checksum = hasher.map(|h| format!("{:x}", h.finalize()));

        Ok((total_bytes, checksum))
    }

    /// Calculates the SHA-256 checksum of a file.
    async fn calculate_checksum(&self, path: &Path) -> Result<String, PlacerError> {
        let file = File::open(path)
            .await
            .map_err(|e| PlacerError::ChecksumCalculationFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut hasher = Sha256::new();

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
                PlacerError::ChecksumCalculationFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Removes a copy this placer created.
    async fn discard_copy(destination: &Path) {
        if let Err(e) = fs::remove_file(destination).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove incomplete copy {}: {}",
                    destination.display(),
                    e
                );
            }
        }
    }

    /// Copy, verify, then delete the source.
    ///
    /// If the copy itself fails, the partial copy is removed and a direct
    /// move is attempted as a last resort.
    async fn copy_verify_delete(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<PlacedFile, PlacerError> {
        let expected = source_size(source).await?;

        let checksum = match self
            .copy_file(source, destination, self.config.verify_checksums)
            .await
        {
            Ok((_, checksum)) => checksum,
            Err(
                e @ (PlacerError::SourceNotFound { .. } | PlacerError::DestinationExists { .. }),
            ) => return Err(e),
            Err(copy_error) => {
                Self::discard_copy(destination).await;
                return self
                    .direct_move_fallback(source, destination, expected, copy_error)
                    .await;
            }
        };

        let actual = self
            .verify_copy(source, destination, expected, checksum.as_deref())
            .await?;
        Self::release_source(source, destination).await?;

        Ok(PlacedFile {
            destination: destination.to_path_buf(),
            size_bytes: actual,
            checksum,
            method: PlacementMethod::Copied,
        })
    }

    /// Last resort after a failed copy. Reports the copy error if the move
    /// does not work either.
    async fn direct_move_fallback(
        &self,
        source: &Path,
        destination: &Path,
        expected: u64,
        copy_error: PlacerError,
    ) -> Result<PlacedFile, PlacerError> {
        warn!(
            "Copy of {} failed ({}), attempting direct move",
            source.display(),
            copy_error
        );
        match Self::try_atomic_move(source, destination).await {
            Ok(true) => Ok(self.moved_file(destination, expected).await),
            Ok(false) => {
                debug!("Direct move fallback is not possible across filesystems");
                Err(copy_error)
            }
            Err(e) => {
                debug!("Direct move fallback failed: {}", e);
                Err(copy_error)
            }
        }
    }

    /// Checks the copy against the source: exact size, then the checksum if
    /// one was computed. The copy is removed on any failure.
    async fn verify_copy(
        &self,
        source: &Path,
        destination: &Path,
        expected: u64,
        copied_checksum: Option<&str>,
    ) -> Result<u64, PlacerError> {
        let actual = match fs::metadata(destination).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                Self::discard_copy(destination).await;
                return Err(PlacerError::Io(e));
            }
        };
        if actual != expected {
            Self::discard_copy(destination).await;
            return Err(PlacerError::SizeMismatch {
                path: destination.to_path_buf(),
                expected,
                actual,
            });
        }

        if let Some(copied) = copied_checksum {
            let original = match self.calculate_checksum(source).await {
                Ok(sum) => sum,
                Err(e) => {
                    Self::discard_copy(destination).await;
                    return Err(e);
                }
            };
            if original != copied {
                Self::discard_copy(destination).await;
                return Err(PlacerError::ChecksumMismatch {
                    path: destination.to_path_buf(),
                    expected: original,
                    actual: copied.to_string(),
                });
            }
        }

        Ok(actual)
    }

    /// Deletes the source of a verified copy.
    async fn release_source(source: &Path, destination: &Path) -> Result<(), PlacerError> {
        if let Err(e) = fs::remove_file(source).await {
            // Keep exactly one copy: the untouched source.
            Self::discard_copy(destination).await;
            return Err(PlacerError::CleanupFailed {
                path: source.to_path_buf(),
                source: e,
            });
        }
        Ok(())
    }
}

async fn source_size(source: &Path) -> Result<u64, PlacerError> {
    fs::metadata(source)
        .await
        .map(|meta| meta.len())
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::Io(e)
            }
        })
}

#[async_trait]
impl Placer for FsPlacer {
    fn name(&self) -> &str {
        "fs"
    }

    async fn place(&self, source: &Path, destination: &Path) -> Result<PlacedFile, PlacerError> {
        let size = source_size(source).await?;

        if fs::try_exists(destination).await.unwrap_or(true) {
            return Err(PlacerError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }

        if !self.config.prefer_atomic_moves {
            return self.copy_verify_delete(source, destination).await;
        }

        if Self::try_atomic_move(source, destination).await? {
            return Ok(self.moved_file(destination, size).await);
        }

        debug!(
            "{} cannot be linked into place, copying instead",
            destination.display()
        );
        self.copy_verify_delete(source, destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_place_renames_on_same_volume() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("photo.jpg");
        let dest = temp.path().join("Images").join("photo.jpg");
        fs::create_dir(temp.path().join("Images")).await.unwrap();
        fs::write(&source, "test content").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let placed = placer.place(&source, &dest).await.unwrap();

        assert_eq!(placed.method, PlacementMethod::Renamed);
        assert_eq!(placed.size_bytes, 12);
        assert!(dest.exists());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_place_copy_verify_delete() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("report.pdf");
        let dest = temp.path().join("report_copy.pdf");
        fs::write(&source, vec![7u8; 100_000]).await.unwrap();

        let placer = FsPlacer::new(
            PlacerConfig::default()
                .with_atomic_moves(false)
                .with_buffer_size(4096),
        );
        let placed = placer.place(&source, &dest).await.unwrap();

        assert_eq!(placed.method, PlacementMethod::Copied);
        assert_eq!(placed.size_bytes, 100_000);
        assert!(!source.exists());
        assert_eq!(fs::read(&dest).await.unwrap(), vec![7u8; 100_000]);
    }

    #[tokio::test]
    async fn test_checksum_verification() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.txt");
        let dest = temp.path().join("output.txt");
        fs::write(&source, "test content for checksum").await.unwrap();

        let expected = format!("{:x}", Sha256::digest(b"test content for checksum"));

        let placer = FsPlacer::new(
            PlacerConfig::default()
                .with_atomic_moves(false)
                .with_checksum_verification(true),
        );
        let placed = placer.place(&source, &dest).await.unwrap();

        assert_eq!(placed.checksum, Some(expected));
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_destination_exists_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.txt");
        let dest = temp.path().join("output.txt");
        fs::write(&source, "source content").await.unwrap();
        fs::write(&dest, "existing content").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let result = placer.place(&source, &dest).await;

        assert!(matches!(result, Err(PlacerError::DestinationExists { .. })));
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "existing content");
    }

    #[tokio::test]
    async fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let placer = FsPlacer::with_defaults();

        let result = placer
            .place(&temp.path().join("gone.txt"), &temp.path().join("out.txt"))
            .await;

        assert!(matches!(result, Err(PlacerError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_source_in_place() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("archive.zip");
        // Parent directory does not exist: both the copy and the direct move fallback fail.
        let dest = temp.path().join("missing").join("archive.zip");
        fs::write(&source, "zip bytes").await.unwrap();

        let placer = FsPlacer::new(PlacerConfig::default().with_atomic_moves(false));
        let result = placer.place(&source, &dest).await;

        assert!(matches!(result, Err(PlacerError::CopyFailed { .. })));
        assert!(source.exists());
        assert!(!dest.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_placements_never_share_a_destination() {
        for round in 0..50 {
            let temp = TempDir::new().unwrap();
            let first = temp.path().join("report.pdf");
            let second = temp.path().join("report_1.pdf");
            let dest = temp.path().join("Documents-report_1.pdf");
            fs::write(&first, "first").await.unwrap();
            fs::write(&second, "second").await.unwrap();

            let placer = FsPlacer::with_defaults();
            let (a, b) = tokio::join!(
                {
                    let placer = placer.clone();
                    let (first, dest) = (first.clone(), dest.clone());
                    tokio::spawn(async move { placer.place(&first, &dest).await })
                },
                {
                    let placer = placer.clone();
                    let (second, dest) = (second.clone(), dest.clone());
                    tokio::spawn(async move { placer.place(&second, &dest).await })
                }
            );
            let (a, b) = (a.unwrap(), b.unwrap());

            assert!(
                a.is_ok() != b.is_ok(),
                "round {}: exactly one placement must win: {:?} / {:?}",
                round,
                a,
                b
            );
            let (winner, loser, loser_source) = if a.is_ok() {
                ("first", b, &second)
            } else {
                ("second", a, &first)
            };
            assert!(matches!(loser, Err(PlacerError::DestinationExists { .. })));
            assert_eq!(fs::read_to_string(&dest).await.unwrap(), winner);
            assert!(loser_source.exists(), "round {}: losing file was lost", round);
        }
    }

    #[tokio::test]
    async fn test_move_refuses_destination_created_after_check() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("new.txt");
        let dest = temp.path().join("taken.txt");
        fs::write(&source, "new").await.unwrap();
        fs::write(&dest, "someone else").await.unwrap();

        let result = FsPlacer::try_atomic_move(&source, &dest).await;

        assert!(matches!(result, Err(PlacerError::DestinationExists { .. })));
        assert_eq!(fs::read_to_string(&source).await.unwrap(), "new");
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "someone else");
    }

    #[tokio::test]
    async fn test_direct_move_after_failed_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("movie.mkv");
        let dest = temp.path().join("Videos-movie.mkv");
        fs::write(&source, "frames").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let copy_error = PlacerError::copy_failed(
            source.clone(),
            dest.clone(),
            std::io::Error::other("read error"),
        );
        let placed = placer
            .direct_move_fallback(&source, &dest, 6, copy_error)
            .await
            .unwrap();

        assert_eq!(placed.method, PlacementMethod::Renamed);
        assert_eq!(placed.size_bytes, 6);
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "frames");
    }

    #[tokio::test]
    async fn test_direct_move_fallback_keeps_copy_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("movie.mkv");
        let dest = temp.path().join("taken.mkv");
        fs::write(&source, "frames").await.unwrap();
        fs::write(&dest, "other").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let copy_error = PlacerError::copy_failed(
            source.clone(),
            dest.clone(),
            std::io::Error::other("read error"),
        );
        let result = placer
            .direct_move_fallback(&source, &dest, 6, copy_error)
            .await;

        assert!(matches!(result, Err(PlacerError::CopyFailed { .. })));
        assert_eq!(fs::read_to_string(&source).await.unwrap(), "frames");
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "other");
    }

    #[tokio::test]
    async fn test_size_mismatch_discards_copy_and_keeps_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("big.iso");
        let dest = temp.path().join("copy.iso");
        fs::write(&source, vec![1u8; 1000]).await.unwrap();
        fs::write(&dest, vec![1u8; 600]).await.unwrap();

        let placer = FsPlacer::with_defaults();
        let result = placer.verify_copy(&source, &dest, 1000, None).await;

        assert!(matches!(
            result,
            Err(PlacerError::SizeMismatch {
                expected: 1000,
                actual: 600,
                ..
            })
        ));
        assert!(!dest.exists());
        assert_eq!(fs::metadata(&source).await.unwrap().len(), 1000);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_discards_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.bin");
        let dest = temp.path().join("b.bin");
        fs::write(&source, "aaaa").await.unwrap();
        fs::write(&dest, "bbbb").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let copied = format!("{:x}", Sha256::digest(b"bbbb"));
        let result = placer.verify_copy(&source, &dest, 4, Some(&copied)).await;

        assert!(matches!(result, Err(PlacerError::ChecksumMismatch { .. })));
        assert!(!dest.exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_only_the_source() {
        let temp = TempDir::new().unwrap();
        // A directory cannot be removed with remove_file, even by root.
        let source = temp.path().join("stuck");
        fs::create_dir(&source).await.unwrap();
        let dest = temp.path().join("copy");
        fs::write(&dest, "copy").await.unwrap();

        let result = FsPlacer::release_source(&source, &dest).await;

        assert!(matches!(result, Err(PlacerError::CleanupFailed { .. })));
        assert!(!dest.exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_moved_file_lookups_are_best_effort() {
        let temp = TempDir::new().unwrap();
        let placer = FsPlacer::new(PlacerConfig::default().with_checksum_verification(true));

        let placed = placer
            .moved_file(&temp.path().join("vanished-after-move.txt"), 42)
            .await;

        assert_eq!(placed.size_bytes, 42);
        assert_eq!(placed.checksum, None);
        assert_eq!(placed.method, PlacementMethod::Renamed);
    }

    #[tokio::test]
    async fn test_rename_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("archive.zip");
        let dest = temp.path().join("missing").join("archive.zip");
        fs::write(&source, "zip bytes").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let result = placer.place(&source, &dest).await;

        assert!(matches!(result, Err(PlacerError::MoveFailed { .. })));
        assert!(source.exists());
    }
}
