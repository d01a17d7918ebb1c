//! The per-file sorting pipeline and the worker loop that drives it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::error::SortError;
use super::queue::WorkQueue;
use super::types::{PoolStats, SortOutcome, SortedFile};
use crate::guard;
use crate::placer::{PlacedFile, Placer, PlacerError};
use crate::resolver::{unique_destination, CategoryMap};
use crate::shutdown::StopSignal;
use crate::stability::{Stability, StabilityDetector};
use crate::status::{StatusHandle, StatusMessage};

/// Fresh destination names tried before a collision is reported as a failure.
const MAX_PLACEMENT_ATTEMPTS: usize = 5;

/// Everything the workers of one pool share.
pub(crate) struct SortContext {
    /// Canonical monitored root.
    pub(crate) root: PathBuf,
    pub(crate) categories: CategoryMap,
    pub(crate) detector: StabilityDetector,
    pub(crate) placer: Arc<dyn Placer>,
    pub(crate) status: StatusHandle,
    pub(crate) queue: WorkQueue,
    pub(crate) stop: StopSignal,
    pub(crate) poll_timeout: Duration,
    pub(crate) skip_hidden: bool,
    pub(crate) stats: PoolStats,
}

/// Sorts one file at a time.
///
/// Workers created by the same [`FileSorter`](super::FileSorter) share the
/// queue, the stop signal, and the counters.
#[derive(Clone)]
pub struct SortWorker {
    id: usize,
    ctx: Arc<SortContext>,
}

impl SortWorker {
    pub(crate) fn new(id: usize, ctx: Arc<SortContext>) -> Self {
        Self { id, ctx }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Pull paths off the queue until the stop signal is raised.
    ///
    /// A path already being processed is finished before the loop exits; no
    /// new path is taken once the signal is up.
    pub async fn run(self) {
        debug!("Sort worker {} started", self.id);

        loop {
            if self.ctx.stop.is_triggered() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = self.ctx.stop.triggered() => break,
                next = self.ctx.queue.pop(self.ctx.poll_timeout) => next,
            };

            if let Some(path) = next {
                self.process(&path).await;
            }
        }

        debug!("Sort worker {} stopped", self.id);
    }

    /// Run the full pipeline for one path: validate, wait for the write to
    /// finish, classify, pick a destination, move, and report.
    ///
    /// Never panics and never returns early with an error; every failure is
    /// folded into the outcome.
    pub async fn process(&self, path: &Path) -> SortOutcome {
        self.ctx.stats.record_received();
        let name = display_name(path);

        let outcome = match AssertUnwindSafe(self.sort(path)).catch_unwind().await {
            Ok(Ok(sorted)) => {
                info!(
                    "Moved {} to {}",
                    name,
                    sorted.destination().display()
                );
                self.ctx
                    .status
                    .publish(StatusMessage::sorted(&name, &sorted.category));
                SortOutcome::Moved(sorted)
            }
            Ok(Err(e)) => {
                let outcome = SortOutcome::from_error(e);
                match &outcome {
                    SortOutcome::Rejected(e) => error!("Rejected {}: {}", path.display(), e),
                    SortOutcome::Skipped(e) => warn!("Skipped {}: {}", name, e),
                    SortOutcome::Failed(e) => {
                        error!("Failed to sort {}: {}", name, e);
                        self.ctx.status.publish(StatusMessage::move_error(&name));
                    }
                    SortOutcome::Moved(_) => {}
                }
                outcome
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Unexpected error while sorting {}: {}", name, message);
                self.ctx.status.publish(StatusMessage::unexpected(&name));
                SortOutcome::Failed(SortError::Unexpected {
                    path: path.to_path_buf(),
                    message,
                })
            }
        };

        self.ctx.stats.record(&outcome);
        outcome
    }

    async fn sort(&self, path: &Path) -> Result<SortedFile, SortError> {
        let root = &self.ctx.root;

        let source = guard::ensure_within(root, path)?;
        debug!("[{}] validated {}", self.id, source.display());

        let meta = match tokio::fs::metadata(&source).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SortError::Vanished { path: source });
            }
            Err(e) => return Err(SortError::Io { path: source, source: e }),
        };
        if !meta.is_file() {
            return Err(SortError::NotAFile { path: source });
        }
        if source.parent() != Some(root.as_path()) {
            return Err(SortError::Ignored {
                path: source,
                reason: "not directly inside the monitored folder",
            });
        }

        let filename = match source.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return Err(SortError::InvalidName(crate::resolver::InvalidName {
                    name: source.to_string_lossy().into_owned(),
                }))
            }
        };
        if self.ctx.skip_hidden && filename.starts_with('.') {
            return Err(SortError::Ignored {
                path: source,
                reason: "hidden file",
            });
        }

        match self.ctx.detector.check(&source).await {
            Stability::Stable { polls } => {
                debug!("[{}] {} stable after {} polls", self.id, filename, polls)
            }
            Stability::Vanished { .. } => return Err(SortError::Vanished { path: source }),
            Stability::Unstable { .. } => return Err(SortError::Unstable { path: source }),
        }

        let category = self.ctx.categories.classify_path(&source).to_string();
        debug!("[{}] {} classified as {}", self.id, filename, category);

        let folder = guard::safe_join(root, [&category])?;
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| SortError::Io {
                path: folder.clone(),
                source: e,
            })?;

        let placed = self.place_unique(&source, &folder, &filename).await?;

        Ok(SortedFile {
            source,
            category,
            placed,
        })
    }

    /// Place `source` under a free name in `folder`.
    ///
    /// Another worker can claim the chosen name before the move lands; the
    /// placer then refuses and a fresh name is picked.
    async fn place_unique(
        &self,
        source: &Path,
        folder: &Path,
        filename: &str,
    ) -> Result<PlacedFile, SortError> {
        let mut attempt = 1;
        loop {
            let destination = unique_destination(folder, filename)?;
            let destination = guard::ensure_within(&self.ctx.root, &destination)?;
            debug!("[{}] destination {}", self.id, destination.display());

            match self.ctx.placer.place(source, &destination).await {
                Ok(placed) => return Ok(placed),
                Err(PlacerError::DestinationExists { path }) if attempt < MAX_PLACEMENT_ATTEMPTS => {
                    debug!(
                        "[{}] {} was taken concurrently, picking another name",
                        self.id,
                        path.display()
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
