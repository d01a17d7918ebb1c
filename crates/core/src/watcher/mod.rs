//! Non-recursive watcher feeding new arrivals into the work queue.
//!
//! Only files that appear directly in the monitored root are forwarded:
//! creations, and renames whose destination is the root. Everything else is
//! dropped here so the sorter never sees it.

mod error;

pub use error::WatchError;

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::sorter::WorkQueue;

/// Watches the monitored root until dropped.
pub struct DownloadWatcher {
    root: PathBuf,
    _watcher: notify::RecommendedWatcher,
}

impl DownloadWatcher {
    /// Start watching `root` and push arriving files into `queue`.
    pub fn start(root: &Path, queue: WorkQueue) -> Result<Self, WatchError> {
        let root = root.canonicalize().map_err(|e| WatchError::PathWatchFailed {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        let event_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for path in arrived_paths(&event, &event_root) {
                        tracing::debug!("New arrival: {}", path.display());
                        queue.push(path);
                    }
                }
                Err(e) => tracing::error!("File system event error: {}", e),
            }
        })?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!("Watching {}", root.display());
        Ok(Self {
            root,
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Paths in `event` that are new files sitting directly in `root`.
pub fn arrived_paths(event: &Event, root: &Path) -> Vec<PathBuf> {
    let candidates: Vec<&PathBuf> = match &event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().collect(),
        // Old path first, new path second.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1).into_iter().collect()
        }
        // Some backends cannot tell the two sides of a rename apart.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().filter(|p| p.exists()).collect()
        }
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|path| path.parent() == Some(root) && !path.is_dir())
        .cloned()
        .collect()
}
