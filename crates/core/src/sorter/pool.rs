//! Fixed-size pool of sort workers sharing one queue.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SorterConfig;
use super::error::SorterError;
use super::queue::WorkQueue;
use super::types::{PoolStats, SorterStatus};
use super::worker::{SortContext, SortWorker};
use crate::config::Config;
use crate::guard;
use crate::placer::Placer;
use crate::resolver::CategoryMap;
use crate::shutdown::StopSignal;
use crate::stability::StabilityDetector;
use crate::status::StatusHandle;

/// Owns the work queue and the worker tasks draining it.
pub struct FileSorter {
    ctx: Arc<SortContext>,
    config: SorterConfig,
    running: AtomicBool,
    next_worker_id: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl FileSorter {
    /// Create a sorter for `config.watch.root`.
    ///
    /// The root must exist and be a directory. Workers are not started until
    /// [`start`](Self::start) is called; paths enqueued before that wait.
    pub fn new(
        config: &Config,
        placer: Arc<dyn Placer>,
        status: StatusHandle,
        stop: StopSignal,
    ) -> Result<Self, SorterError> {
        let root = config
            .watch
            .root
            .canonicalize()
            .map_err(|e| SorterError::RootUnavailable {
                path: config.watch.root.clone(),
                source: e,
            })?;
        if !root.is_dir() {
            return Err(SorterError::RootNotADirectory { path: root });
        }

        let ctx = SortContext {
            root,
            categories: CategoryMap::from_config(&config.categories),
            detector: StabilityDetector::new(config.stability.clone()),
            placer,
            status,
            queue: WorkQueue::new(),
            stop,
            poll_timeout: config.sorter.poll_timeout(),
            skip_hidden: config.watch.skip_hidden,
            stats: PoolStats::default(),
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            config: config.sorter.clone(),
            running: AtomicBool::new(false),
            next_worker_id: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// The canonical monitored root.
    pub fn root(&self) -> &Path {
        &self.ctx.root
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.ctx.categories
    }

    /// Create the category folders and spawn the workers.
    ///
    /// Calling this while running, or after [`stop`](Self::stop), only logs.
    pub async fn start(&self) {
        if self.ctx.stop.is_triggered() {
            warn!("File sorter was stopped and cannot be restarted");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("File sorter already running");
            return;
        }

        self.create_category_folders().await;

        let mut handles = self.handles.lock().await;
        for _ in 0..self.config.workers {
            let worker = self.worker();
            handles.push(tokio::spawn(worker.run()));
        }

        info!(
            "Started {} sort workers on {}",
            self.config.workers,
            self.ctx.root.display()
        );
    }

    /// Raise the stop signal and wait for every worker to finish its
    /// current file, up to `sorter.stop_timeout_secs` in total.
    pub async fn stop(&self) {
        self.ctx.stop.trigger();

        let mut handles = std::mem::take(&mut *self.handles.lock().await);
        let timeout = self.config.stop_timeout();

        match tokio::time::timeout(timeout, join_all(handles.iter_mut())).await {
            Ok(results) => {
                for (i, result) in results.into_iter().enumerate() {
                    if let Err(e) = result {
                        error!("Sort worker {} ended abnormally: {}", i, e);
                    }
                }
            }
            Err(_) => {
                let late = handles.iter().filter(|h| !h.is_finished()).count();
                warn!(
                    "{} sort workers did not stop within {:?}, abandoning them",
                    late, timeout
                );
            }
        }

        if self.running.swap(false, Ordering::SeqCst) {
            info!("File sorter stopped");
        }
    }

    /// Queue every regular file currently sitting in the root.
    ///
    /// Directories (including the category folders) are left alone. Returns
    /// the number of files queued.
    pub async fn sort_existing_files(&self) -> Result<usize, SorterError> {
        let root = &self.ctx.root;
        let scan_error = |e: std::io::Error| SorterError::Scan {
            path: root.clone(),
            source: e,
        };

        let mut entries = tokio::fs::read_dir(root).await.map_err(scan_error)?;
        let mut count = 0;

        while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
            let path = entry.path();
            let resolved = match guard::ensure_within(root, &path) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Not queueing {}: {}", path.display(), e);
                    continue;
                }
            };
            match tokio::fs::metadata(&resolved).await {
                Ok(meta) if meta.is_file() => {
                    self.enqueue(path);
                    count += 1;
                }
                Ok(_) => {}
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        info!("Queued {} existing files for sorting", count);
        Ok(count)
    }

    /// Queue a single path.
    pub fn enqueue(&self, path: PathBuf) {
        debug!("Queued {}", path.display());
        self.ctx.queue.push(path);
    }

    /// Producer handle for the watcher.
    pub fn queue(&self) -> WorkQueue {
        self.ctx.queue.clone()
    }

    /// A worker sharing this pool's queue, configuration, and counters.
    pub fn worker(&self) -> SortWorker {
        let id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);
        SortWorker::new(id, Arc::clone(&self.ctx))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SorterStatus {
        self.ctx.stats.to_status(
            self.is_running(),
            self.config.workers,
            self.ctx.queue.len(),
        )
    }

    async fn create_category_folders(&self) {
        for name in self.ctx.categories.names() {
            match guard::safe_join(&self.ctx.root, [name]) {
                Ok(folder) => {
                    if let Err(e) = tokio::fs::create_dir_all(&folder).await {
                        warn!("Failed to create category folder {}: {}", folder.display(), e);
                    }
                }
                Err(e) => error!("Invalid category name {:?}: {}", name, e),
            }
        }
    }
}
