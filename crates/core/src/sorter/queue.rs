//! Shared work queue feeding the sorter workers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

/// Multi-producer, multi-consumer FIFO of paths waiting to be sorted.
///
/// Every clone shares the same queue. Each pushed path is handed to exactly
/// one `pop` caller.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<PathBuf>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<PathBuf>>>,
    pending: Arc<AtomicUsize>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Append a path. Never blocks.
    pub fn push(&self, path: PathBuf) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        // Both ends live in `self`, so the channel is never closed here.
        if self.tx.send(path).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Take the oldest path, waiting at most `timeout` (including the time
    /// spent waiting for other consumers).
    pub async fn pop(&self, timeout: Duration) -> Option<PathBuf> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut rx = tokio::time::timeout_at(deadline, self.rx.lock()).await.ok()?;
        let path = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .ok()
            .flatten()?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(path)
    }

    /// Number of paths waiting.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = WorkQueue::new();
        queue.push(PathBuf::from("/dl/a"));
        queue.push(PathBuf::from("/dl/b"));

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop(Duration::from_millis(10)).await,
            Some(PathBuf::from("/dl/a"))
        );
        assert_eq!(
            queue.pop(Duration::from_millis(10)).await,
            Some(PathBuf::from("/dl/b"))
        );
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_pop_times_out_when_empty() {
        let queue = WorkQueue::new();
        let start = std::time::Instant::now();

        assert!(queue.pop(Duration::from_millis(50)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = WorkQueue::new();
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(PathBuf::from("/dl/late.txt"));

        assert_eq!(consumer.await.unwrap(), Some(PathBuf::from("/dl/late.txt")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_item_delivered_once() {
        let queue = WorkQueue::new();
        for i in 0..200 {
            queue.push(PathBuf::from(format!("/dl/{i}")));
        }

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            consumers.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(path) = queue.pop(Duration::from_millis(50)).await {
                    got.push(path);
                }
                got
            }));
        }

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 200);
        assert_eq!(unique.len(), 200);
        assert!(queue.is_empty());
    }
}
