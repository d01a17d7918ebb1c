//! Configuration for the sorter module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorterConfig {
    /// Number of concurrent sort workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How long an idle worker waits on the queue before re-checking the
    /// stop signal.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,

    /// How long `stop()` waits for each worker to finish.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Capacity of the status channel.
    #[serde(default = "default_status_buffer")]
    pub status_buffer: usize,
}

fn default_workers() -> usize {
    4
}

fn default_poll_timeout() -> u64 {
    1000 // 1 second
}

fn default_stop_timeout() -> u64 {
    10
}

fn default_status_buffer() -> usize {
    256
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_timeout_ms: default_poll_timeout(),
            stop_timeout_secs: default_stop_timeout(),
            status_buffer: default_status_buffer(),
        }
    }
}

impl SorterConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}
