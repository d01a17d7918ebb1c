//! Detection of files that are still being written.
//!
//! Downloads and external moves can land in the monitored folder before the
//! writer is done. The detector polls the file size and only reports a file as
//! stable once two consecutive reads agree.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunables for the stability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Files smaller than this (in bytes) take the fast path: wait one interval
    /// and only check that the file still exists.
    #[serde(default = "default_small_file_threshold")]
    pub small_file_threshold: u64,

    /// Delay between size polls in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum number of size polls before giving up.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_small_file_threshold() -> u64 {
    1024
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_polls() -> u32 {
    10
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            small_file_threshold: default_small_file_threshold(),
            poll_interval_ms: default_poll_interval(),
            max_polls: default_max_polls(),
        }
    }
}

impl StabilityConfig {
    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the maximum number of polls.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Sets the small-file threshold.
    pub fn with_small_file_threshold(mut self, bytes: u64) -> Self {
        self.small_file_threshold = bytes;
        self
    }

    /// The poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a stability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// The file size settled (or the small-file fast path passed).
    Stable {
        /// Size polls performed; zero for the small-file fast path.
        polls: u32,
    },
    /// The file disappeared while being checked.
    Vanished {
        /// Size polls performed before the file was found missing.
        polls: u32,
    },
    /// The poll budget ran out before the size settled.
    Unstable {
        /// Size polls performed.
        polls: u32,
    },
}

impl Stability {
    /// Whether the file can be moved.
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable { .. })
    }
}

/// Polls file sizes to decide when a write has finished.
#[derive(Debug, Clone, Default)]
pub struct StabilityDetector {
    config: StabilityConfig,
}

impl StabilityDetector {
    /// Creates a detector with the given configuration.
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    /// The detector's configuration.
    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Waits until `path` looks fully written. Returns `false` if the file
    /// vanished or never settled; the caller must then skip it.
    pub async fn wait_until_stable(&self, path: &Path) -> bool {
        self.check(path).await.is_stable()
    }

    /// Like [`wait_until_stable`](Self::wait_until_stable), reporting how the
    /// check ended.
    pub async fn check(&self, path: &Path) -> Stability {
        let interval = self.config.poll_interval();

        let initial = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => return Stability::Vanished { polls: 0 },
        };

        if initial < self.config.small_file_threshold {
            tokio::time::sleep(interval).await;
            return if tokio::fs::try_exists(path).await.unwrap_or(false) {
                Stability::Stable { polls: 0 }
            } else {
                Stability::Vanished { polls: 0 }
            };
        }

        let mut previous: Option<u64> = None;
        for poll in 1..=self.config.max_polls {
            let size = match tokio::fs::metadata(path).await {
                Ok(meta) => meta.len(),
                Err(_) => {
                    debug!("File vanished during stability poll {}: {}", poll, path.display());
                    return Stability::Vanished { polls: poll };
                }
            };

            if previous == Some(size) && size > 0 {
                debug!(
                    "File stable after {} polls ({} bytes): {}",
                    poll,
                    size,
                    path.display()
                );
                return Stability::Stable { polls: poll };
            }
            previous = Some(size);

            if poll < self.config.max_polls {
                tokio::time::sleep(interval).await;
            }
        }

        Stability::Unstable {
            polls: self.config.max_polls,
        }
    }
}
