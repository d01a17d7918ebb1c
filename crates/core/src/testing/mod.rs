//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the sorter's side-effect
//! traits, so the pipeline can be exercised without touching real folders
//! or a desktop notification service.
//!
//! # Example
//!
//! ```rust,ignore
//! use orionis_core::testing::{MockPlacer, RecordingNotifier};
//!
//! let placer = Arc::new(MockPlacer::new());
//! let notifier = Arc::new(RecordingNotifier::new());
//!
//! // Wire into FileSorter / StatusListener...
//! ```

mod mock_placer;
mod recording_notifier;

pub use mock_placer::{MockPlacer, RecordedPlacement};
pub use recording_notifier::RecordingNotifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use crate::config::Config;
    use crate::resolver::CategoryConfig;
    use crate::sorter::SorterConfig;

    /// Configuration for `root` with fast polling, suitable for tests.
    pub fn fast_config(root: &Path) -> Config {
        let mut config = Config::with_root(root);
        config.sorter = SorterConfig::default()
            .with_workers(2)
            .with_poll_timeout(Duration::from_millis(20));
        config.sorter.stop_timeout_secs = 5;
        config.stability.poll_interval_ms = 10;
        config
    }

    /// Categories `Images: [.jpg]`, `Documents: [.pdf, .txt]` plus `Others`.
    pub fn small_categories() -> Vec<CategoryConfig> {
        vec![
            CategoryConfig::new("Images", [".jpg"]),
            CategoryConfig::new("Documents", [".pdf", ".txt"]),
            CategoryConfig::new("Others", Vec::<String>::new()),
        ]
    }

    /// Write `size` bytes to `dir/name` and return the path.
    pub fn write_file(dir: &Path, name: &str, size: usize) -> std::io::Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, vec![b'x'; size])?;
        Ok(path)
    }
}
