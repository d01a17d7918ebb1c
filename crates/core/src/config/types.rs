use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::placer::PlacerConfig;
use crate::resolver::{default_categories, CategoryConfig};
use crate::sorter::SorterConfig;
use crate::stability::StabilityConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub sorter: SorterConfig,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub placer: PlacerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Ordered; the first category listing an extension wins.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            sorter: SorterConfig::default(),
            stability: StabilityConfig::default(),
            placer: PlacerConfig::default(),
            logging: LoggingConfig::default(),
            categories: default_categories(),
        }
    }
}

impl Config {
    /// Default configuration watching `root`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let mut config = Self::default();
        config.watch.root = root.as_ref().to_path_buf();
        config
    }
}

/// Monitored folder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Leave dotfiles (often partial downloads) alone.
    #[serde(default = "default_true")]
    pub skip_hidden: bool,
    /// Sort files already in the folder at startup.
    #[serde(default = "default_true")]
    pub sort_existing_on_start: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            skip_hidden: true,
            sort_existing_on_start: true,
        }
    }
}

fn default_root() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

fn default_true() -> bool {
    true
}

/// Log file configuration. Console output is always on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Also write logs to `file`.
    #[serde(default = "default_true")]
    pub to_file: bool,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// Size at which the log file is rolled over.
    #[serde(default = "default_log_max_size")]
    pub max_size_bytes: u64,
    /// Rolled-over files kept next to the live one.
    #[serde(default = "default_log_keep")]
    pub keep: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            to_file: true,
            file: default_log_file(),
            max_size_bytes: default_log_max_size(),
            keep: default_log_keep(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("orionis.log")
}

fn default_log_max_size() -> u64 {
    5 * 1024 * 1024
}

fn default_log_keep() -> usize {
    3
}
