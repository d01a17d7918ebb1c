pub mod config;
pub mod guard;
pub mod placer;
pub mod resolver;
pub mod shutdown;
pub mod sorter;
pub mod stability;
pub mod status;
pub mod testing;
pub mod watcher;

pub use config::{
    config_path, load_config, load_config_from_str, load_config_or_default, validate_config,
    Config, ConfigError, LoggingConfig, WatchConfig,
};
pub use guard::{safe_join, PathTraversal};
pub use placer::{FsPlacer, Placer, PlacerConfig, PlacerError};
pub use resolver::{unique_destination, CategoryConfig, CategoryMap, InvalidName};
pub use shutdown::StopSignal;
pub use sorter::{
    FileSorter, SortError, SortOutcome, SortWorker, SorterConfig, SorterError, SorterStatus,
    WorkQueue,
};
pub use stability::{StabilityConfig, StabilityDetector};
pub use status::{status_channel, Notifier, StatusHandle, StatusListener, StatusMessage};
pub use watcher::{DownloadWatcher, WatchError};
