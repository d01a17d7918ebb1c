//! Sorter module: the concurrent file-processing pipeline.
//!
//! A [`FileSorter`] owns one [`WorkQueue`] and a fixed pool of
//! [`SortWorker`] tasks. Producers (the watcher, the startup sweep) push
//! paths; each path is taken by exactly one worker, which validates it, waits
//! for the write to finish, classifies it, and moves it into its category
//! folder.
//!
//! # Example
//!
//! ```ignore
//! use orionis_core::sorter::FileSorter;
//!
//! let sorter = FileSorter::new(&config, placer, status, stop.clone())?;
//! sorter.start().await;
//! sorter.sort_existing_files().await?;
//!
//! // ... later
//! sorter.stop().await;
//! println!("{:?}", sorter.status());
//! ```

mod config;
mod error;
mod pool;
mod queue;
mod types;
mod worker;

pub use config::SorterConfig;
pub use error::{Disposition, SortError, SorterError};
pub use pool::FileSorter;
pub use queue::WorkQueue;
pub use types::{SortOutcome, SortedFile, SorterStatus};
pub use worker::SortWorker;
