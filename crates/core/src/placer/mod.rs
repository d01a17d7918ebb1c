//! Placer module for moving files into their category folders.
//!
//! This module provides the `Placer` trait and a file system implementation
//! that never loses data: a failed placement leaves the source where it was.
//!
//! # Features
//!
//! - Link-then-unlink move when source and destination share a filesystem;
//!   unlike `rename`, it fails instead of replacing an existing file
//! - Copy, size verification, then source deletion across filesystems
//! - Optional SHA-256 comparison before the source is deleted
//! - Direct move fallback when the copy itself fails
//! - Never overwrites an existing destination
//!
//! # Example
//!
//! ```ignore
//! use orionis_core::placer::{FsPlacer, Placer};
//!
//! let placer = FsPlacer::with_defaults();
//! let placed = placer
//!     .place(Path::new("/dl/photo.jpg"), Path::new("/dl/Images/photo.jpg"))
//!     .await?;
//! println!("Placed {} bytes via {:?}", placed.size_bytes, placed.method);
//! ```

mod config;
mod error;
mod fs_placer;
mod traits;
mod types;

pub use config::PlacerConfig;
pub use error::PlacerError;
pub use fs_placer::FsPlacer;
pub use traits::Placer;
pub use types::{PlacedFile, PlacementMethod};
