//! Status channel from the sorter workers to the notification layer.

mod handle;
mod listener;
mod message;

pub use handle::*;
pub use listener::*;
pub use message::*;
