//! Destination resolution: which category a file belongs to, and which free
//! name it gets inside that category's folder.

mod category;
mod destination;

pub use category::{default_categories, extension_of, CategoryConfig, CategoryMap, OTHERS};
pub use destination::{unique_destination, InvalidName};
