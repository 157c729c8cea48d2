//! Data models for referenced directories and images.
//!
//! - [`DirectoryRecord`] - A filesystem directory the user asked to index
//! - [`ImageRecord`] - One image file inside a referenced directory
//!
//! Both are persisted by [`crate::storage::RecordStore`] through the binary codec in
//! [`crate::storage::codec`]; serde is only used for the CLI's JSON output.

pub mod directory;
pub mod image;

pub use directory::DirectoryRecord;
pub use image::{IMAGE_EXTENSIONS, ImageRecord};
