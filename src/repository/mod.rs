//! Referenced directories and images, kept in memory and on disk together
//!
//! [`Repository`] owns both collections and the two [`RecordStore`](crate::storage::RecordStore)s
//! behind them, and implements the directory → image lifecycle (add, remove, rescan) plus
//! usage counting. [`discover_images`] lists the image files of one directory.

pub mod accessor;
pub mod image_discovery;

pub use accessor::{DIRECTORIES_FILENAME, IMAGES_FILENAME, Repository, StorePaths};
pub use image_discovery::discover_images;
