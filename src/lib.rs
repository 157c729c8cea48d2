//! imgseek - Find images in referenced directories by typing part of their file name
//!
//! This library keeps a small on-disk database of referenced directories and the images
//! they contain, and answers incremental filename queries against it. It provides:
//!
//! - A length-prefixed binary record format and an append/rewrite record store
//! - A repository that keeps directories and images consistent across add, remove, rescan
//! - An incremental search engine that narrows its previous matches while the user types
//! - A cancellable background loader for preview bytes of the visible results
//!
//! # Example
//!
//! ```no_run
//! use imgseek::{Repository, SearchEngine, StorePaths};
//! use std::path::Path;
//!
//! let mut repo = Repository::open(&StorePaths::in_dir(Path::new("/tmp/imgseek")))?;
//! repo.add_directory(Path::new("/home/alice/Pictures"))?;
//!
//! let mut engine = SearchEngine::new();
//! engine.search(&repo, "holiday");
//! for image in engine.result_images(&repo) {
//!     println!("{}", image.file_name);
//! }
//! # Ok::<(), imgseek::Error>(())
//! ```

pub mod cli;
pub mod error;
pub mod logging;
pub mod models;
pub mod previews;
pub mod repository;
pub mod search;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::{DirectoryRecord, ImageRecord};
pub use previews::{CancellationToken, PreviewLoader, PreviewRequest};
pub use repository::{Repository, StorePaths};
pub use search::{SearchEngine, SearchOutcome, simplify};
pub use utils::paths::format_path_with_tilde;
