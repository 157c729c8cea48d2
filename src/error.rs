//! Error types for the record store and repository
//!
//! Library code returns [`Error`]; the CLI wraps it in `anyhow` with extra context.
//! Lookups of unknown IDs and duplicate directory references are not errors and are
//! reported through `Option` instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::storage::codec::DecodeError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A data file could not be created, read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A frame or field length does not fit the bytes that are actually there
    #[error("corrupt record in {} at byte {offset}: {source}", path.display())]
    CorruptRecord {
        path: PathBuf,
        offset: u64,
        #[source]
        source: DecodeError,
    },

    /// A directory path cannot be stored because it is not valid UTF-8
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    /// A path given as an image directory names something else
    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// A referenced image directory could not be listed
    #[error("failed to scan directory {}: {source}", path.display())]
    DirectoryScan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
