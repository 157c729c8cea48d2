//! Binary flat-file persistence
//!
//! Two files make up the database, one per record kind:
//! - `dirs.dat`: framed [`DirectoryRecord`](crate::models::DirectoryRecord) payloads
//! - `imgs.dat`: framed [`ImageRecord`](crate::models::ImageRecord) payloads
//!
//! [`codec`] turns one record into bytes and back; [`record_store`] handles all file
//! I/O for one kind on top of it.

pub mod codec;
pub mod record_store;

pub use codec::{DecodeError, Record, frame};
pub use record_store::{RecordIter, RecordStore};
