//! Binary encoding of directory and image records
//!
//! # Format
//!
//! All integers are 4-byte big-endian. Strings are UTF-8, each preceded by its byte
//! length. A payload never carries its own size; [`frame`] adds the length prefix
//! the record store needs to find record boundaries.
//!
//! ```text
//! Directory payload:
//! ┌─────────┬──────────────┬──────────────┬──────────────────┐
//! │ id (4)  │ image_count  │ path_len (4) │ path (path_len)  │
//! └─────────┴──────────────┴──────────────┴──────────────────┘
//!
//! Image payload:
//! ┌────────┬────────────┬───────────┬─────────────┬─────────────┬────────────┬───────────┐
//! │ id (4) │ dir_id (4) │ usage (4) │ simp_len(4) │ file_len(4) │ simplified │ file_name │
//! └────────┴────────────┴───────────┴─────────────┴─────────────┴────────────┴───────────┘
//!
//! Frame:
//! ┌──────────────────┬──────────────────────┐
//! │ payload_len (4)  │ payload              │
//! └──────────────────┴──────────────────────┘
//! ```

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use thiserror::Error;

use crate::models::{DirectoryRecord, ImageRecord};

/// Size of the frame length prefix
pub const FRAME_HEADER_LEN: usize = 4;

const DIRECTORY_HEADER_LEN: usize = 12;
const IMAGE_HEADER_LEN: usize = 20;

/// Why a payload could not be turned back into a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated: {field} needs {needed} bytes but only {available} remain")]
    Truncated { field: &'static str, needed: usize, available: usize },

    #[error("negative length {length} for {field}")]
    NegativeLength { field: &'static str, length: i32 },

    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("{count} unexpected trailing bytes")]
    TrailingBytes { count: usize },
}

/// A record kind the store knows how to persist.
///
/// Each concrete type supplies its own encoder and decoder, so the kind-to-decoder
/// mapping is fixed at compile time.
pub trait Record: Sized {
    /// Short name used in log messages
    const KIND: &'static str;

    fn id(&self) -> i32;

    fn encode(&self) -> Vec<u8>;

    fn decode(payload: &[u8]) -> Result<Self, DecodeError>;
}

impl Record for DirectoryRecord {
    const KIND: &'static str = "directory";

    fn id(&self) -> i32 {
        self.id
    }

    fn encode(&self) -> Vec<u8> {
        let path = self.full_path.as_bytes();
        let mut data = vec![0u8; DIRECTORY_HEADER_LEN + path.len()];
        BigEndian::write_i32(&mut data[0..4], self.id);
        BigEndian::write_i32(&mut data[4..8], self.image_count);
        BigEndian::write_i32(&mut data[8..12], path.len() as i32);
        data[DIRECTORY_HEADER_LEN..].copy_from_slice(path);
        data
    }

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = FieldReader::new(payload);
        let id = reader.read_i32("id")?;
        let image_count = reader.read_i32("image_count")?;
        let path_len = reader.read_len("path length")?;
        let full_path = reader.read_str("path", path_len)?;
        reader.finish()?;

        Ok(Self { id, full_path, image_count })
    }
}

impl Record for ImageRecord {
    const KIND: &'static str = "image";

    fn id(&self) -> i32 {
        self.id
    }

    fn encode(&self) -> Vec<u8> {
        let simplified = self.simplified_name.as_bytes();
        let file_name = self.file_name.as_bytes();
        let strings_start = IMAGE_HEADER_LEN;
        let file_name_start = strings_start + simplified.len();

        let mut data = vec![0u8; file_name_start + file_name.len()];
        BigEndian::write_i32(&mut data[0..4], self.id);
        BigEndian::write_i32(&mut data[4..8], self.dir_id);
        BigEndian::write_i32(&mut data[8..12], self.usage);
        BigEndian::write_i32(&mut data[12..16], simplified.len() as i32);
        BigEndian::write_i32(&mut data[16..20], file_name.len() as i32);
        data[strings_start..file_name_start].copy_from_slice(simplified);
        data[file_name_start..].copy_from_slice(file_name);
        data
    }

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = FieldReader::new(payload);
        let id = reader.read_i32("id")?;
        let dir_id = reader.read_i32("dir_id")?;
        let usage = reader.read_i32("usage")?;
        let simplified_len = reader.read_len("simplified name length")?;
        let file_name_len = reader.read_len("file name length")?;
        let simplified_name = reader.read_str("simplified name", simplified_len)?;
        let file_name = reader.read_str("file name", file_name_len)?;
        reader.finish()?;

        Ok(Self { id, dir_id, usage, simplified_name, file_name })
    }
}

/// Wrap a payload with its big-endian length prefix
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = vec![0u8; FRAME_HEADER_LEN + payload.len()];
    BigEndian::write_u32(&mut framed[..FRAME_HEADER_LEN], payload.len() as u32);
    framed[FRAME_HEADER_LEN..].copy_from_slice(payload);
    framed
}

/// Encode and frame `record`, appending the bytes to `buf`
pub fn write_framed<R: Record>(buf: &mut Vec<u8>, record: &R) {
    let payload = record.encode();
    buf.extend_from_slice(&frame(&payload));
}

/// Cursor over a payload that checks every declared length against what remains
struct FieldReader<'a> {
    remaining: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { remaining: payload }
    }

    fn read_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        let available = self.remaining.len();
        self.remaining.read_i32::<BigEndian>().map_err(|_| DecodeError::Truncated {
            field,
            needed: 4,
            available,
        })
    }

    fn read_len(&mut self, field: &'static str) -> Result<usize, DecodeError> {
        let length = self.read_i32(field)?;
        usize::try_from(length).map_err(|_| DecodeError::NegativeLength { field, length })
    }

    fn read_str(&mut self, field: &'static str, len: usize) -> Result<String, DecodeError> {
        if len > self.remaining.len() {
            return Err(DecodeError::Truncated {
                field,
                needed: len,
                available: self.remaining.len(),
            });
        }
        let (bytes, rest) = self.remaining.split_at(len);
        self.remaining = rest;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    fn finish(self) -> Result<(), DecodeError> {
        if self.remaining.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes { count: self.remaining.len() })
        }
    }
}
