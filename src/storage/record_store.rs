//! Flat-file storage for one record kind
//!
//! A data file is nothing but a concatenation of framed payloads (see
//! [`codec`](super::codec)): no header, no footer, records in ascending ID order.
//! Appends go to the tail; every other mutation rebuilds the file in memory and
//! replaces it through a temp file + rename, so a failed rewrite never leaves a
//! half-written data file behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

use super::codec::{DecodeError, FRAME_HEADER_LEN, Record, write_framed};
use crate::error::{Error, Result};

/// File-backed store holding records of kind `R`
#[derive(Debug, Clone)]
pub struct RecordStore<R> {
    path: PathBuf,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Record> RecordStore<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _kind: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty data file (and its parent directory) unless one already exists.
    ///
    /// Returns `true` when the file was created by this call.
    pub fn create_if_missing(&self) -> Result<bool> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(_) => {
                debug!(path = %self.path.display(), kind = R::KIND, "created empty data file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    /// Start a fresh sequential read of every record in the file.
    ///
    /// The iterator is lazy and stops at the first error; calling `scan` again always
    /// restarts from byte 0.
    pub fn scan(&self) -> Result<RecordIter<R>> {
        let file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(RecordIter {
            reader: BufReader::new(file),
            path: self.path.clone(),
            offset: 0,
            done: false,
            _kind: PhantomData,
        })
    }

    /// Read every record into memory, in file order
    pub fn scan_all(&self) -> Result<Vec<R>> {
        self.scan()?.collect()
    }

    /// Append `records` to the tail of the file in the given order
    pub fn append(&self, records: &[R]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut data = Vec::new();
        for record in records {
            write_framed(&mut data, record);
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;
        file.write_all(&data).map_err(|e| Error::io(&self.path, e))?;
        file.flush().map_err(|e| Error::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            kind = R::KIND,
            count = records.len(),
            bytes = data.len(),
            "appended records"
        );
        Ok(())
    }

    /// Rewrite the file without the records whose ID is in `ids`.
    ///
    /// Both `ids` (sorted here if needed) and the stored records are ascending, so
    /// one merge pass decides what to keep. When the caller already holds the file's
    /// contents it passes them as `known_records` and the file is not re-read.
    ///
    /// Returns how many records were dropped. Nothing is written when that is zero.
    pub fn remove_by_ids(&self, ids: &[i32], known_records: Option<&[R]>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut filter = SortedIdFilter::new(ids);
        let mut kept = Vec::new();
        let mut removed = 0;

        match known_records {
            Some(records) => {
                for record in records {
                    if filter.contains(record.id()) {
                        removed += 1;
                    } else {
                        write_framed(&mut kept, record);
                    }
                }
            }
            None => {
                for record in self.scan()? {
                    let record = record?;
                    if filter.contains(record.id()) {
                        removed += 1;
                    } else {
                        write_framed(&mut kept, &record);
                    }
                }
            }
        }

        if removed > 0 {
            self.replace_contents(&kept)?;
        }
        debug!(path = %self.path.display(), kind = R::KIND, removed, "removed records");
        Ok(removed)
    }

    /// Replace the whole file with `records`.
    ///
    /// This is the only update path: a changed string shifts every following byte, so
    /// patching a record in place is never attempted.
    pub fn update_all(&self, records: &[R]) -> Result<()> {
        let mut data = Vec::new();
        for record in records {
            write_framed(&mut data, record);
        }
        self.replace_contents(&data)?;

        debug!(path = %self.path.display(), kind = R::KIND, count = records.len(), "rewrote data file");
        Ok(())
    }

    fn replace_contents(&self, contents: &[u8]) -> Result<()> {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, contents).map_err(|e| Error::io(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| Error::io(&self.path, e))
    }
}

/// Lazy reader over the frames of a data file
pub struct RecordIter<R> {
    reader: BufReader<File>,
    path: PathBuf,
    offset: u64,
    done: bool,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Record> RecordIter<R> {
    fn read_up_to(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.reader).take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn corrupt(&self, source: DecodeError) -> Error {
        Error::CorruptRecord { path: self.path.clone(), offset: self.offset, source }
    }

    fn next_record(&mut self) -> Result<Option<R>> {
        let at_eof = self.reader.fill_buf().map_err(|e| Error::io(&self.path, e))?.is_empty();
        if at_eof {
            return Ok(None);
        }

        let header = self.read_up_to(FRAME_HEADER_LEN).map_err(|e| Error::io(&self.path, e))?;
        if header.len() < FRAME_HEADER_LEN {
            return Err(self.corrupt(DecodeError::Truncated {
                field: "frame length",
                needed: FRAME_HEADER_LEN,
                available: header.len(),
            }));
        }

        let payload_len = BigEndian::read_u32(&header) as usize;
        let payload = self.read_up_to(payload_len).map_err(|e| Error::io(&self.path, e))?;
        if payload.len() < payload_len {
            return Err(self.corrupt(DecodeError::Truncated {
                field: "frame payload",
                needed: payload_len,
                available: payload.len(),
            }));
        }

        let record = R::decode(&payload).map_err(|e| self.corrupt(e))?;
        self.offset += (FRAME_HEADER_LEN + payload_len) as u64;
        Ok(Some(record))
    }
}

impl<R: Record> Iterator for RecordIter<R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Membership test for a stream of ascending IDs against a sorted ID list.
///
/// The cursor only moves forward, so checking n ascending IDs against k deletions
/// costs O(n + k).
struct SortedIdFilter {
    ids: Vec<i32>,
    cursor: usize,
}

impl SortedIdFilter {
    fn new(ids: &[i32]) -> Self {
        let mut ids = ids.to_vec();
        if !ids.is_sorted() {
            ids.sort_unstable();
        }
        Self { ids, cursor: 0 }
    }

    fn contains(&mut self, id: i32) -> bool {
        while self.cursor < self.ids.len() && self.ids[self.cursor] < id {
            self.cursor += 1;
        }
        self.ids.get(self.cursor) == Some(&id)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::{DirectoryRecord, ImageRecord};

    fn image(id: i32, dir_id: i32, file_name: &str) -> ImageRecord {
        let mut img = ImageRecord::new(dir_id, file_name);
        img.id = id;
        img
    }

    fn image_store(temp: &TempDir) -> RecordStore<ImageRecord> {
        let store: RecordStore<ImageRecord> = RecordStore::new(temp.path().join("imgs.dat"));
        store.create_if_missing().expect("Failed to create store");
        store
    }

    fn ids(records: &[ImageRecord]) -> Vec<i32> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_create_if_missing_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store: RecordStore<DirectoryRecord> = RecordStore::new(temp.path().join("dirs.dat"));

        assert!(store.create_if_missing().unwrap());
        store.append(&[DirectoryRecord::new(0, "/a")]).unwrap();
        assert!(!store.create_if_missing().unwrap());

        // Existing content must survive the second call
        assert_eq!(store.scan_all().unwrap().len(), 1);
    }

    #[test]
    fn test_create_if_missing_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let store: RecordStore<DirectoryRecord> =
            RecordStore::new(temp.path().join("nested").join("deeper").join("dirs.dat"));

        assert!(store.create_if_missing().unwrap());
        assert!(store.path().exists());
    }

    #[test]
    fn test_scan_empty_file() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        assert!(store.scan_all().unwrap().is_empty());
    }

    #[test]
    fn test_scan_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let store: RecordStore<ImageRecord> = RecordStore::new(temp.path().join("absent.dat"));
        let err = store.scan().err().expect("scan of a missing file must fail");
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_append_preserves_order_and_existing_content() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);

        store.append(&[image(0, 0, "a.png"), image(1, 0, "b.png")]).unwrap();
        store.append(&[image(2, 1, "c.png")]).unwrap();

        let records = store.scan_all().unwrap();
        assert_eq!(ids(&records), vec![0, 1, 2]);
        assert_eq!(records[2].file_name, "c.png");
    }

    #[test]
    fn test_append_nothing_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        store.append(&[]).unwrap();
        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_scan_is_restartable() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        store.append(&[image(0, 0, "a.png"), image(1, 0, "b.png")]).unwrap();

        let mut first = store.scan().unwrap();
        assert_eq!(first.next().unwrap().unwrap().id, 0);

        let second: Vec<_> = store.scan().unwrap().map(|r| r.unwrap().id).collect();
        assert_eq!(second, vec![0, 1]);
    }

    #[test]
    fn test_scan_reports_truncated_payload_with_offset() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        store.append(&[image(0, 0, "a.png"), image(1, 0, "b.png")]).unwrap();

        let bytes = fs::read(store.path()).unwrap();
        let first_frame_len = (FRAME_HEADER_LEN + image(0, 0, "a.png").encode().len()) as u64;
        fs::write(store.path(), &bytes[..bytes.len() - 3]).unwrap();

        let results: Vec<_> = store.scan().unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(Error::CorruptRecord { offset, source, .. }) => {
                assert_eq!(*offset, first_frame_len);
                assert!(matches!(source, DecodeError::Truncated { field: "frame payload", .. }));
            }
            other => panic!("expected corrupt record, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_reports_truncated_frame_header() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        fs::write(store.path(), [0u8, 0]).unwrap();

        let err = store.scan_all().unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptRecord {
                offset: 0,
                source: DecodeError::Truncated { field: "frame length", needed: 4, available: 2 },
                ..
            }
        ));
    }

    #[test]
    fn test_scan_reports_malformed_payload() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        // A 3-byte payload cannot even hold an id
        fs::write(store.path(), [0u8, 0, 0, 3, 1, 2, 3]).unwrap();

        let err = store.scan_all().unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { offset: 0, .. }));
    }

    #[test]
    fn test_remove_by_ids_compacts_file() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        let records: Vec<_> = (0..6).map(|i| image(i, i % 2, &format!("img{}.png", i))).collect();
        store.append(&records).unwrap();

        let removed = store.remove_by_ids(&[1, 3, 4], None).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(ids(&store.scan_all().unwrap()), vec![0, 2, 5]);
    }

    #[test]
    fn test_remove_by_ids_accepts_unsorted_ids() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        let records: Vec<_> = (0..5).map(|i| image(i, 0, &format!("img{}.png", i))).collect();
        store.append(&records).unwrap();

        store.remove_by_ids(&[4, 0, 2], None).unwrap();
        assert_eq!(ids(&store.scan_all().unwrap()), vec![1, 3]);
    }

    #[test]
    fn test_remove_by_ids_with_known_records_matches_rescan() {
        let temp = TempDir::new().unwrap();
        let scanned = RecordStore::<ImageRecord>::new(temp.path().join("scanned.dat"));
        let known = RecordStore::<ImageRecord>::new(temp.path().join("known.dat"));
        let records: Vec<_> = (0..8).map(|i| image(i * 2, 0, &format!("img{}.png", i))).collect();
        scanned.append(&records).unwrap();
        known.append(&records).unwrap();

        let to_remove = [2, 3, 8, 14, 100];
        assert_eq!(scanned.remove_by_ids(&to_remove, None).unwrap(), 3);
        assert_eq!(known.remove_by_ids(&to_remove, Some(records.as_slice())).unwrap(), 3);

        assert_eq!(fs::read(scanned.path()).unwrap(), fs::read(known.path()).unwrap());
    }

    #[test]
    fn test_remove_by_ids_unknown_ids_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = image_store(&temp);
        store.append(&[image(0, 0, "a.png")]).unwrap();

        assert_eq!(store.remove_by_ids(&[7], None).unwrap(), 0);
        assert_eq!(store.remove_by_ids(&[], None).unwrap(), 0);
        assert_eq!(ids(&store.scan_all().unwrap()), vec![0]);
    }

    #[test]
    fn test_update_all_handles_length_changes() {
        let temp = TempDir::new().unwrap();
        let store: RecordStore<DirectoryRecord> = RecordStore::new(temp.path().join("dirs.dat"));
        store.create_if_missing().unwrap();
        store.append(&[DirectoryRecord::new(0, "/a"), DirectoryRecord::new(1, "/b")]).unwrap();

        let updated = vec![
            DirectoryRecord { id: 0, full_path: "/a/much/longer/path".to_string(), image_count: 9 },
            DirectoryRecord { id: 1, full_path: "/b".to_string(), image_count: 1 },
        ];
        store.update_all(&updated).unwrap();

        assert_eq!(store.scan_all().unwrap(), updated);
        assert!(!temp.path().join("dirs.dat.tmp").exists());
    }

    #[test]
    fn test_sorted_id_filter() {
        let mut filter = SortedIdFilter::new(&[5, 1, 3]);
        let hits: Vec<i32> = (0..7).filter(|id| filter.contains(*id)).collect();
        assert_eq!(hits, vec![1, 3, 5]);
    }
}
