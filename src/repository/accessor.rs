//! In-memory mirror of the two data files
//!
//! # Consistency model
//!
//! Every mutating call updates the data files and the in-memory collections in the
//! same call, and both collections stay sorted by ascending ID so lookups are binary
//! searches. Nothing is atomic across the two files:
//!
//! - **Adding** writes the directory record first, then its image batch. A crash in
//!   between leaves a directory that owns no images; a rescan repairs it.
//! - **Removing** drops the image batch first, then the directory record. A crash in
//!   between leaves a directory without images, never images without a directory.
//!
//! Directory listings are read before anything is written, so a directory that
//! cannot be scanned never changes either file.

use std::path::{Path, PathBuf};
use std::slice;

use tracing::{debug, info};

use super::image_discovery::discover_images;
use crate::error::{Error, Result};
use crate::models::{DirectoryRecord, ImageRecord};
use crate::storage::RecordStore;

/// File name of the directory records inside a data directory
pub const DIRECTORIES_FILENAME: &str = "dirs.dat";
/// File name of the image records inside a data directory
pub const IMAGES_FILENAME: &str = "imgs.dat";

/// Locations of the two data files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub directories: PathBuf,
    pub images: PathBuf,
}

impl StorePaths {
    /// Standard file names inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self { directories: data_dir.join(DIRECTORIES_FILENAME), images: data_dir.join(IMAGES_FILENAME) }
    }
}

/// Referenced directories and images, backed by one record store each
#[derive(Debug)]
pub struct Repository {
    directory_store: RecordStore<DirectoryRecord>,
    image_store: RecordStore<ImageRecord>,
    directories: Vec<DirectoryRecord>,
    images: Vec<ImageRecord>,
    next_directory_id: i32,
    next_image_id: i32,
}

impl Repository {
    /// Open (creating if needed) both data files and load them into memory
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be created or read, or if either holds
    /// a corrupt record.
    pub fn open(paths: &StorePaths) -> Result<Self> {
        let directory_store: RecordStore<DirectoryRecord> = RecordStore::new(&paths.directories);
        let image_store: RecordStore<ImageRecord> = RecordStore::new(&paths.images);
        directory_store.create_if_missing()?;
        image_store.create_if_missing()?;

        let mut directories = directory_store.scan_all()?;
        let mut images = image_store.scan_all()?;
        directories.sort_by_key(|d| d.id);
        images.sort_by_key(|i| i.id);

        let next_directory_id = directories.last().map_or(0, |d| d.id + 1);
        let next_image_id = images.last().map_or(0, |i| i.id + 1);

        info!(
            directories = directories.len(),
            images = images.len(),
            "loaded image database"
        );

        Ok(Self { directory_store, image_store, directories, images, next_directory_id, next_image_id })
    }

    /// All referenced directories, ascending by ID
    pub fn directories(&self) -> &[DirectoryRecord] {
        &self.directories
    }

    /// All referenced images, ascending by ID
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn images_in_directory(&self, dir_id: i32) -> impl Iterator<Item = &ImageRecord> {
        self.images.iter().filter(move |img| img.dir_id == dir_id)
    }

    pub fn lookup_directory(&self, id: i32) -> Option<&DirectoryRecord> {
        self.directory_index(id).map(|index| &self.directories[index])
    }

    pub fn lookup_image(&self, id: i32) -> Option<&ImageRecord> {
        self.image_index(id).map(|index| &self.images[index])
    }

    /// Absolute path of an image, or `None` if its directory is no longer referenced
    pub fn image_full_path(&self, image: &ImageRecord) -> Option<PathBuf> {
        self.lookup_directory(image.dir_id).map(|dir| dir.path().join(&image.file_name))
    }

    /// Reference a new directory and index the images it contains.
    ///
    /// Returns `Ok(None)` without touching anything when a directory with the same
    /// path is already referenced.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not valid UTF-8, is not a directory, cannot be
    /// listed, or a data file cannot be written.
    pub fn add_directory(&mut self, path: &Path) -> Result<Option<DirectoryRecord>> {
        let Some(full_path) = path.to_str().map(str::to_owned) else {
            return Err(Error::NonUtf8Path { path: path.to_path_buf() });
        };
        if self.directories.iter().any(|dir| dir.full_path == full_path) {
            debug!(path = %full_path, "directory already referenced");
            return Ok(None);
        }

        let dir_id = self.next_directory_id;
        let images = discover_images(path, dir_id)?;

        let mut dir = DirectoryRecord::new(dir_id, full_path);
        dir.image_count = images.len() as i32;

        self.directory_store.append(slice::from_ref(&dir))?;
        self.next_directory_id = dir_id + 1;
        self.directories.push(dir.clone());

        self.append_images(images)?;

        info!(id = dir.id, path = %dir.full_path, images = dir.image_count, "added directory");
        Ok(Some(dir))
    }

    /// Stop referencing a directory, removing its images first.
    ///
    /// Returns the removed record, or `Ok(None)` for an unknown ID.
    pub fn remove_directory(&mut self, id: i32) -> Result<Option<DirectoryRecord>> {
        let Some(index) = self.directory_index(id) else {
            return Ok(None);
        };

        let removed_images = self.remove_images_of(id)?;

        self.directory_store.remove_by_ids(&[id], Some(self.directories.as_slice()))?;
        let dir = self.directories.remove(index);

        info!(id, path = %dir.full_path, images = removed_images, "removed directory");
        Ok(Some(dir))
    }

    /// Replace a directory's images with a fresh scan of its contents.
    ///
    /// The new batch gets new IDs; usage counts of the old batch are discarded.
    /// Returns the updated directory record, or `Ok(None)` for an unknown ID.
    pub fn rescan_directory(&mut self, id: i32) -> Result<Option<DirectoryRecord>> {
        let Some(index) = self.directory_index(id) else {
            return Ok(None);
        };
        let path = self.directories[index].path();

        let images = discover_images(&path, id)?;
        let image_count = images.len() as i32;

        self.remove_images_of(id)?;
        self.append_images(images)?;

        self.directories[index].image_count = image_count;
        self.directory_store.update_all(&self.directories)?;

        info!(id, path = %path.display(), images = image_count, "rescanned directory");
        Ok(Some(self.directories[index].clone()))
    }

    /// Count one more use of an image and persist it.
    ///
    /// Returns the new usage count, or `Ok(None)` for an unknown ID. If the write fails
    /// the in-memory count is restored.
    pub fn record_image_usage(&mut self, id: i32) -> Result<Option<i32>> {
        let Some(index) = self.image_index(id) else {
            return Ok(None);
        };

        let previous = self.images[index].usage;
        self.images[index].usage = previous.saturating_add(1);
        if let Err(e) = self.image_store.update_all(&self.images) {
            self.images[index].usage = previous;
            return Err(e);
        }

        debug!(id, usage = self.images[index].usage, "recorded image usage");
        Ok(Some(self.images[index].usage))
    }

    fn directory_index(&self, id: i32) -> Option<usize> {
        self.directories.binary_search_by_key(&id, |dir| dir.id).ok()
    }

    fn image_index(&self, id: i32) -> Option<usize> {
        self.images.binary_search_by_key(&id, |img| img.id).ok()
    }

    /// Give `images` a contiguous ID block above every ID issued so far and store them
    fn append_images(&mut self, mut images: Vec<ImageRecord>) -> Result<()> {
        if images.is_empty() {
            return Ok(());
        }

        let start = self.next_image_id;
        for (offset, image) in images.iter_mut().enumerate() {
            image.id = start + offset as i32;
        }

        self.image_store.append(&images)?;
        self.next_image_id = start + images.len() as i32;
        self.images.extend(images);
        Ok(())
    }

    /// Drop every image owned by `dir_id` from disk and memory
    fn remove_images_of(&mut self, dir_id: i32) -> Result<usize> {
        let ids: Vec<i32> = self.images_in_directory(dir_id).map(|img| img.id).collect();
        if ids.is_empty() {
            return Ok(0);
        }

        self.image_store.remove_by_ids(&ids, Some(self.images.as_slice()))?;
        self.images.retain(|img| img.dir_id != dir_id);
        Ok(ids.len())
    }
}
