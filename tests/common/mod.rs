//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use imgseek::{Repository, StorePaths};
use tempfile::TempDir;

/// Builder for a temporary directory of (fake) image files
pub struct ImageDirBuilder {
    temp_dir: TempDir,
}

impl ImageDirBuilder {
    /// Create a new builder with an empty directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    /// Get the path to the directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a file with a few placeholder bytes
    pub fn with_image(self, file_name: &str) -> Self {
        self.with_file(file_name, b"\x89PNG placeholder")
    }

    /// Add several files with placeholder bytes
    pub fn with_images(self, file_names: &[&str]) -> Self {
        file_names.iter().fold(self, |builder, name| builder.with_image(name))
    }

    /// Add a file with the given content
    pub fn with_file(self, file_name: &str, content: &[u8]) -> Self {
        fs::write(self.temp_dir.path().join(file_name), content)
            .expect("Failed to write image file");
        self
    }

    /// Add a nested directory containing one file
    pub fn with_subdir_image(self, subdir: &str, file_name: &str) -> Self {
        let dir = self.temp_dir.path().join(subdir);
        fs::create_dir_all(&dir).expect("Failed to create subdir");
        fs::write(dir.join(file_name), b"nested").expect("Failed to write nested file");
        self
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for ImageDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway data directory holding `dirs.dat` and `imgs.dat`
pub struct DataDir {
    temp_dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create data dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn store_paths(&self) -> StorePaths {
        StorePaths::in_dir(self.temp_dir.path())
    }

    /// Open (or reopen) the repository backed by this data directory
    pub fn open(&self) -> Repository {
        Repository::open(&self.store_paths()).expect("Failed to open repository")
    }

    pub fn directories_file(&self) -> PathBuf {
        self.store_paths().directories
    }

    pub fn images_file(&self) -> PathBuf {
        self.store_paths().images
    }
}

impl Default for DataDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory used by the walkthrough scenarios: `cat.png`, `CAT2.PNG`, `dog!!.jpg`
pub fn scenario_dir() -> TempDir {
    ImageDirBuilder::new().with_images(&["cat.png", "CAT2.PNG", "dog!!.jpg"]).build()
}

/// File names of the images in the order they are returned
pub fn file_names<'a>(images: impl IntoIterator<Item = &'a imgseek::ImageRecord>) -> Vec<String> {
    images.into_iter().map(|img| img.file_name.clone()).collect()
}

/// Assert both collections are strictly ascending by ID
pub fn assert_ascending(repo: &Repository) {
    assert!(
        repo.directories().windows(2).all(|w| w[0].id < w[1].id),
        "Directory IDs must be strictly ascending"
    );
    assert!(
        repo.images().windows(2).all(|w| w[0].id < w[1].id),
        "Image IDs must be strictly ascending"
    );
}

/// Assert every directory's image_count matches the images referencing it
pub fn assert_counts_consistent(repo: &Repository) {
    for dir in repo.directories() {
        let actual = repo.images_in_directory(dir.id).count();
        assert_eq!(dir.image_count as usize, actual, "image_count mismatch for {}", dir.full_path);
    }
}
