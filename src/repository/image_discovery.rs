use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::models::ImageRecord;

/// List the image files directly inside `dir_path` as unpersisted records owned by `dir_id`
///
/// Only regular files at the top level are considered (subdirectories are not
/// descended into). A file qualifies when its extension is one of
/// [`IMAGE_EXTENSIONS`](crate::models::IMAGE_EXTENSIONS), compared case-insensitively.
/// Files are visited in file-name order so repeated scans of an unchanged directory
/// produce the same batch.
///
/// # Returns
///
/// Records with `usage == 0` and a placeholder id of `-1`; the repository assigns
/// real ids when it stores the batch.
///
/// # Errors
///
/// Returns [`Error::NotADirectory`] if `dir_path` exists but is not a directory, and
/// [`Error::DirectoryScan`] if the directory itself or one of its entries cannot be
/// read.
///
/// Files whose simplified name would be empty (e.g. `!!!.png`) and files with
/// non-UTF-8 names are skipped; the latter are logged as warnings.
pub fn discover_images(dir_path: &Path, dir_id: i32) -> Result<Vec<ImageRecord>> {
    // A missing root is reported by the walk itself
    if let Ok(metadata) = fs::metadata(dir_path)
        && !metadata.is_dir()
    {
        return Err(Error::NotADirectory { path: dir_path.to_path_buf() });
    }

    let mut images = Vec::new();
    let mut skipped = 0usize;

    let walker = WalkDir::new(dir_path).min_depth(1).max_depth(1).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| Error::DirectoryScan { path: dir_path.to_path_buf(), source: e })?;

        if !entry.file_type().is_file() || !ImageRecord::has_image_extension(entry.path()) {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "skipping image with non UTF-8 file name");
            continue;
        };

        let image = ImageRecord::new(dir_id, file_name);
        if image.is_valid() {
            images.push(image);
        } else {
            skipped += 1;
        }
    }

    debug!(
        dir = %dir_path.display(),
        found = images.len(),
        skipped,
        "discovered images"
    );
    Ok(images)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    /// Helper to create a directory containing empty files with the given names
    fn create_image_dir(file_names: &[&str]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for name in file_names {
            fs::File::create(dir.path().join(name)).expect("Failed to create file");
        }
        dir
    }

    fn names(images: &[ImageRecord]) -> Vec<&str> {
        images.iter().map(|img| img.file_name.as_str()).collect()
    }

    #[test]
    fn test_discover_images_filters_extensions() {
        let dir = create_image_dir(&["a.jpg", "b.jpeg", "c.png", "d.gif", "e.tiff", "f.bmp", "g.txt", "h.webp"]);

        let images = discover_images(dir.path(), 3).unwrap();
        assert_eq!(names(&images), vec!["a.jpg", "b.jpeg", "c.png", "d.gif", "e.tiff", "f.bmp"]);
        assert!(images.iter().all(|img| img.dir_id == 3 && img.usage == 0));
    }

    #[test]
    fn test_discover_images_ignores_extension_case() {
        let dir = create_image_dir(&["upper.PNG", "mixed.JpEg"]);

        let images = discover_images(dir.path(), 0).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_discover_images_sorted_by_file_name() {
        let dir = create_image_dir(&["zebra.png", "apple.png", "mango.png"]);

        let images = discover_images(dir.path(), 0).unwrap();
        assert_eq!(names(&images), vec!["apple.png", "mango.png", "zebra.png"]);
    }

    #[test]
    fn test_discover_images_skips_invalid_names() {
        let dir = create_image_dir(&["!!!.png", "ok.png", "__.jpg"]);

        let images = discover_images(dir.path(), 0).unwrap();
        assert_eq!(names(&images), vec!["ok.png"]);
    }

    #[test]
    fn test_discover_images_is_not_recursive() {
        let dir = create_image_dir(&["top.png"]);
        let nested = dir.path().join("nested.png");
        fs::create_dir(&nested).expect("Failed to create nested dir");
        fs::File::create(nested.join("deep.png")).expect("Failed to create file");

        let images = discover_images(dir.path(), 0).unwrap();
        assert_eq!(names(&images), vec!["top.png"]);
    }

    #[test]
    fn test_discover_images_empty_directory() {
        let dir = create_image_dir(&[]);
        assert!(discover_images(dir.path(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_discover_images_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing: PathBuf = dir.path().join("gone");

        let err = discover_images(&missing, 0).unwrap_err();
        assert!(matches!(err, Error::DirectoryScan { .. }));
    }

    #[test]
    fn test_discover_images_rejects_regular_file() {
        let dir = create_image_dir(&["a.png"]);

        let err = discover_images(&dir.path().join("a.png"), 0).unwrap_err();
        assert!(matches!(err, Error::NotADirectory { .. }));
    }
}
