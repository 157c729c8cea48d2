use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::search::normalize::simplify;

/// File extensions recognised as images, lowercase and without the dot
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "tiff", "bmp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i32,
    pub dir_id: i32,
    /// Number of times the user picked this image
    pub usage: i32,
    pub simplified_name: String,
    pub file_name: String,
}

impl ImageRecord {
    /// Build an unpersisted record for `file_name` inside directory `dir_id`.
    ///
    /// The id is assigned by the repository when the batch is stored.
    pub fn new(dir_id: i32, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let simplified_name = simplify(stem(&file_name));
        Self { id: -1, dir_id, usage: 0, simplified_name, file_name }
    }

    /// A record is only searchable if something survives simplification
    pub fn is_valid(&self) -> bool {
        !self.simplified_name.is_empty()
    }

    /// File name without its extension; the ranking tie-breaker
    pub fn display_name(&self) -> &str {
        stem(&self.file_name)
    }

    /// Human-friendly title: every run of non-alphanumeric characters becomes one space
    pub fn display_title(&self) -> String {
        let mut title = String::with_capacity(self.file_name.len());
        let mut pending_space = false;
        for c in self.display_name().chars() {
            if c.is_alphanumeric() {
                if pending_space && !title.is_empty() {
                    title.push(' ');
                }
                pending_space = false;
                title.push(c);
            } else {
                pending_space = true;
            }
        }
        title
    }

    /// Whether `path` has one of the [`IMAGE_EXTENSIONS`], ignoring case
    pub fn has_image_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
    }
}

fn stem(file_name: &str) -> &str {
    Path::new(file_name).file_stem().and_then(|s| s.to_str()).unwrap_or(file_name)
}
