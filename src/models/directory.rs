use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub id: i32,
    pub full_path: String,
    pub image_count: i32,
}

impl DirectoryRecord {
    pub fn new(id: i32, full_path: impl Into<String>) -> Self {
        Self { id, full_path: full_path.into(), image_count: 0 }
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.full_path)
    }

    /// Last path component, or the full path for roots
    pub fn name(&self) -> &str {
        Path::new(&self.full_path).file_name().and_then(|n| n.to_str()).unwrap_or(&self.full_path)
    }
}
