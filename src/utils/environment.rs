use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "IMGSEEK_DATA_DIR";

const APP_DIR_NAME: &str = "imgseek";

/// Get the directory holding the data files
///
/// Uses `$IMGSEEK_DATA_DIR` when set and non-empty, otherwise the platform data
/// directory (e.g. `~/.local/share/imgseek` on Linux).
pub fn get_data_dir() -> Result<PathBuf> {
    data_dir_from(env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

pub(crate) fn data_dir_from(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir
        && !dir.as_os_str().is_empty()
    {
        return Ok(dir);
    }

    let base = dirs::data_dir().context("Failed to get platform data directory")?;
    Ok(base.join(APP_DIR_NAME))
}
