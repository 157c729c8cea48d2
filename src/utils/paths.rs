use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Resolve a user-supplied directory argument to the absolute path that gets stored
///
/// Canonicalizing means `~/Pictures`, `./Pictures` and a symlink to it are all
/// recognised as the same referenced directory.
///
/// # Errors
///
/// Returns an error if the path does not exist or is not a directory.
pub fn resolve_directory(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Directory not found: {}", path.display()))?;

    if !canonical.is_dir() {
        bail!("Not a directory: {}", path.display());
    }

    Ok(canonical)
}

/// Formats a path with ~ substitution for the home directory
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use imgseek::format_path_with_tilde;
///
/// let path = PathBuf::from("/Users/alice/Pictures");
/// // Returns "~/Pictures" if HOME=/Users/alice
/// let formatted = format_path_with_tilde(&path);
/// ```
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

/// Internal helper for path formatting with optional home override (for testing)
pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && !home.is_empty()
        && path.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}
