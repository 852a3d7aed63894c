//! Filesystem enumeration over the image corpus

use crate::error::{CurationError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// `.jpg` / `.jpeg` in any case, tolerating a dot-free tail such as `_large`
const JPEG_NAME_PATTERN: &str = r"(?i)\.jpe?g[^.]*$";

fn jpeg_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(JPEG_NAME_PATTERN).expect("JPEG name pattern is valid"))
}

/// Whether the file name of `path` looks like a JPEG
///
/// Purely name based; the contents are never inspected.
#[must_use]
pub fn is_jpeg_file_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| jpeg_name_regex().is_match(name))
}

/// All regular files under `root`, recursively, sorted by file name per directory
///
/// Entries that cannot be read are logged and skipped.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CurationError::file_io_error(
            "enumerate corpus",
            root,
            &std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {},
            Err(e) => log::warn!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }
    Ok(files)
}

/// JPEG-named files under `root`, recursively
pub fn list_jpeg_files(root: &Path) -> Result<Vec<PathBuf>> {
    Ok(list_files(root)?
        .into_iter()
        .filter(|path| is_jpeg_file_name(path))
        .collect())
}

/// Number of entries (files or directories) directly inside `dir`; 0 if absent
#[must_use]
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, Iterator::count)
}
