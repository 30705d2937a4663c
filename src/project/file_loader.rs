//! Disk access for the indexer.

use std::path::Path;
use std::time::SystemTime;

use walkdir::WalkDir;

use super::project_part::ProjectFileKind;
use crate::base::FilePath;
use crate::error::{Error, Result};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Whether a file of `size` bytes fits under a limit given in megabytes.
/// `None` means unlimited.
pub fn fits_size_limit(size: u64, limit_mb: Option<u32>) -> bool {
    match limit_mb {
        Some(limit) => size <= u64::from(limit) * BYTES_PER_MB,
        None => true,
    }
}

/// Size of the file on disk.
pub fn file_size(path: &FilePath) -> Result<u64> {
    std::fs::metadata(path.as_path())
        .map(|m| m.len())
        .map_err(|e| Error::io(path.as_path(), e))
}

/// Modification time on disk, `None` for missing or injected files.
pub fn modified_time(path: &FilePath) -> Option<SystemTime> {
    if path.is_injected() {
        return None;
    }
    std::fs::metadata(path.as_path()).and_then(|m| m.modified()).ok()
}

/// Whether `path` is an existing regular file.
pub fn is_file(path: &FilePath) -> bool {
    !path.is_injected() && path.as_path().is_file()
}

/// Read a file as text, refusing files above the limit. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn read_file(path: &FilePath, limit_mb: Option<u32>) -> Result<String> {
    let size = file_size(path)?;
    if let Some(limit) = limit_mb
        && !fits_size_limit(size, Some(limit))
    {
        return Err(Error::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit_mb: limit,
        });
    }
    let bytes = std::fs::read(path.as_path()).map_err(|e| Error::io(path.as_path(), e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

/// Keep only the files that fit under the size limit. Unreadable files are
/// kept so that the processor records them.
pub fn filter_by_size(files: impl IntoIterator<Item = FilePath>, limit_mb: Option<u32>) -> Vec<FilePath> {
    files
        .into_iter()
        .filter(|path| {
            if path.is_injected() || limit_mb.is_none() {
                return true;
            }
            match file_size(path) {
                Ok(size) if !fits_size_limit(size, limit_mb) => {
                    tracing::debug!(path = %path, size, "skipping file above size limit");
                    false
                }
                _ => true,
            }
        })
        .collect()
}

/// Recursively collect C-family files below `dir`, sorted.
pub fn collect_file_paths(dir: &Path) -> Result<Vec<FilePath>> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
        ));
    }
    let mut paths: Vec<FilePath> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| FilePath::from_path(entry.path()))
        .filter(ProjectFileKind::is_known)
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests;
