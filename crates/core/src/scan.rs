//! Scanner module for discovering re-encode candidates under a root directory.
//!
//! This module recursively walks a directory tree and collects video files
//! that are large enough to be worth probing, filtering by extension and
//! a minimum size threshold.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::replace::is_temp_artifact;

/// Video file extensions recognized by the scanner (case-insensitive matching).
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".mov", ".avi", ".m4v", ".wmv"];

/// Error type for scan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root directory does not exist.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// The root path exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// A candidate video file discovered during scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCandidate {
    /// Full path to the video file.
    pub path: PathBuf,
    /// File size in bytes at discovery time.
    pub size_bytes: u64,
}

/// Checks if a file has a video extension (case-insensitive).
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = format!(".{}", ext.to_lowercase());
            VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Scans the root directory for re-encode candidates.
///
/// This function:
/// - Recursively walks the root directory
/// - Skips hidden directories (names starting with `.`)
/// - Filters files by video extensions (case-insensitive)
/// - Excludes in-progress encode temp artifacts left by an interrupted run
/// - Excludes files smaller than `min_bytes`
///
/// Bitrate is not considered here; that requires probing and is the
/// policy's job. Symlinks are not followed, so symlink cycles are
/// inherited from the traversal primitive and not handled specially.
pub fn scan_directory(root: &Path, min_bytes: u64) -> Result<Vec<ScanCandidate>, ScanError> {
    use walkdir::WalkDir;

    if !root.exists() {
        return Err(ScanError::DirectoryNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut candidates = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        // Skip hidden directories (but allow the root even if it starts with '.')
        if entry.file_type().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with('.') && entry.depth() > 0 {
                    return false;
                }
            }
        }
        true
    });

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        if !is_video_file(path) {
            continue;
        }

        // Leftover temp outputs carry a video extension; never feed them back in
        if is_temp_artifact(path) {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            let size_bytes = metadata.len();
            if size_bytes < min_bytes {
                continue;
            }

            candidates.push(ScanCandidate {
                path: path.to_path_buf(),
                size_bytes,
            });
        }
    }

    Ok(candidates)
}
