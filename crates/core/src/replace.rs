//! Replacer module for temp output naming and atomic file replacement.
//!
//! Encodes never write over an original: ffmpeg targets a unique sibling
//! temp path, and only after the output is validated is the original swapped
//! out. The original filename and extension are preserved by the swap; the
//! temp path carries the same extension so ffmpeg muxes the same container.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Marker embedded in temp output names, used to recognize leftovers.
const TEMP_MARKER: &str = ".enc-";

/// Errors that can occur during file replacement.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// Failed to move the original aside as a backup.
    #[error("Failed to create backup: {0}")]
    BackupFailed(std::io::Error),

    /// Failed to move the encoded file into the original's place.
    #[error("Failed to swap in encoded file: {0}")]
    SwapFailed(std::io::Error),
}

/// Generates a unique temp output path for an encode of `original`.
///
/// The path lives in the same directory (same filesystem, so the final swap
/// is a rename) and ends with the original's extension so ffmpeg picks the
/// matching container. For example:
/// `/media/film.mkv` -> `/media/film.mkv.enc-3f9a1c2e.mkv`
///
/// The embedded uuid fragment makes paths unique per invocation, so
/// concurrent runs over the same tree can never collide on a temp file.
pub fn temp_output_path(original: &Path) -> PathBuf {
    let token = Uuid::new_v4().simple().to_string();
    let ext = original
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");

    let mut temp = original.as_os_str().to_owned();
    temp.push(format!("{}{}.{}", TEMP_MARKER, &token[..8], ext));
    PathBuf::from(temp)
}

/// Checks whether a path looks like a temp output left by an encode.
///
/// Only the exact generated shape matches: `.enc-` followed by an 8-char hex
/// token and the container extension, at the end of the filename. Ordinary
/// files that merely contain `.enc-` somewhere in their name (for example
/// `movie.enc-v2.mp4`) are not artifacts.
pub fn is_temp_artifact(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };

    let rest = match name.rfind(TEMP_MARKER) {
        Some(idx) => &name[idx + TEMP_MARKER.len()..],
        None => return false,
    };

    let mut parts = rest.splitn(2, '.');
    let token = parts.next().unwrap_or("");
    let ext = parts.next().unwrap_or("");

    token.len() == 8
        && token.chars().all(|c| c.is_ascii_hexdigit())
        && !ext.is_empty()
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Generates a backup path for the original file.
///
/// The backup path follows the format `<name>.orig.<timestamp>` where
/// timestamp is Unix epoch seconds.
pub fn backup_path(original: &Path) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut backup = original.as_os_str().to_owned();
    backup.push(format!(".orig.{}", timestamp));
    PathBuf::from(backup)
}

/// Replaces the original file with the encoded file.
///
/// Steps:
/// 1. Move the original aside to a `<name>.orig.<timestamp>` backup
/// 2. Move the encoded file into the original's place
/// 3. Delete the backup unless `keep_original` is set
///
/// On a step-2 failure the backup is restored, so the original survives
/// every failure mode. Renames are attempted first with a copy fallback for
/// filesystems where rename fails. Once step 2 succeeds the replacement has
/// happened; a backup that cannot be deleted only produces a warning.
pub fn replace_original(
    original_path: &Path,
    encoded_path: &Path,
    keep_original: bool,
) -> Result<(), ReplaceError> {
    // Step 1: move original aside
    let backup = backup_path(original_path);

    if fs::rename(original_path, &backup).is_err() {
        fs::copy(original_path, &backup).map_err(ReplaceError::BackupFailed)?;
        fs::remove_file(original_path).map_err(ReplaceError::BackupFailed)?;
    }

    // Step 2: move encoded file into place
    if fs::rename(encoded_path, original_path).is_err() {
        if let Err(e) = fs::copy(encoded_path, original_path) {
            // Restore original from backup on failure
            let _ = fs::rename(&backup, original_path);
            return Err(ReplaceError::SwapFailed(e));
        }
        let _ = fs::remove_file(encoded_path);
    }

    // Step 3: delete backup unless asked to keep it
    if !keep_original {
        discard_backup(&backup);
    }

    Ok(())
}

/// Best-effort removal of a backup after a successful swap.
///
/// The encoded file is already in place at this point, so a leftover backup
/// is reported on stderr but never fails the replacement.
fn discard_backup(backup: &Path) {
    if let Err(e) = fs::remove_file(backup) {
        eprintln!(
            "Warning: could not delete backup {}: {}",
            backup.display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_temp_output_path_preserves_extension() {
        let original = Path::new("/media/movies/film.mkv");
        let temp = temp_output_path(original);

        let temp_str = temp.to_string_lossy();
        assert!(temp_str.starts_with("/media/movies/film.mkv.enc-"));
        assert!(temp_str.ends_with(".mkv"));
    }

    #[test]
    fn test_temp_output_path_same_directory() {
        let original = Path::new("/media/movies/action/film.mp4");
        let temp = temp_output_path(original);
        assert_eq!(temp.parent(), original.parent());
    }

    #[test]
    fn test_temp_output_paths_unique() {
        let original = Path::new("/media/film.mp4");
        let a = temp_output_path(original);
        let b = temp_output_path(original);
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_temp_artifact() {
        let original = Path::new("/media/film.mp4");
        let temp = temp_output_path(original);

        assert!(is_temp_artifact(&temp));
        assert!(!is_temp_artifact(original));
        assert!(!is_temp_artifact(Path::new("/media/encounters.mkv")));
    }

    #[test]
    fn test_is_temp_artifact_requires_generated_shape() {
        // Names that merely contain the marker are ordinary files
        assert!(!is_temp_artifact(Path::new("/media/movie.enc-v2.mp4")));
        assert!(!is_temp_artifact(Path::new("/media/show.enc-final.mkv")));

        // Token must be exactly 8 hex chars followed by an extension
        assert!(is_temp_artifact(Path::new("/media/film.mkv.enc-3f9a1c2e.mkv")));
        assert!(!is_temp_artifact(Path::new("/media/film.mkv.enc-3f9a1c2.mkv")));
        assert!(!is_temp_artifact(Path::new("/media/film.mkv.enc-3f9a1c2ef.mkv")));
        assert!(!is_temp_artifact(Path::new("/media/film.mkv.enc-3f9a1c2e")));
        assert!(!is_temp_artifact(Path::new("/media/film.mkv.enc-3f9a1cze.mkv")));
    }

    // For any filename and recognized extension, the temp path lands in the
    // same directory, keeps the container extension, and is flagged as an
    // artifact while the original is not.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_temp_output_path_shape(
            dir in "[a-zA-Z0-9/_-]{1,30}",
            filename in "[a-zA-Z0-9._-]{1,20}",
            ext in prop_oneof![Just("mp4"), Just("mkv"), Just("avi"), Just("mov"), Just("m4v"), Just("wmv")],
        ) {
            let original = PathBuf::from(format!("/{}/{}.{}", dir, filename, ext));
            let temp = temp_output_path(&original);

            prop_assert_eq!(temp.parent(), original.parent());

            let temp_name = temp.file_name().unwrap().to_str().unwrap();
            prop_assert!(
                temp_name.ends_with(&format!(".{}", ext)),
                "Temp name '{}' should end with '.{}'",
                temp_name, ext
            );

            prop_assert!(is_temp_artifact(&temp));
            prop_assert!(!is_temp_artifact(&original) || filename.contains(".enc-"));
        }
    }

    #[test]
    fn test_backup_path_format() {
        let original = Path::new("/media/movies/film.mkv");
        let backup = backup_path(original);

        let backup_str = backup.to_string_lossy();
        assert!(backup_str.starts_with("/media/movies/film.mkv.orig."));

        let parts: Vec<&str> = backup_str.rsplitn(2, ".orig.").collect();
        assert_eq!(parts.len(), 2);
        let timestamp: u64 = parts[0].parse().expect("Timestamp should be a number");
        assert!(timestamp > 0);
    }

    #[test]
    fn test_replace_success_deletes_backup() {
        let temp_dir = TempDir::new().unwrap();

        let original_path = temp_dir.path().join("original.mkv");
        let mut original_file = File::create(&original_path).unwrap();
        original_file.write_all(b"original content").unwrap();
        drop(original_file);

        let encoded_path = temp_dir.path().join("encoded.mkv");
        let mut encoded_file = File::create(&encoded_path).unwrap();
        encoded_file.write_all(b"encoded content").unwrap();
        drop(encoded_file);

        replace_original(&original_path, &encoded_path, false).unwrap();

        let content = fs::read_to_string(&original_path).unwrap();
        assert_eq!(content, "encoded content");

        // Encoded temp file was consumed by the swap
        assert!(!encoded_path.exists());

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().contains(".orig."))
            .collect();
        assert!(entries.is_empty(), "Backup should be deleted");
    }

    #[test]
    fn test_replace_success_keeps_backup() {
        let temp_dir = TempDir::new().unwrap();

        let original_path = temp_dir.path().join("original.mkv");
        let mut original_file = File::create(&original_path).unwrap();
        original_file.write_all(b"original content").unwrap();
        drop(original_file);

        let encoded_path = temp_dir.path().join("encoded.mkv");
        let mut encoded_file = File::create(&encoded_path).unwrap();
        encoded_file.write_all(b"encoded content").unwrap();
        drop(encoded_file);

        replace_original(&original_path, &encoded_path, true).unwrap();

        let content = fs::read_to_string(&original_path).unwrap();
        assert_eq!(content, "encoded content");

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().contains(".orig."))
            .collect();
        assert_eq!(entries.len(), 1, "Backup should exist");

        let backup_content = fs::read_to_string(entries[0].path()).unwrap();
        assert_eq!(backup_content, "original content");
    }

    #[test]
    fn test_discard_backup_failure_is_nonfatal() {
        let temp_dir = TempDir::new().unwrap();

        // remove_file fails on a path that does not exist; the helper must
        // swallow it so a completed swap is never reported as a failure
        discard_backup(&temp_dir.path().join("already_gone.mkv.orig.0"));
    }

    #[test]
    fn test_replace_preserves_original_on_swap_failure() {
        let temp_dir = TempDir::new().unwrap();

        let original_path = temp_dir.path().join("original.mkv");
        let mut original_file = File::create(&original_path).unwrap();
        original_file.write_all(b"original content").unwrap();
        drop(original_file);

        // Non-existent encoded file triggers the swap failure
        let encoded_path = temp_dir.path().join("nonexistent.mkv");

        let result = replace_original(&original_path, &encoded_path, false);
        assert!(result.is_err());

        assert!(original_path.exists(), "Original should be restored");
        let content = fs::read_to_string(&original_path).unwrap();
        assert_eq!(content, "original content");
    }

    #[test]
    fn test_replace_backup_failure() {
        let temp_dir = TempDir::new().unwrap();
        let original_path = temp_dir.path().join("nonexistent_original.mkv");
        let encoded_path = temp_dir.path().join("encoded.mkv");

        File::create(&encoded_path).unwrap();

        let result = replace_original(&original_path, &encoded_path, false);
        assert!(matches!(result, Err(ReplaceError::BackupFailed(_))));
    }
}
