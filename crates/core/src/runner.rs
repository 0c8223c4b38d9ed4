//! Sequential driver tying scan, probe, policy, encode and replace together.
//!
//! Files are processed one at a time: probe, decide, and only then encode to
//! a temp path and swap. Every per-file error is caught here and turned into
//! a `Failed` outcome; nothing short of a startup problem aborts the run.
//! An interrupt between files can never leave a half-written replacement,
//! because the original is only ever mutated by the final swap.

use crate::encode::{run_ffmpeg, FfmpegEncodeParams};
use crate::policy::{decide, Decision, TOLERANCE};
use crate::probe::{probe_file, ProbeResult};
use crate::replace::{replace_original, temp_output_path};
use crate::report::RunStats;
use crate::scan::{scan_directory, ScanCandidate, ScanError};
use crate::startup::{run_startup_checks, StartupError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for fatal run-level failures.
///
/// Per-file problems never surface here; they become `FileOutcome::Failed`.
#[derive(Debug, Error)]
pub enum RunError {
    /// Startup check failed.
    #[error("Startup check failed: {0}")]
    Startup(#[from] StartupError),

    /// Root directory invalid.
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
}

/// Run parameters, assembled by the CLI from flags, config file, and env.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root directory to scan.
    pub root: PathBuf,
    /// Minimum candidate size in bytes.
    pub min_size_bytes: u64,
    /// Target maximum video bitrate in kbps.
    pub target_bitrate_kbps: u64,
    /// Use the platform hardware encoder where supported.
    pub hardware_acceleration: bool,
    /// Keep a backup of the original file after replacement.
    pub keep_original: bool,
    /// Pass ffmpeg output through.
    pub verbose: bool,
}

/// Terminal state of a single file.
///
/// Per file the pipeline runs `Discovered -> Probed -> {Skipped | Encoding
/// -> {Replaced | Failed}}`; these are the terminals.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Bitrate already within tolerance of the target; file untouched.
    Skipped {
        /// Why the file was left alone.
        reason: String,
        /// Size of the file in bytes.
        size_bytes: u64,
    },
    /// File re-encoded and swapped into place.
    Replaced {
        /// Original size in bytes.
        bytes_before: u64,
        /// Re-encoded size in bytes.
        bytes_after: u64,
        /// Bitrate measured before re-encoding.
        bitrate_kbps_before: f64,
        /// Bitrate measured on the replaced file, when the re-probe works.
        bitrate_kbps_after: Option<f64>,
    },
    /// Probe, encode, validation, or replacement failed; original untouched.
    Failed {
        /// What went wrong.
        reason: String,
    },
}

impl FileOutcome {
    /// Short status tag for log lines.
    pub fn as_str(&self) -> &str {
        match self {
            FileOutcome::Skipped { .. } => "skipped",
            FileOutcome::Replaced { .. } => "replaced",
            FileOutcome::Failed { .. } => "failed",
        }
    }
}

/// Validate an encode output: it must exist and be non-empty.
///
/// Returns the output size in bytes, or a reason string on failure.
pub fn validate_output(path: &Path) -> Result<u64, String> {
    let metadata =
        std::fs::metadata(path).map_err(|e| format!("Output file not found: {}", e))?;

    let output_bytes = metadata.len();
    if output_bytes == 0 {
        return Err("Output file is empty".to_string());
    }

    Ok(output_bytes)
}

/// Process a single candidate through probe, decision, encode, and replace.
///
/// Never returns an error; every failure mode collapses into
/// `FileOutcome::Failed` so the caller can continue with the next file.
pub async fn process_file(candidate: &ScanCandidate, opts: &RunOptions) -> FileOutcome {
    // Probe
    let probe_path = candidate.path.clone();
    let probe = match tokio::task::spawn_blocking(move || probe_file(&probe_path)).await {
        Ok(Ok(probe)) => probe,
        Ok(Err(e)) => {
            return FileOutcome::Failed {
                reason: format!("Probe failed: {}", e),
            };
        }
        Err(join_err) => {
            return FileOutcome::Failed {
                reason: format!("Probe task panicked: {}", join_err),
            };
        }
    };

    // A file whose bitrate cannot be measured cannot be judged
    let bitrate_kbps = match probe.bitrate_kbps {
        Some(kbps) => kbps,
        None => {
            return FileOutcome::Failed {
                reason: "Probe reported no usable bitrate".to_string(),
            };
        }
    };

    match decide(bitrate_kbps, opts.target_bitrate_kbps) {
        Decision::Skip { bitrate_kbps } => FileOutcome::Skipped {
            reason: format!(
                "bitrate {:.0} kbps within {:.0}% of target {} kbps ({})",
                bitrate_kbps,
                TOLERANCE * 100.0,
                opts.target_bitrate_kbps,
                probe.codec_name,
            ),
            size_bytes: candidate.size_bytes,
        },
        Decision::Encode { bitrate_kbps } => {
            encode_and_replace(candidate, bitrate_kbps, &probe, opts).await
        }
    }
}

/// Encode a candidate to a unique temp path, validate, and swap it in.
async fn encode_and_replace(
    candidate: &ScanCandidate,
    bitrate_kbps: f64,
    probe: &ProbeResult,
    opts: &RunOptions,
) -> FileOutcome {
    let temp_path = temp_output_path(&candidate.path);

    let params = FfmpegEncodeParams::new(
        candidate.path.clone(),
        temp_path.clone(),
        opts.target_bitrate_kbps,
        probe.duration_secs,
        opts.hardware_acceleration,
        opts.verbose,
    );

    let encode_result = tokio::task::spawn_blocking(move || run_ffmpeg(&params)).await;

    match encode_result {
        Ok(Ok(())) => {}
        Ok(Err(encode_err)) => {
            let _ = std::fs::remove_file(&temp_path);
            return FileOutcome::Failed {
                reason: format!("Encode failed: {}", encode_err),
            };
        }
        Err(join_err) => {
            let _ = std::fs::remove_file(&temp_path);
            return FileOutcome::Failed {
                reason: format!("Encode task panicked: {}", join_err),
            };
        }
    }

    let output_bytes = match validate_output(&temp_path) {
        Ok(bytes) => bytes,
        Err(reason) => {
            let _ = std::fs::remove_file(&temp_path);
            return FileOutcome::Failed { reason };
        }
    };

    // Replacement errors only occur before or during the swap and always
    // leave the original intact, so they fail the file
    if let Err(replace_err) = replace_original(&candidate.path, &temp_path, opts.keep_original) {
        let _ = std::fs::remove_file(&temp_path);
        return FileOutcome::Failed {
            reason: format!("Replacement failed: {}", replace_err),
        };
    }

    // Re-probe the replaced file to report the achieved bitrate; the swap
    // has already happened, so a probe hiccup here is not a failure
    let replaced_path = candidate.path.clone();
    let bitrate_kbps_after =
        match tokio::task::spawn_blocking(move || probe_file(&replaced_path)).await {
            Ok(Ok(probe)) => probe.bitrate_kbps,
            _ => None,
        };

    FileOutcome::Replaced {
        bytes_before: candidate.size_bytes,
        bytes_after: output_bytes,
        bitrate_kbps_before: bitrate_kbps,
        bitrate_kbps_after,
    }
}

/// Run the full pass: startup checks, scan, then one file at a time.
///
/// Returns the accumulated statistics; only startup-time problems are
/// errors. This takes a long while on a large library; each ffmpeg
/// invocation blocks until completion before the next file starts.
pub async fn run(opts: &RunOptions) -> Result<RunStats, RunError> {
    run_startup_checks()?;

    let candidates = scan_directory(&opts.root, opts.min_size_bytes)?;

    if opts.hardware_acceleration && !cfg!(target_os = "macos") {
        eprintln!(
            "Hardware acceleration is only supported on macOS; falling back to libx265"
        );
    }

    let mut stats = RunStats::default();

    for candidate in &candidates {
        println!("Processing {}...", candidate.path.display());

        let outcome = process_file(candidate, opts).await;

        match &outcome {
            FileOutcome::Skipped { reason, .. } => {
                println!("Skipped {}: {}", candidate.path.display(), reason);
            }
            FileOutcome::Replaced {
                bytes_before,
                bytes_after,
                bitrate_kbps_before,
                bitrate_kbps_after,
            } => {
                println!(
                    "Converted {}: {}MB -> {}MB (was {:.0} kbps)",
                    candidate.path.display(),
                    bytes_before / (1024 * 1024),
                    bytes_after / (1024 * 1024),
                    bitrate_kbps_before,
                );
                if let Some(after) = bitrate_kbps_after {
                    println!("New bitrate: {:.0} kbps", after);
                }
            }
            FileOutcome::Failed { reason } => {
                eprintln!("Failed {}: {}", candidate.path.display(), reason);
            }
        }

        stats.record(&outcome);
    }

    println!("\n{}", stats.format_summary());

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn test_opts(root: PathBuf) -> RunOptions {
        RunOptions {
            root,
            min_size_bytes: 0,
            target_bitrate_kbps: 1000,
            hardware_acceleration: false,
            keep_original: false,
            verbose: false,
        }
    }

    #[test]
    fn test_outcome_as_str() {
        assert_eq!(
            FileOutcome::Skipped {
                reason: String::new(),
                size_bytes: 0
            }
            .as_str(),
            "skipped"
        );
        assert_eq!(
            FileOutcome::Replaced {
                bytes_before: 0,
                bytes_after: 0,
                bitrate_kbps_before: 0.0,
                bitrate_kbps_after: None
            }
            .as_str(),
            "replaced"
        );
        assert_eq!(
            FileOutcome::Failed {
                reason: String::new()
            }
            .as_str(),
            "failed"
        );
    }

    #[test]
    fn test_validate_output_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("never-written.mp4");

        let result = validate_output(&missing);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not found"));
    }

    #[test]
    fn test_validate_output_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty.mp4");
        File::create(&empty).unwrap();

        let result = validate_output(&empty);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("empty"));
    }

    #[test]
    fn test_validate_output_nonempty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.mp4");
        File::create(&path).unwrap().write_all(b"content").unwrap();

        assert_eq!(validate_output(&path).unwrap(), 7);
    }

    // A file that ffprobe cannot read (it is not real video) produces a
    // Failed outcome and leaves the file byte-identical.
    #[tokio::test]
    async fn test_unprobeable_file_fails_and_is_untouched() {
        // Skip when ffprobe is not installed; the probe itself is external
        if crate::startup::check_ffprobe_available().is_err() {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let fake = temp_dir.path().join("fake.mp4");
        File::create(&fake).unwrap().write_all(b"not a video").unwrap();

        let candidate = ScanCandidate {
            path: fake.clone(),
            size_bytes: 11,
        };
        let opts = test_opts(temp_dir.path().to_path_buf());

        let outcome = process_file(&candidate, &opts).await;
        assert!(matches!(outcome, FileOutcome::Failed { .. }));

        let content = std::fs::read(&fake).unwrap();
        assert_eq!(content, b"not a video");
    }

    // Failure isolation: a bad file does not stop later files from being
    // evaluated; the run completes and counts both.
    #[tokio::test]
    async fn test_run_continues_past_failures() {
        if crate::startup::run_startup_checks().is_err() {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        for name in ["a.mp4", "b.mp4"] {
            File::create(temp_dir.path().join(name))
                .unwrap()
                .write_all(b"not a video either")
                .unwrap();
        }

        let opts = test_opts(temp_dir.path().to_path_buf());
        let stats = run(&opts).await.unwrap();

        assert_eq!(stats.files_seen, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.converted, 0);
    }

    #[tokio::test]
    async fn test_run_fails_fast_on_missing_root() {
        if crate::startup::run_startup_checks().is_err() {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let opts = test_opts(temp_dir.path().join("nope"));

        let result = run(&opts).await;
        assert!(matches!(result, Err(RunError::Scan(_))));
    }
}
