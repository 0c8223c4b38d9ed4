//! Encoder module wrapping ffmpeg H.265 invocations.
//!
//! Builds and executes the ffmpeg command that transcodes a single file to
//! HEVC at the target bitrate. Hardware acceleration maps to the macOS
//! VideoToolbox encoder; everywhere else the software encoder is used.
//! In non-verbose mode ffmpeg's own output is silenced and a percentage is
//! reported instead, derived from `-progress` readings against the probed
//! duration.

use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Software HEVC encoder.
const SOFTWARE_ENCODER: &str = "libx265";

/// Hardware HEVC encoder on the one supported platform (macOS).
const HARDWARE_ENCODER: &str = "hevc_videotoolbox";

/// Error type for encoding operations.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// ffmpeg process exited with non-zero status.
    #[error("ffmpeg failed with exit code: {0}")]
    FfmpegFailed(i32),

    /// ffmpeg process was terminated by signal.
    #[error("ffmpeg process was terminated by signal")]
    FfmpegTerminated,

    /// IO error during encoding.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parameters for a single ffmpeg transcode.
#[derive(Debug, Clone)]
pub struct FfmpegEncodeParams {
    /// Path to the input video file.
    pub input_path: PathBuf,
    /// Path for the encoded output file.
    pub output_path: PathBuf,
    /// Target video bitrate in kbps.
    pub target_bitrate_kbps: u64,
    /// Probed duration of the input in seconds, used for progress reporting.
    pub duration_secs: f64,
    /// Request the platform hardware encoder.
    pub hardware_acceleration: bool,
    /// Pass ffmpeg's own output through instead of silencing it.
    pub verbose: bool,
}

impl FfmpegEncodeParams {
    /// Create new encoding parameters.
    pub fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        target_bitrate_kbps: u64,
        duration_secs: f64,
        hardware_acceleration: bool,
        verbose: bool,
    ) -> Self {
        Self {
            input_path,
            output_path,
            target_bitrate_kbps,
            duration_secs,
            hardware_acceleration,
            verbose,
        }
    }
}

/// Whether the hardware encoder is actually usable for these params.
///
/// The flag only takes effect on macOS; on any other platform the software
/// encoder is selected regardless.
pub fn hardware_encoder_selected(params: &FfmpegEncodeParams) -> bool {
    params.hardware_acceleration && cfg!(target_os = "macos")
}

/// Name of the video encoder the command will use.
pub fn encoder_name(params: &FfmpegEncodeParams) -> &'static str {
    if hardware_encoder_selected(params) {
        HARDWARE_ENCODER
    } else {
        SOFTWARE_ENCODER
    }
}

/// Build an ffmpeg command with all required transcode flags.
///
/// Creates a Command configured with:
/// - Input and output paths
/// - HEVC video encoder at the target bitrate
/// - AAC audio re-encode
/// - `-y` to overwrite a stale temp output
/// - `-progress pipe:1` plus quiet flags unless verbose
pub fn build_ffmpeg_command(params: &FfmpegEncodeParams) -> Command {
    let mut cmd = Command::new("ffmpeg");

    cmd.arg("-i").arg(&params.input_path);
    cmd.arg("-c:v").arg(encoder_name(params));
    cmd.arg("-b:v")
        .arg(format!("{}k", params.target_bitrate_kbps));
    cmd.arg("-c:a").arg("aac");
    cmd.arg("-y");

    if !params.verbose {
        cmd.arg("-progress").arg("pipe:1");
        cmd.arg("-nostats");
        cmd.arg("-loglevel").arg("error");
    }

    cmd.arg(&params.output_path);

    cmd
}

/// Parse an ffmpeg `-progress` key/value line, returning the `out_time_ms`
/// reading.
///
/// ffmpeg reports `out_time_ms` in microseconds despite the name; lines like
/// `out_time_ms=N/A` (emitted before the first frame) parse as None.
pub fn parse_out_time_ms(line: &str) -> Option<i64> {
    line.strip_prefix("out_time_ms=")?.trim().parse().ok()
}

/// Percent complete for an `out_time_ms` reading against the probed duration.
///
/// Returns None when the duration is unknown (zero) or the reading is
/// negative, in which case no progress line should be printed.
pub fn progress_percent(out_time_us: i64, duration_secs: f64) -> Option<f64> {
    if duration_secs <= 0.0 || out_time_us < 0 {
        return None;
    }
    Some((out_time_us as f64 / 1_000_000.0) / duration_secs * 100.0)
}

fn status_to_result(status: ExitStatus) -> Result<(), EncodeError> {
    if status.success() {
        Ok(())
    } else {
        match status.code() {
            Some(code) => Err(EncodeError::FfmpegFailed(code)),
            None => Err(EncodeError::FfmpegTerminated),
        }
    }
}

/// Execute an ffmpeg transcode.
///
/// Blocks until ffmpeg exits; callers drive this through
/// `tokio::task::spawn_blocking`. In non-verbose mode the `-progress`
/// stream is consumed and printed as `Progress: N%` overwriting a single
/// status line.
///
/// # Errors
/// Returns an error if:
/// - The ffmpeg process fails to start (IO error)
/// - The ffmpeg process exits with non-zero status
/// - The ffmpeg process is terminated by a signal
pub fn run_ffmpeg(params: &FfmpegEncodeParams) -> Result<(), EncodeError> {
    let mut cmd = build_ffmpeg_command(params);

    if params.verbose {
        let status = cmd.status()?;
        return status_to_result(status);
    }

    let mut child = cmd.stdout(Stdio::piped()).spawn()?;

    if let Some(stdout) = child.stdout.take() {
        let reader = BufReader::new(stdout);
        for line in reader.lines().map_while(Result::ok) {
            if let Some(out_time_us) = parse_out_time_ms(&line) {
                if let Some(pct) = progress_percent(out_time_us, params.duration_secs) {
                    print!("Progress: {:.2}%\r", pct);
                    let _ = io::stdout().flush();
                }
            }
        }
    }

    let status = child.wait()?;
    status_to_result(status)
}
