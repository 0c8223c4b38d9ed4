//! Startup checks verifying the external tools are present.
//!
//! ffprobe and ffmpeg are hard requirements; a missing tool is fatal before
//! any file is touched.

use std::process::Command;
use thiserror::Error;

/// Error types for startup checks.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("ffmpeg not available: {0}")]
    FfmpegUnavailable(String),

    #[error("ffprobe not available: {0}")]
    FfprobeUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check if ffmpeg is available by running `ffmpeg -version`.
pub fn check_ffmpeg_available() -> Result<(), StartupError> {
    check_tool("ffmpeg").map_err(StartupError::FfmpegUnavailable)
}

/// Check if ffprobe is available by running `ffprobe -version`.
pub fn check_ffprobe_available() -> Result<(), StartupError> {
    check_tool("ffprobe").map_err(StartupError::FfprobeUnavailable)
}

fn check_tool(tool: &str) -> Result<(), String> {
    let output = Command::new(tool)
        .arg("-version")
        .output()
        .map_err(|e| format!("{} -version failed; is it in PATH? Error: {}", tool, e))?;

    if !output.status.success() {
        return Err(format!("{} -version exited with {}", tool, output.status));
    }

    Ok(())
}

/// Run all startup checks in order: ffprobe first, then ffmpeg.
pub fn run_startup_checks() -> Result<(), StartupError> {
    check_ffprobe_available()?;
    check_ffmpeg_available()?;
    Ok(())
}
