//! Probe module for reading video bitrate and codec via ffprobe.
//!
//! Runs ffprobe against a single file and extracts the first video stream's
//! codec and bitrate plus container-level duration and size. The probe is the
//! only source of bitrate information; nothing here parses media containers
//! directly.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Error type for probe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// ffprobe command failed to execute.
    #[error("ffprobe failed: {0}")]
    FfprobeFailed(String),

    /// Failed to parse ffprobe JSON output.
    #[error("Failed to parse ffprobe output: {0}")]
    ParseError(String),

    /// IO error during probe.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of probing a video file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    /// Codec name of the first video stream (e.g., "h264", "hevc").
    pub codec_name: String,
    /// Video bitrate in kbps, if the container reports one.
    ///
    /// Taken from the first video stream's `bit_rate`, falling back to the
    /// format-level `bit_rate` (mkv in particular omits per-stream values).
    pub bitrate_kbps: Option<f64>,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// File size in bytes as reported by the container.
    pub size_bytes: u64,
}

/// Raw ffprobe JSON structures for parsing.
mod ffprobe_json {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct FfprobeOutput {
        pub streams: Option<Vec<Stream>>,
        pub format: Option<Format>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Stream {
        pub codec_name: Option<String>,
        pub bit_rate: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Format {
        pub duration: Option<String>,
        pub size: Option<String>,
        pub bit_rate: Option<String>,
    }
}

/// Probes a video file using ffprobe to collect bitrate and codec metadata.
///
/// Runs `ffprobe -v error -select_streams v:0 -show_entries
/// stream=codec_name,bit_rate -show_entries format=duration,size,bit_rate
/// -of json <path>` and parses the JSON output.
pub fn probe_file(path: &Path) -> Result<ProbeResult, ProbeError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_name,bit_rate",
            "-show_entries",
            "format=duration,size,bit_rate",
            "-of",
            "json",
        ])
        .arg(path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::FfprobeFailed(format!(
            "ffprobe exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_ffprobe_output(&stdout)
}

/// Parses ffprobe JSON output into a ProbeResult.
pub fn parse_ffprobe_output(json_str: &str) -> Result<ProbeResult, ProbeError> {
    let ffprobe: ffprobe_json::FfprobeOutput =
        serde_json::from_str(json_str).map_err(|e| ProbeError::ParseError(e.to_string()))?;

    let streams = ffprobe.streams.unwrap_or_default();
    let format = ffprobe.format.ok_or_else(|| {
        ProbeError::ParseError("Missing format information in ffprobe output".to_string())
    })?;

    let video_stream = streams.first().ok_or_else(|| {
        ProbeError::ParseError("No video stream in ffprobe output".to_string())
    })?;

    let codec_name = video_stream.codec_name.clone().unwrap_or_default();

    let stream_kbps = video_stream
        .bit_rate
        .as_ref()
        .and_then(|br| br.parse::<f64>().ok())
        .map(|bps| bps / 1000.0);

    let format_kbps = format
        .bit_rate
        .as_ref()
        .and_then(|br| br.parse::<f64>().ok())
        .map(|bps| bps / 1000.0);

    let bitrate_kbps = stream_kbps.or(format_kbps).filter(|kbps| *kbps > 0.0);

    let duration_secs = format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size_bytes = format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(ProbeResult {
        codec_name,
        bitrate_kbps,
        duration_secs,
        size_bytes,
    })
}
