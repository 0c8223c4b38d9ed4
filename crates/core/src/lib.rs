//! hevc-squeeze
//!
//! Walks a directory tree, probes each video file's bitrate with ffprobe,
//! and re-encodes files over a configurable bitrate threshold to H.265 via
//! ffmpeg, replacing originals safely through temp files.

pub mod encode;
pub mod policy;
pub mod probe;
pub mod replace;
pub mod report;
pub mod runner;
pub mod scan;
pub mod startup;

pub use encode::{
    build_ffmpeg_command, parse_out_time_ms, progress_percent, run_ffmpeg, EncodeError,
    FfmpegEncodeParams,
};
pub use hevc_squeeze_config as config;
pub use hevc_squeeze_config::Config;
pub use policy::{decide, Decision, TOLERANCE};
pub use probe::{parse_ffprobe_output, probe_file, ProbeError, ProbeResult};
pub use replace::{
    backup_path, is_temp_artifact, replace_original, temp_output_path, ReplaceError,
};
pub use report::RunStats;
pub use runner::{process_file, run, FileOutcome, RunError, RunOptions};
pub use scan::{is_video_file, scan_directory, ScanCandidate, ScanError, VIDEO_EXTENSIONS};
pub use startup::{
    check_ffmpeg_available, check_ffprobe_available, run_startup_checks, StartupError,
};
