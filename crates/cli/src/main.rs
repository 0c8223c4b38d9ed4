//! CLI entry point for hevc-squeeze
//!
//! Parses command line arguments, merges them over an optional config file
//! and environment overrides, and runs a single sequential pass.

use clap::Parser;
use hevc_squeeze::{run, RunOptions};
use hevc_squeeze_config::Config;
use std::path::PathBuf;
use std::process::ExitCode;

/// Re-encode oversized videos in a directory tree to H.265.
///
/// Flags override config-file and environment values. Re-encoding a large
/// library takes a long while; be patient.
#[derive(Parser, Debug)]
#[command(name = "hevc-squeeze")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the directory to scan (default: current directory)
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// Maximum file size in MB; smaller files are never probed (default: 200)
    #[arg(short = 's', long)]
    max_size: Option<u64>,

    /// Maximum video bitrate in kbps (default: 1000)
    #[arg(short = 'b', long)]
    max_bitrate: Option<u64>,

    /// Enable verbose ffmpeg output
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Use the platform hardware encoder (macOS only)
    #[arg(long, default_value = "false")]
    hw_accel: bool,

    /// Keep a backup of each original file after replacement
    #[arg(long, default_value = "false")]
    keep_original: bool,

    /// Optional path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Merge precedence: config file < environment < CLI flags.
fn build_options(args: &Args, mut config: Config) -> RunOptions {
    if let Some(mb) = args.max_size {
        config.scan.max_size_mb = mb;
    }
    if let Some(kbps) = args.max_bitrate {
        config.encode.max_bitrate_kbps = kbps;
    }
    if args.hw_accel {
        config.encode.hardware_acceleration = true;
    }
    if args.keep_original {
        config.encode.keep_original = true;
    }

    RunOptions {
        root: args.directory.clone(),
        min_size_bytes: config.min_size_bytes(),
        target_bitrate_kbps: config.encode.max_bitrate_kbps,
        hardware_acceleration: config.encode.hardware_acceleration,
        keep_original: config.encode.keep_original,
        verbose: args.verbose,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    let opts = build_options(&args, config);

    println!("Scanning {}...", opts.root.display());
    println!(
        "Thresholds: size >= {} MB, bitrate > {} kbps (+15% tolerance)",
        opts.min_size_bytes / (1024 * 1024),
        opts.target_bitrate_kbps
    );

    // Per-file failures are reported inside the run and do not fail the process
    match run(&opts).await {
        Ok(_stats) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}
