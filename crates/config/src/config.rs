//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Scanner-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanConfig {
    /// Minimum file size in MB for a file to be considered (default 200)
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

fn default_max_size_mb() -> u64 {
    200
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_size_mb: default_max_size_mb(),
        }
    }
}

/// Encoder-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodeConfig {
    /// Target maximum video bitrate in kbps (default 1000)
    #[serde(default = "default_max_bitrate_kbps")]
    pub max_bitrate_kbps: u64,
    /// Use the platform hardware encoder where supported (default false)
    #[serde(default)]
    pub hardware_acceleration: bool,
    /// Keep a backup of the original file after replacement (default false)
    #[serde(default)]
    pub keep_original: bool,
}

fn default_max_bitrate_kbps() -> u64 {
    1000
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            max_bitrate_kbps: default_max_bitrate_kbps(),
            hardware_acceleration: false,
            keep_original: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub encode: EncodeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the TOML file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - SQUEEZE_MAX_SIZE_MB -> scan.max_size_mb
    /// - SQUEEZE_MAX_BITRATE_KBPS -> encode.max_bitrate_kbps
    /// - SQUEEZE_HWACCEL -> encode.hardware_acceleration
    /// - SQUEEZE_KEEP_ORIGINAL -> encode.keep_original
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("SQUEEZE_MAX_SIZE_MB") {
            if let Ok(mb) = val.parse::<u64>() {
                self.scan.max_size_mb = mb;
            }
        }

        if let Ok(val) = env::var("SQUEEZE_MAX_BITRATE_KBPS") {
            if let Ok(kbps) = val.parse::<u64>() {
                self.encode.max_bitrate_kbps = kbps;
            }
        }

        if let Ok(val) = env::var("SQUEEZE_HWACCEL") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.encode.hardware_acceleration = true,
                "false" | "0" | "no" => self.encode.hardware_acceleration = false,
                _ => {} // Invalid value, keep existing
            }
        }

        if let Ok(val) = env::var("SQUEEZE_KEEP_ORIGINAL") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.encode.keep_original = true,
                "false" | "0" | "no" => self.encode.keep_original = false,
                _ => {}
            }
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Minimum candidate size in bytes derived from `scan.max_size_mb`
    pub fn min_size_bytes(&self) -> u64 {
        self.scan.max_size_mb * 1024 * 1024
    }
}
