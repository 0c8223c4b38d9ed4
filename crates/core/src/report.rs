//! Run statistics accumulated across a single pass.

use crate::runner::FileOutcome;
use serde::{Deserialize, Serialize};

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Aggregate counters for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RunStats {
    /// Candidate files the scanner handed to the driver.
    pub files_seen: u64,
    /// Files successfully probed.
    pub probed: u64,
    /// Files left alone because their bitrate was within tolerance.
    pub skipped: u64,
    /// Files re-encoded and replaced.
    pub converted: u64,
    /// Files that failed at any per-file stage.
    pub failed: u64,
    /// Total size of all probed files in bytes.
    pub total_bytes: u64,
    /// Combined original size of converted files.
    pub bytes_before_conversion: u64,
    /// Combined size of converted files after re-encoding.
    pub bytes_after_conversion: u64,
}

impl RunStats {
    /// Fold a single file's outcome into the counters.
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files_seen += 1;
        match outcome {
            FileOutcome::Skipped { size_bytes, .. } => {
                self.probed += 1;
                self.skipped += 1;
                self.total_bytes += size_bytes;
            }
            FileOutcome::Replaced {
                bytes_before,
                bytes_after,
                ..
            } => {
                self.probed += 1;
                self.converted += 1;
                self.total_bytes += bytes_before;
                self.bytes_before_conversion += bytes_before;
                self.bytes_after_conversion += bytes_after;
            }
            FileOutcome::Failed { .. } => {
                self.failed += 1;
            }
        }
    }

    /// Bytes saved by conversions in this run.
    pub fn bytes_saved(&self) -> u64 {
        self.bytes_before_conversion
            .saturating_sub(self.bytes_after_conversion)
    }

    /// Human-readable end-of-run summary.
    pub fn format_summary(&self) -> String {
        format!(
            "Processing Statistics:\n\
             Reviewed {} files totaling {:.2} GB ({} skipped, {} failed).\n\
             Converted {} files totaling {:.2} GB, resulting in {:.2} GB of final files.\n\
             Saved {:.2} GB of disk space.",
            self.files_seen,
            self.total_bytes as f64 / GB,
            self.skipped,
            self.failed,
            self.converted,
            self.bytes_before_conversion as f64 / GB,
            self.bytes_after_conversion as f64 / GB,
            self.bytes_saved() as f64 / GB,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_skipped() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Skipped {
            reason: "within tolerance".to_string(),
            size_bytes: 1000,
        });

        assert_eq!(stats.files_seen, 1);
        assert_eq!(stats.probed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.converted, 0);
        assert_eq!(stats.total_bytes, 1000);
    }

    #[test]
    fn test_record_replaced() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Replaced {
            bytes_before: 5000,
            bytes_after: 2000,
            bitrate_kbps_before: 4000.0,
            bitrate_kbps_after: Some(1000.0),
        });

        assert_eq!(stats.converted, 1);
        assert_eq!(stats.total_bytes, 5000);
        assert_eq!(stats.bytes_before_conversion, 5000);
        assert_eq!(stats.bytes_after_conversion, 2000);
        assert_eq!(stats.bytes_saved(), 3000);
    }

    #[test]
    fn test_record_failed_not_counted_as_probed() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Failed {
            reason: "ffprobe failed".to_string(),
        });

        assert_eq!(stats.files_seen, 1);
        assert_eq!(stats.probed, 0);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn test_mixed_run_accumulation() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Skipped {
            reason: "within tolerance".to_string(),
            size_bytes: 100,
        });
        stats.record(&FileOutcome::Replaced {
            bytes_before: 1000,
            bytes_after: 400,
            bitrate_kbps_before: 4000.0,
            bitrate_kbps_after: None,
        });
        stats.record(&FileOutcome::Failed {
            reason: "encode failed".to_string(),
        });

        assert_eq!(stats.files_seen, 3);
        assert_eq!(stats.probed, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.converted, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_bytes, 1100);
        assert_eq!(stats.bytes_saved(), 600);
    }

    #[test]
    fn test_summary_mentions_counts() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Replaced {
            bytes_before: 3 * 1024 * 1024 * 1024,
            bytes_after: 1024 * 1024 * 1024,
            bitrate_kbps_before: 5000.0,
            bitrate_kbps_after: Some(1000.0),
        });

        let summary = stats.format_summary();
        assert!(summary.contains("Reviewed 1 files"));
        assert!(summary.contains("Converted 1 files"));
        assert!(summary.contains("Saved 2.00 GB"));
    }

    #[test]
    fn test_bytes_saved_never_underflows() {
        let stats = RunStats {
            bytes_before_conversion: 100,
            bytes_after_conversion: 200,
            ..Default::default()
        };
        assert_eq!(stats.bytes_saved(), 0);
    }
}
