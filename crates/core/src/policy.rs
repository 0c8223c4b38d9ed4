//! Policy module deciding whether a probed file is worth re-encoding.
//!
//! A file is skipped when its measured bitrate is within 15% of, or below,
//! the target bitrate. Files already more efficient than the target are
//! never touched, even when they sit below the lower tolerance bound.

use serde::{Deserialize, Serialize};

/// Tolerance fraction applied around the target bitrate.
pub const TOLERANCE: f64 = 0.15;

/// Decision for a single probed file, carrying the bitrate it was based on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Bitrate is at or below the tolerance-inflated target; leave the file alone.
    Skip {
        /// Measured bitrate in kbps.
        bitrate_kbps: f64,
    },
    /// Bitrate exceeds the upper bound; re-encode to the target.
    Encode {
        /// Measured bitrate in kbps.
        bitrate_kbps: f64,
    },
}

impl Decision {
    /// Measured bitrate this decision was based on.
    pub fn bitrate_kbps(&self) -> f64 {
        match self {
            Decision::Skip { bitrate_kbps } | Decision::Encode { bitrate_kbps } => *bitrate_kbps,
        }
    }

    /// True if the decision is to re-encode.
    pub fn is_encode(&self) -> bool {
        matches!(self, Decision::Encode { .. })
    }
}

/// Decide whether a file at `probed_kbps` should be re-encoded toward
/// `target_kbps`.
///
/// Skip iff `probed_kbps <= target_kbps * (1 + TOLERANCE)`. The boundary
/// itself is a Skip.
pub fn decide(probed_kbps: f64, target_kbps: u64) -> Decision {
    let upper_bound = target_kbps as f64 * (1.0 + TOLERANCE);

    if probed_kbps <= upper_bound {
        Decision::Skip {
            bitrate_kbps: probed_kbps,
        }
    } else {
        Decision::Encode {
            bitrate_kbps: probed_kbps,
        }
    }
}
