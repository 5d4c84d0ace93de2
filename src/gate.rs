//! Signal-quality gate.
//!
//! Rejects segments too small, too short, or too quiet before any expensive
//! processing runs. Rejection is a designed-in filter, not an error: the
//! task completes with no output.

use crate::audio::metrics::SegmentMetrics;
use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds for the quality gate. All three are independently tunable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum segment payload size in bytes.
    pub min_bytes: u64,
    /// Minimum estimated duration in milliseconds.
    pub min_duration_ms: u32,
    /// Minimum RMS energy (0.0 to 1.0).
    pub min_rms: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_bytes: defaults::MIN_SEGMENT_BYTES,
            min_duration_ms: defaults::MIN_SEGMENT_DURATION_MS,
            min_rms: defaults::MIN_SEGMENT_RMS,
        }
    }
}

/// Why a segment was rejected. First failing check wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateRejection {
    TooSmall { byte_len: u64, min_bytes: u64 },
    TooShort { duration_ms: u32, min_duration_ms: u32 },
    TooQuiet { rms: f32, min_rms: f32 },
}

impl fmt::Display for GateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateRejection::TooSmall { byte_len, min_bytes } => {
                write!(f, "segment too small: {} bytes < {} bytes", byte_len, min_bytes)
            }
            GateRejection::TooShort {
                duration_ms,
                min_duration_ms,
            } => write!(
                f,
                "segment too short: {}ms < {}ms",
                duration_ms, min_duration_ms
            ),
            GateRejection::TooQuiet { rms, min_rms } => {
                write!(f, "segment too quiet: rms {:.4} < {:.4}", rms, min_rms)
            }
        }
    }
}

/// Quality gate over derived segment metrics.
///
/// `evaluate` is a pure function of the metrics; scratch deletion on
/// rejection is the calling stage's responsibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGate {
    config: GateConfig,
}

impl QualityGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Checks a segment against all three thresholds, short-circuiting on
    /// the first failure.
    pub fn evaluate(&self, metrics: &SegmentMetrics) -> Result<(), GateRejection> {
        if metrics.byte_len < self.config.min_bytes {
            return Err(GateRejection::TooSmall {
                byte_len: metrics.byte_len,
                min_bytes: self.config.min_bytes,
            });
        }

        if metrics.duration_ms < self.config.min_duration_ms {
            return Err(GateRejection::TooShort {
                duration_ms: metrics.duration_ms,
                min_duration_ms: self.config.min_duration_ms,
            });
        }

        if metrics.rms < self.config.min_rms {
            return Err(GateRejection::TooQuiet {
                rms: metrics.rms,
                min_rms: self.config.min_rms,
            });
        }

        Ok(())
    }
}
