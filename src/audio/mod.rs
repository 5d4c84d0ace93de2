//! Audio primitives: segment metrics and scratch WAV I/O.

pub mod metrics;
pub mod wav;

pub use metrics::{SegmentMetrics, calculate_rms};
