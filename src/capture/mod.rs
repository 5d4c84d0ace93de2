//! Per-speaker segment capture: transport frame decode and silence-boundary
//! accumulation.

pub mod collector;
pub mod decode;

pub use collector::{CapturedSegment, CollectorConfig, SegmentCollector};
pub use decode::{FrameDecoder, PcmFrameDecoder};
