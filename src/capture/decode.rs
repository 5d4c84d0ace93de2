//! Transport frame decoding.
//!
//! The gateway delivers codec frames; capture needs linear PCM. The decoder
//! is a seam so the transport codec can change without touching the
//! collector (the platform client usually hands us already-decoded PCM, but
//! some transports deliver their own framing).

use crate::error::{Result, WardenError};
use crate::gateway::TransportFrame;

/// Trait for decoding one transport frame to 16-bit linear PCM.
pub trait FrameDecoder: Send {
    /// Decodes a single frame. Interleaved samples, source rate/layout.
    fn decode(&mut self, frame: &TransportFrame) -> Result<Vec<i16>>;
}

/// Decoder for transports that deliver raw 16-bit little-endian PCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmFrameDecoder;

impl FrameDecoder for PcmFrameDecoder {
    fn decode(&mut self, frame: &TransportFrame) -> Result<Vec<i16>> {
        if frame.payload.len() % 2 != 0 {
            return Err(WardenError::Decode {
                message: format!(
                    "corrupt compressed frame: odd payload length {}",
                    frame.payload.len()
                ),
            });
        }

        Ok(frame
            .payload
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}
