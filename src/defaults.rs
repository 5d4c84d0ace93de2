//! Default configuration constants for voxwarden.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Sample rate the recognition backend requires, in Hz.
///
/// 16kHz mono is the standard input for speech recognition models and the
/// target of the enhancement stage's final resample.
pub const RECOGNIZER_SAMPLE_RATE: u32 = 16000;

/// Sample rate of decoded gateway audio, in Hz.
///
/// Voice transports deliver 48kHz PCM after codec decode; captured segments
/// are written to scratch at this rate and downsampled by the enhancer.
pub const SOURCE_SAMPLE_RATE: u32 = 48000;

/// Channel count of decoded gateway audio.
pub const SOURCE_CHANNELS: u16 = 2;

/// Trailing silence before a segment is considered complete, in milliseconds.
///
/// Shorter favors responsiveness, longer favors full-utterance capture.
/// The useful range is roughly 800-2000ms.
pub const TRAILING_SILENCE_MS: u32 = 1200;

/// Hard cap on a single segment's duration, in milliseconds.
///
/// A speaker holding the floor longer than this gets their segment cut and
/// transcribed anyway; the next utterance starts a fresh task.
pub const MAX_SEGMENT_MS: u32 = 12_000;

/// Minimum byte length for a segment to be worth processing.
///
/// Below this there is not enough signal for the recognizer to produce
/// anything useful.
pub const MIN_SEGMENT_BYTES: u64 = 16_000;

/// Minimum estimated duration for a segment, in milliseconds.
pub const MIN_SEGMENT_DURATION_MS: u32 = 400;

/// Minimum RMS energy for a segment to be worth transcribing.
///
/// Segments below this are silence/ambient noise; skip the enhancer and
/// recognizer entirely.
pub const MIN_SEGMENT_RMS: f32 = 0.005;

/// Maximum number of capture tasks in flight at once.
pub const MAX_CONCURRENT_CAPTURES: usize = 3;

/// Upper bound on total task lifetime, in seconds.
///
/// The watchdog frees the scheduling slot when this elapses; it does not
/// interrupt native work already in flight.
pub const TASK_TIMEOUT_SECS: u64 = 20;

/// Cooldown after a successful enforcement action, in seconds.
///
/// Prevents an immediate rejoin from re-triggering capture.
pub const COOLDOWN_SECS: u64 = 10;

/// Default Whisper model name.
pub const DEFAULT_MODEL: &str = "base.en";

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Binary invoked by the enhancement stage.
pub const ENHANCER_BIN: &str = "ffmpeg";
