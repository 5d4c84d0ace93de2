//! Segment collector.
//!
//! Accumulates one speaker's decoded audio from the first frame until a
//! trailing-silence boundary, then persists the segment to a scratch WAV.
//! The boundary is frame-gap based: a live transport only carries frames
//! while the speaker is producing audio, so a quiet gap of the configured
//! duration ends the segment.

use crate::audio::metrics::SegmentMetrics;
use crate::audio::wav;
use crate::capture::decode::FrameDecoder;
use crate::defaults;
use crate::error::{Result, WardenError};
use crate::gateway::SpeakerStream;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for segment capture.
#[derive(Debug, Clone, Copy)]
pub struct CollectorConfig {
    /// Trailing silence that ends a segment (milliseconds).
    pub trailing_silence_ms: u32,
    /// Hard cap on accumulated segment duration (milliseconds).
    pub max_segment_ms: u32,
    /// Sample rate of decoded frames.
    pub sample_rate: u32,
    /// Channel count of decoded frames.
    pub channels: u16,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            trailing_silence_ms: defaults::TRAILING_SILENCE_MS,
            max_segment_ms: defaults::MAX_SEGMENT_MS,
            sample_rate: defaults::SOURCE_SAMPLE_RATE,
            channels: defaults::SOURCE_CHANNELS,
        }
    }
}

/// Result of a completed capture: the scratch file's derived metrics plus
/// elapsed wall time.
#[derive(Debug, Clone, Copy)]
pub struct CapturedSegment {
    pub metrics: SegmentMetrics,
    pub elapsed_ms: u64,
}

/// Accumulates one bounded utterance from a live speaker stream.
pub struct SegmentCollector<D: FrameDecoder> {
    config: CollectorConfig,
    decoder: D,
}

impl<D: FrameDecoder> SegmentCollector<D> {
    pub fn new(config: CollectorConfig, decoder: D) -> Self {
        Self { config, decoder }
    }

    /// Captures one segment and writes it to `scratch_path`.
    ///
    /// Returns the segment's derived metrics. Decode and stream errors fail
    /// the capture; the benign subset (premature close, corrupt frame,
    /// missing file) is suppressed to debug-level logs, anything else is
    /// logged once at warn.
    pub async fn collect(
        &mut self,
        stream: &mut dyn SpeakerStream,
        scratch_path: &Path,
    ) -> Result<CapturedSegment> {
        let started = tokio::time::Instant::now();
        let gap = Duration::from_millis(self.config.trailing_silence_ms as u64);
        let samples_per_ms =
            (self.config.sample_rate as usize * self.config.channels as usize) / 1000;
        let max_samples = samples_per_ms * self.config.max_segment_ms as usize;

        let mut samples: Vec<i16> = Vec::new();

        loop {
            let frame = match tokio::time::timeout(gap, stream.next_frame()).await {
                // Trailing silence elapsed with no frame: segment complete.
                Err(_) => break,
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => {
                    if samples.is_empty() {
                        let err = WardenError::Capture {
                            message: "stream closed before any audio arrived".to_string(),
                        };
                        log_capture_error(&err);
                        return Err(err);
                    }
                    // Stream closed after yielding audio: natural boundary.
                    break;
                }
                Ok(Err(err)) => {
                    log_capture_error(&err);
                    return Err(err);
                }
            };

            match self.decoder.decode(&frame) {
                Ok(decoded) => samples.extend_from_slice(&decoded),
                Err(err) => {
                    log_capture_error(&err);
                    return Err(err);
                }
            }

            if samples.len() >= max_samples {
                debug!(
                    max_segment_ms = self.config.max_segment_ms,
                    "segment reached duration cap, cutting"
                );
                break;
            }
        }

        wav::write_samples(
            scratch_path,
            &samples,
            self.config.sample_rate,
            self.config.channels,
        )?;

        let metrics =
            SegmentMetrics::from_samples(&samples, self.config.sample_rate, self.config.channels);

        Ok(CapturedSegment {
            metrics,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn log_capture_error(err: &WardenError) {
    if err.is_benign_stream_error() {
        debug!(error = %err, "capture ended by benign stream error");
    } else {
        warn!(error = %err, "capture failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::decode::PcmFrameDecoder;
    use crate::gateway::{ScriptItem, ScriptedStream, TransportFrame};
    use tempfile::tempdir;

    fn test_config() -> CollectorConfig {
        CollectorConfig {
            trailing_silence_ms: 1000,
            max_segment_ms: 10_000,
            sample_rate: 16_000,
            channels: 1,
        }
    }

    fn pcm_frame(samples: &[i16]) -> ScriptItem {
        let mut payload = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            payload.extend_from_slice(&s.to_le_bytes());
        }
        ScriptItem::Frame(TransportFrame { payload })
    }

    #[tokio::test(start_paused = true)]
    async fn test_collects_until_trailing_silence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.wav");

        let mut stream = ScriptedStream::new(vec![
            pcm_frame(&[100i16; 320]),
            ScriptItem::Gap(Duration::from_millis(20)),
            pcm_frame(&[200i16; 320]),
            // Longer than trailing_silence_ms; collector must stop before
            // ever seeing the frame behind it.
            ScriptItem::Gap(Duration::from_millis(5000)),
            pcm_frame(&[300i16; 320]),
        ]);

        let mut collector = SegmentCollector::new(test_config(), PcmFrameDecoder);
        let captured = collector.collect(&mut stream, &path).await.unwrap();

        assert_eq!(captured.metrics.byte_len, 2 * 640);
        let samples = crate::audio::wav::read_samples_mono(&path).unwrap();
        assert_eq!(samples.len(), 640);
        assert!(samples[..320].iter().all(|&s| s == 100));
        assert!(samples[320..].iter().all(|&s| s == 200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_close_after_audio_is_natural_boundary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.wav");

        let mut stream = ScriptedStream::new(vec![pcm_frame(&[500i16; 160])]);
        let mut collector = SegmentCollector::new(test_config(), PcmFrameDecoder);

        let captured = collector.collect(&mut stream, &path).await.unwrap();
        assert_eq!(captured.metrics.byte_len, 320);
        assert!(path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_close_before_audio_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.wav");

        let mut stream = ScriptedStream::new(vec![]);
        let mut collector = SegmentCollector::new(test_config(), PcmFrameDecoder);

        let err = collector.collect(&mut stream, &path).await.unwrap_err();
        assert!(err.is_benign_stream_error());
        assert!(!path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_frame_fails_capture() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.wav");

        let mut stream = ScriptedStream::new(vec![
            pcm_frame(&[100i16; 160]),
            ScriptItem::Frame(TransportFrame {
                payload: vec![0x01], // odd length
            }),
        ]);
        let mut collector = SegmentCollector::new(test_config(), PcmFrameDecoder);

        let err = collector.collect(&mut stream, &path).await.unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_cap_cuts_segment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.wav");

        let config = CollectorConfig {
            max_segment_ms: 100, // 1600 samples at 16kHz mono
            ..test_config()
        };

        // 4 frames of 50ms each; the cap stops accumulation at 100ms.
        let mut stream = ScriptedStream::new(vec![
            pcm_frame(&[1i16; 800]),
            pcm_frame(&[2i16; 800]),
            pcm_frame(&[3i16; 800]),
            pcm_frame(&[4i16; 800]),
        ]);
        let mut collector = SegmentCollector::new(config, PcmFrameDecoder);

        let captured = collector.collect(&mut stream, &path).await.unwrap();
        assert_eq!(captured.metrics.duration_ms, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_reflect_rms() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.wav");

        let mut stream = ScriptedStream::new(vec![pcm_frame(&[0i16; 3200])]);
        let mut collector = SegmentCollector::new(test_config(), PcmFrameDecoder);

        let captured = collector.collect(&mut stream, &path).await.unwrap();
        assert_eq!(captured.metrics.rms, 0.0);
    }
}
