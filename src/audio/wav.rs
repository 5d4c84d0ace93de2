//! Scratch WAV read/write for per-task segment files.

use crate::error::{Result, WardenError};
use std::path::Path;

/// Writes 16-bit PCM samples to a WAV file at the given path.
///
/// Scratch segments are written once by the capture stage and read back by
/// the enhancement subprocess (or directly by the recognizer when
/// enhancement is disabled).
pub fn write_samples(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| WardenError::Scratch {
        path: path.display().to_string(),
        message: format!("Failed to create WAV file: {}", e),
    })?;

    for &sample in samples {
        writer.write_sample(sample).map_err(|e| WardenError::Scratch {
            path: path.display().to_string(),
            message: format!("Failed to write WAV sample: {}", e),
        })?;
    }

    writer.finalize().map_err(|e| WardenError::Scratch {
        path: path.display().to_string(),
        message: format!("Failed to finalize WAV file: {}", e),
    })?;

    Ok(())
}

/// Reads all 16-bit PCM samples from a WAV file, downmixing stereo to mono.
///
/// The recognizer consumes mono; anything else in scratch is an enhancer
/// bug, so a channel count above 2 is rejected.
pub fn read_samples_mono(path: &Path) -> Result<Vec<i16>> {
    let mut reader = hound::WavReader::open(path).map_err(|e| WardenError::Capture {
        message: format!("Failed to open WAV file {}: {}", path.display(), e),
    })?;

    let spec = reader.spec();
    if spec.channels == 0 || spec.channels > 2 {
        return Err(WardenError::Capture {
            message: format!("Unsupported channel count {} in scratch WAV", spec.channels),
        });
    }

    let raw: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| WardenError::Decode {
            message: format!("corrupt compressed frame in scratch WAV: {}", e),
        })?;

    if spec.channels == 2 {
        Ok(raw
            .chunks_exact(2)
            .map(|pair| {
                let left = pair[0] as i32;
                let right = pair[1] as i32;
                ((left + right) / 2) as i16
            })
            .collect())
    } else {
        Ok(raw)
    }
}
