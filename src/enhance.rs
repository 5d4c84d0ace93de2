//! Enhancement stage: noise reduction and resampling via an external
//! filter subprocess.
//!
//! The filter chain is data, not control flow: an ordered list of named
//! stages with numeric parameters, rendered into a single ffmpeg `-af`
//! argument. Multiple tasks may run this stage concurrently; there is no
//! shared mutable state.

use crate::defaults;
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// One named filter stage with its parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterStage {
    /// Filter name as the subprocess knows it (e.g. "highpass").
    pub name: String,
    /// Ordered key=value parameters.
    pub params: Vec<(String, String)>,
}

impl FilterStage {
    pub fn new(name: &str, params: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn render(&self) -> String {
        if self.params.is_empty() {
            return self.name.clone();
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}={}", self.name, params.join(":"))
    }
}

/// Ordered filter chain applied before recognition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterChain {
    pub stages: Vec<FilterStage>,
}

impl FilterChain {
    /// The default speech-cleanup chain: band-limit to the speech band,
    /// spectral denoise, presence boost, compress and gate dynamics, then
    /// normalize loudness. Parameter values are a tuning surface.
    pub fn speech_default() -> Self {
        Self {
            stages: vec![
                FilterStage::new("highpass", &[("f", "200")]),
                FilterStage::new("lowpass", &[("f", "3800")]),
                FilterStage::new("afftdn", &[("nr", "12"), ("nf", "-40")]),
                FilterStage::new(
                    "equalizer",
                    &[("f", "2500"), ("width_type", "h"), ("width", "1500"), ("g", "3")],
                ),
                FilterStage::new(
                    "acompressor",
                    &[("threshold", "-18dB"), ("ratio", "3"), ("attack", "5"), ("release", "80")],
                ),
                FilterStage::new("agate", &[("threshold", "-45dB")]),
                FilterStage::new("loudnorm", &[("I", "-20"), ("TP", "-2")]),
            ],
        }
    }

    /// Renders the chain into one comma-joined filter argument.
    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(FilterStage::render)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::speech_default()
    }
}

/// Enhancement stage contract.
///
/// Implementations take the raw scratch WAV and produce an enhanced WAV at
/// the recognizer's rate/layout. Failure is per-task; callers delete the
/// raw file on every path.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, raw: &Path, enhanced: &Path) -> Result<()>;
}

/// ffmpeg-backed enhancer.
pub struct FfmpegEnhancer {
    bin: String,
    chain: FilterChain,
    target_sample_rate: u32,
}

impl FfmpegEnhancer {
    pub fn new(chain: FilterChain) -> Self {
        Self {
            bin: defaults::ENHANCER_BIN.to_string(),
            chain,
            target_sample_rate: defaults::RECOGNIZER_SAMPLE_RATE,
        }
    }

    /// Overrides the subprocess binary (e.g. an absolute path).
    pub fn with_bin(mut self, bin: &str) -> Self {
        self.bin = bin.to_string();
        self
    }

    pub fn with_target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = rate;
        self
    }
}

#[async_trait]
impl Enhancer for FfmpegEnhancer {
    async fn enhance(&self, raw: &Path, enhanced: &Path) -> Result<()> {
        let filter_arg = self.chain.render();

        let mut command = Command::new(&self.bin);
        command
            .arg("-y")
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(raw)
            .arg("-af")
            .arg(&filter_arg)
            .args(["-ar", &self.target_sample_rate.to_string()])
            .args(["-ac", "1"])
            .args(["-sample_fmt", "s16"])
            .arg(enhanced)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(input = %raw.display(), filters = %filter_arg, "spawning enhancement subprocess");

        let output = command
            .output()
            .await
            .map_err(|e| WardenError::EnhancerSpawn {
                message: format!("{}: {}", self.bin, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status.code(), stderr = %stderr.trim(), "enhancement subprocess failed");
            return Err(WardenError::EnhancerExit {
                status: output.status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }
}

/// Pass-through enhancer: rewrites the raw WAV at the recognizer's
/// rate/layout without a subprocess.
///
/// Serves tests and environments without ffmpeg installed. Resampling is a
/// plain decimation/duplication, good enough for fixtures already near the
/// target rate.
#[derive(Debug, Clone, Copy)]
pub struct NoopEnhancer {
    target_sample_rate: u32,
}

impl NoopEnhancer {
    pub fn new() -> Self {
        Self {
            target_sample_rate: defaults::RECOGNIZER_SAMPLE_RATE,
        }
    }
}

impl Default for NoopEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enhancer for NoopEnhancer {
    async fn enhance(&self, raw: &Path, enhanced: &Path) -> Result<()> {
        let samples = crate::audio::wav::read_samples_mono(raw)?;

        let spec = hound::WavReader::open(raw)
            .map_err(|e| WardenError::Capture {
                message: format!("Failed to reopen raw WAV: {}", e),
            })?
            .spec();

        let resampled = resample_nearest(&samples, spec.sample_rate, self.target_sample_rate);
        crate::audio::wav::write_samples(enhanced, &resampled, self.target_sample_rate, 1)
    }
}

/// Nearest-sample resampler used by the no-op enhancer.
fn resample_nearest(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    (0..out_len)
        .map(|i| {
            let src = (i as u64 * from_rate as u64 / to_rate as u64) as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}
