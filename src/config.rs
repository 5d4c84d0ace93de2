use crate::capture::CollectorConfig;
use crate::defaults;
use crate::gate::GateConfig;
use crate::scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub capture: CaptureConfig,
    pub gate: GateConfig,
    pub enhance: EnhanceConfig,
    pub stt: SttConfig,
    pub moderation: ModerationConfig,
    pub scheduler: SchedulerSection,
    pub scratch: ScratchConfig,
}

/// Decoded gateway audio layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Segment capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub trailing_silence_ms: u32,
    pub max_segment_ms: u32,
}

/// Enhancement stage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Disable to bypass the subprocess (format-only rewrite).
    pub enabled: bool,
    /// Subprocess binary name or path.
    pub bin: String,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model: String,
    pub language: String,
}

/// Moderation rule set configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModerationConfig {
    /// Prohibited terms, matched case-insensitively as whole words.
    pub terms: Vec<String>,
    pub cooldown_secs: u64,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerSection {
    pub max_concurrent: usize,
    pub task_timeout_secs: u64,
}

/// Scratch storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ScratchConfig {
    /// Directory for transient per-task audio files; a temp dir when unset.
    pub dir: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SOURCE_SAMPLE_RATE,
            channels: defaults::SOURCE_CHANNELS,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            trailing_silence_ms: defaults::TRAILING_SILENCE_MS,
            max_segment_ms: defaults::MAX_SEGMENT_MS,
        }
    }
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bin: defaults::ENHANCER_BIN.to_string(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            cooldown_secs: defaults::COOLDOWN_SECS,
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::MAX_CONCURRENT_CAPTURES,
            task_timeout_secs: defaults::TASK_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is an
    /// error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXWARDEN_MODEL → stt.model
    /// - VOXWARDEN_LANGUAGE → stt.language
    /// - VOXWARDEN_SCRATCH_DIR → scratch.dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOXWARDEN_MODEL")
            && !model.is_empty()
        {
            self.stt.model = model;
        }

        if let Ok(language) = std::env::var("VOXWARDEN_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(dir) = std::env::var("VOXWARDEN_SCRATCH_DIR")
            && !dir.is_empty()
        {
            self.scratch.dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxwarden/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxwarden")
            .join("config.toml")
    }

    /// Collector configuration derived from the audio and capture sections.
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            trailing_silence_ms: self.capture.trailing_silence_ms,
            max_segment_ms: self.capture.max_segment_ms,
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
        }
    }

    /// Scheduler configuration derived from the scheduler, capture and
    /// gate sections.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent: self.scheduler.max_concurrent,
            task_timeout: Duration::from_secs(self.scheduler.task_timeout_secs),
            collector: self.collector_config(),
            gate: self.gate,
        }
    }

    /// Cooldown window for enforced speakers.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.moderation.cooldown_secs)
    }
}
