//! Error types for voxwarden.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Capture errors
    #[error("Audio capture failed: {message}")]
    Capture { message: String },

    #[error("Frame decode failed: {message}")]
    Decode { message: String },

    // Gateway errors
    #[error("Gateway subscription failed for speaker {speaker}: {message}")]
    Subscribe { speaker: u64, message: String },

    // Scratch storage errors
    #[error("Scratch storage error at {path}: {message}")]
    Scratch { path: String, message: String },

    // Enhancement errors
    #[error("Enhancement subprocess failed to spawn: {message}")]
    EnhancerSpawn { message: String },

    #[error("Enhancement subprocess exited with status {status}")]
    EnhancerExit { status: i32 },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Transcription inference failed: {message}")]
    InferenceFailed { message: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    // Enforcement errors
    #[error("Enforcement failed for speaker {speaker}: {message}")]
    Enforcement { speaker: u64, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WardenError>;

impl WardenError {
    /// Returns true for the known benign transport/stream failure causes.
    ///
    /// These occur routinely when a speaker drops mid-utterance or the
    /// gateway recycles a stream; they are suppressed to debug-level logs.
    pub fn is_benign_stream_error(&self) -> bool {
        match self {
            WardenError::Capture { message } | WardenError::Decode { message } => {
                let m = message.to_ascii_lowercase();
                m.contains("premature")
                    || m.contains("stream closed")
                    || m.contains("corrupt")
                    || m.contains("no such file")
                    || m.contains("missing file")
            }
            WardenError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
