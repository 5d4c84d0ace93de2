//! voxwarden - keyword moderation for multi-party voice sessions
//!
//! Captures bounded per-speaker speech segments, transcribes them, and
//! enforces a moderation rule set on match.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod capture;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod enhance;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod moderation;
pub mod scheduler;
pub mod scratch;
pub mod stt;

// Collaborator seams (events in, subscriptions and enforcement out)
pub use gateway::{SpeakerKey, SpeakerStream, VoiceEvent, VoiceGateway};
pub use moderation::enforce::Enforcer;
pub use moderation::matcher::{Detection, KeywordMatcher, WordSetMatcher};
pub use stt::transcriber::Transcriber;

// Pipeline
pub use app::Warden;
pub use scheduler::{AdmitOutcome, CaptureScheduler, SchedulerConfig, TaskState};

// Error handling
pub use error::{Result, WardenError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
