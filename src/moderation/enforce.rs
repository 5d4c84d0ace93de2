//! Enforcement collaborator boundary.
//!
//! The platform call (forced disconnect of an identified participant) lives
//! outside this crate. Enforcement is best effort, once: a failed call is
//! logged and never retried, and no cooldown is armed for it, so capture
//! retries naturally on the speaker's next utterance.

use crate::error::Result;
use crate::gateway::SpeakerKey;
use async_trait::async_trait;
use std::sync::Mutex;

/// Trait for the platform enforcement action.
///
/// The policy is a temporary disconnect: the speaker can rejoin, and the
/// cooldown armed by the hook suppresses immediate re-capture.
#[async_trait]
pub trait Enforcer: Send + Sync {
    /// Disconnects the speaker, citing the matched terms.
    async fn enforce(&self, key: SpeakerKey, reason_terms: &[String]) -> Result<()>;
}

/// Mock enforcer recording calls, for tests and the demo binary.
pub struct MockEnforcer {
    calls: Mutex<Vec<(SpeakerKey, Vec<String>)>>,
    should_fail: bool,
}

impl MockEnforcer {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            should_fail: false,
        }
    }

    /// Configure the mock to fail on enforce
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Returns all recorded enforcement calls.
    pub fn calls(&self) -> Vec<(SpeakerKey, Vec<String>)> {
        self.calls.lock().expect("calls poisoned").clone()
    }
}

impl Default for MockEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enforcer for MockEnforcer {
    async fn enforce(&self, key: SpeakerKey, reason_terms: &[String]) -> Result<()> {
        if self.should_fail {
            return Err(crate::error::WardenError::Enforcement {
                speaker: key.speaker,
                message: "mock enforcement failure".to_string(),
            });
        }
        self.calls
            .lock()
            .expect("calls poisoned")
            .push((key, reason_terms.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_enforcer_records_calls() {
        let enforcer = MockEnforcer::new();
        let key = SpeakerKey::new(1, 2);

        enforcer
            .enforce(key, &["touchdown".to_string()])
            .await
            .unwrap();

        let calls = enforcer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, key);
        assert_eq!(calls[0].1, vec!["touchdown"]);
    }

    #[tokio::test]
    async fn test_mock_enforcer_failure_records_nothing() {
        let enforcer = MockEnforcer::new().with_failure();
        let key = SpeakerKey::new(1, 2);

        let result = enforcer.enforce(key, &[]).await;
        assert!(result.is_err());
        assert!(enforcer.calls().is_empty());
    }
}
