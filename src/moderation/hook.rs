//! Transcript hook: detection and enforcement glue.

use crate::gateway::SpeakerKey;
use crate::moderation::cooldown::CooldownMap;
use crate::moderation::enforce::Enforcer;
use crate::moderation::matcher::KeywordMatcher;
use std::sync::Arc;
use tracing::{info, warn};

/// What the hook did with one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Empty text after trimming; nothing consulted.
    Empty,
    /// Matcher found nothing.
    Clean,
    /// Enforcement succeeded; cooldown armed.
    Enforced { terms: Vec<String> },
    /// Enforcement failed; no cooldown armed, no retry.
    EnforcementFailed { terms: Vec<String> },
}

/// Receives per-speaker transcripts and applies the moderation rule set.
pub struct TranscriptHook {
    matcher: Arc<dyn KeywordMatcher>,
    enforcer: Arc<dyn Enforcer>,
    cooldowns: Arc<CooldownMap>,
}

impl TranscriptHook {
    pub fn new(
        matcher: Arc<dyn KeywordMatcher>,
        enforcer: Arc<dyn Enforcer>,
        cooldowns: Arc<CooldownMap>,
    ) -> Self {
        Self {
            matcher,
            enforcer,
            cooldowns,
        }
    }

    /// Processes one transcript for one speaker.
    pub async fn on_transcript(&self, key: SpeakerKey, text: &str) -> HookOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return HookOutcome::Empty;
        }

        let detection = self.matcher.detect(trimmed);
        if !detection.matched {
            return HookOutcome::Clean;
        }

        info!(
            speaker = %key,
            terms = ?detection.terms,
            "prohibited terms detected, enforcing"
        );

        match self.enforcer.enforce(key, &detection.terms).await {
            Ok(()) => {
                self.cooldowns.arm(key);
                HookOutcome::Enforced {
                    terms: detection.terms,
                }
            }
            Err(e) => {
                // Best effort, once. The speaker's next utterance will be
                // captured again since no cooldown was armed.
                warn!(speaker = %key, error = %e, "enforcement failed, not retrying");
                HookOutcome::EnforcementFailed {
                    terms: detection.terms,
                }
            }
        }
    }
}
