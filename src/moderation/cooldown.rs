//! Per-speaker enforcement cooldowns.
//!
//! A cooldown entry suppresses re-capture of a speaker for a fixed window
//! after an enforcement action, so a rejoin immediately after a disconnect
//! does not re-trigger the pipeline. Entries are consulted on every
//! admission, removed lazily on expiry, and cleared explicitly when the
//! speaker leaves the session.

use crate::clock::{Clock, SystemClock};
use crate::gateway::SpeakerKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Process-wide cooldown state keyed by speaker.
pub struct CooldownMap {
    duration: Duration,
    clock: Box<dyn Clock>,
    entries: Mutex<HashMap<SpeakerKey, Instant>>,
}

impl CooldownMap {
    /// Creates a map arming cooldowns of the given duration.
    pub fn new(duration: Duration) -> Self {
        Self::with_clock(duration, Box::new(SystemClock))
    }

    /// Creates a map with a custom time source (for tests).
    pub fn with_clock(duration: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            duration,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Arms the speaker's cooldown, replacing any existing entry.
    pub fn arm(&self, key: SpeakerKey) {
        let expiry = self.clock.now() + self.duration;
        self.entries
            .lock()
            .expect("cooldown map poisoned")
            .insert(key, expiry);
        debug!(speaker = %key, cooldown_secs = self.duration.as_secs(), "cooldown armed");
    }

    /// Returns true while the speaker's cooldown is active.
    ///
    /// Expired entries are removed on consultation.
    pub fn is_active(&self, key: SpeakerKey) -> bool {
        let mut entries = self.entries.lock().expect("cooldown map poisoned");
        match entries.get(&key).copied() {
            Some(expiry) if self.clock.now() < expiry => true,
            Some(_) => {
                entries.remove(&key);
                false
            }
            None => false,
        }
    }

    /// Removes the speaker's entry (e.g. on leave), active or not.
    pub fn clear(&self, key: SpeakerKey) {
        self.entries
            .lock()
            .expect("cooldown map poisoned")
            .remove(&key);
    }
}
