//! Voice-session gateway boundary.
//!
//! The gateway client (channel join/leave, permission checks, text commands)
//! lives outside this crate. This module defines the seam it plugs into:
//! speaker events in, per-speaker audio subscriptions out, plus the session
//! monitor that turns gateway events into scheduler admissions.

use crate::error::{Result, WardenError};
use crate::moderation::cooldown::CooldownMap;
use crate::scheduler::CaptureScheduler;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Voice session identifier assigned by the platform.
pub type SessionId = u64;

/// Speaker identifier assigned by the platform.
pub type SpeakerId = u64;

/// One speaker within one voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeakerKey {
    pub session: SessionId,
    pub speaker: SpeakerId,
}

impl SpeakerKey {
    pub fn new(session: SessionId, speaker: SpeakerId) -> Self {
        Self { session, speaker }
    }
}

impl fmt::Display for SpeakerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.speaker)
    }
}

/// One transport-encoded audio frame from a speaker's inbound stream.
#[derive(Debug, Clone)]
pub struct TransportFrame {
    pub payload: Vec<u8>,
}

/// Live per-speaker audio subscription.
///
/// `next_frame` suspends until the next transport frame arrives; `None`
/// means the platform closed the stream.
#[async_trait]
pub trait SpeakerStream: Send {
    async fn next_frame(&mut self) -> Result<Option<TransportFrame>>;
}

/// Gateway callback surface used by the core.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Opens a live audio subscription for one speaker.
    async fn subscribe(&self, key: SpeakerKey) -> Result<Box<dyn SpeakerStream>>;
}

/// Events delivered by the voice-session collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    SpeakerJoined(SpeakerKey),
    SpeakerLeft(SpeakerKey),
    SpeakerStarted(SpeakerKey),
}

/// Dispatches gateway events into the capture scheduler.
///
/// Owns the monitored-speaker set: only speakers that have joined are
/// eligible for capture, and a speaker leaving clears any cooldown so a
/// fresh join starts clean. Event dispatch is single-consumer, so the set
/// has no concurrent writers.
pub struct SessionMonitor {
    scheduler: CaptureScheduler,
    cooldowns: Arc<CooldownMap>,
    watched: Mutex<HashSet<SpeakerKey>>,
}

impl SessionMonitor {
    pub fn new(scheduler: CaptureScheduler, cooldowns: Arc<CooldownMap>) -> Self {
        Self {
            scheduler,
            cooldowns,
            watched: Mutex::new(HashSet::new()),
        }
    }

    /// Returns true if the speaker is currently monitored.
    pub fn is_watched(&self, key: SpeakerKey) -> bool {
        self.watched.lock().expect("watched set poisoned").contains(&key)
    }

    /// Handles one gateway event.
    ///
    /// `SpeakerStarted` for a watched speaker attempts admission; the
    /// scheduler's de-duplication makes repeated start events for an
    /// in-flight speaker no-ops, which keeps `subscribe` idempotent per
    /// (session, speaker) pair.
    pub async fn handle_event(&self, event: VoiceEvent) {
        match event {
            VoiceEvent::SpeakerJoined(key) => {
                let inserted = self.watched.lock().expect("watched set poisoned").insert(key);
                if inserted {
                    info!(speaker = %key, "monitoring speaker");
                }
            }
            VoiceEvent::SpeakerLeft(key) => {
                self.watched.lock().expect("watched set poisoned").remove(&key);
                self.cooldowns.clear(key);
                info!(speaker = %key, "speaker left, monitoring stopped");
            }
            VoiceEvent::SpeakerStarted(key) => {
                if !self.is_watched(key) {
                    debug!(speaker = %key, "ignoring start event for unmonitored speaker");
                    return;
                }
                self.scheduler.admit(key).await;
            }
        }
    }
}

/// In-process gateway streaming scripted frames, for tests and the demo
/// binary.
pub struct ScriptedGateway {
    scripts: Mutex<Vec<(SpeakerKey, ScriptedStream)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
        }
    }

    /// Queues a stream to be handed out on the next `subscribe` for `key`.
    pub fn push_stream(&self, key: SpeakerKey, stream: ScriptedStream) {
        self.scripts.lock().expect("scripts poisoned").push((key, stream));
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceGateway for ScriptedGateway {
    async fn subscribe(&self, key: SpeakerKey) -> Result<Box<dyn SpeakerStream>> {
        let mut scripts = self.scripts.lock().expect("scripts poisoned");
        let position = scripts.iter().position(|(k, _)| *k == key);
        match position {
            Some(index) => Ok(Box::new(scripts.remove(index).1)),
            None => Err(WardenError::Subscribe {
                speaker: key.speaker,
                message: "no scripted stream queued".to_string(),
            }),
        }
    }
}

/// Scripted stream items: frames, inter-frame gaps, or injected failures.
pub enum ScriptItem {
    Frame(TransportFrame),
    /// Wall-clock pause before the next item is yielded.
    Gap(std::time::Duration),
    Error(WardenError),
}

/// Speaker stream that replays a fixed script.
pub struct ScriptedStream {
    items: std::collections::VecDeque<ScriptItem>,
}

impl ScriptedStream {
    pub fn new(items: Vec<ScriptItem>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Builds a script of evenly spaced PCM frames from raw samples.
    ///
    /// `frame_ms` controls both the chunking and the pacing gap between
    /// frames, mimicking a live transport.
    pub fn from_pcm_samples(
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        frame_ms: u32,
    ) -> Self {
        let frame_len = (sample_rate as usize * channels as usize * frame_ms as usize) / 1000;
        let mut items = Vec::new();
        for chunk in samples.chunks(frame_len.max(1)) {
            let mut payload = Vec::with_capacity(chunk.len() * 2);
            for sample in chunk {
                payload.extend_from_slice(&sample.to_le_bytes());
            }
            items.push(ScriptItem::Frame(TransportFrame { payload }));
        }
        Self::new(items)
    }
}

#[async_trait]
impl SpeakerStream for ScriptedStream {
    async fn next_frame(&mut self) -> Result<Option<TransportFrame>> {
        loop {
            match self.items.pop_front() {
                Some(ScriptItem::Frame(frame)) => return Ok(Some(frame)),
                Some(ScriptItem::Gap(duration)) => {
                    tokio::time::sleep(duration).await;
                }
                Some(ScriptItem::Error(error)) => return Err(error),
                None => return Ok(None),
            }
        }
    }
}
