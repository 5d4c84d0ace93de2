//! Capture scheduler.
//!
//! Owns the concurrency bound across capture, gating, enhancement and
//! recognition, de-duplicates per-speaker work, and reclaims stuck tasks by
//! timeout. All terminal transitions funnel through one cleanup point that
//! frees the accounting slot and releases scratch files, so a failure in
//! any stage of one speaker's pipeline never leaks resources or blocks
//! another speaker.

pub mod task;

pub use task::{CaptureTask, TaskState};

use crate::capture::{CollectorConfig, PcmFrameDecoder, SegmentCollector};
use crate::defaults;
use crate::enhance::Enhancer;
use crate::gate::{GateConfig, QualityGate};
use crate::gateway::{SpeakerKey, VoiceGateway};
use crate::moderation::cooldown::CooldownMap;
use crate::moderation::hook::TranscriptHook;
use crate::scratch::{ScratchStore, TaskScratch};
use crate::stt::queue::RecognitionHandle;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Scheduler tunables.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Concurrency ceiling across all in-flight tasks.
    pub max_concurrent: usize,
    /// Upper bound on total task lifetime.
    pub task_timeout: Duration,
    /// Segment capture configuration.
    pub collector: CollectorConfig,
    /// Quality gate thresholds.
    pub gate: GateConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::MAX_CONCURRENT_CAPTURES,
            task_timeout: Duration::from_secs(defaults::TASK_TIMEOUT_SECS),
            collector: CollectorConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

/// Why an admission attempt was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    Admitted,
    /// The speaker already has an in-flight task.
    AlreadyInFlight,
    /// The speaker is under an active enforcement cooldown.
    InCooldown,
    /// The concurrency ceiling has been reached.
    AtCapacity,
}

impl AdmitOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmitOutcome::Admitted)
    }
}

struct Registry {
    in_flight: HashMap<SpeakerKey, CaptureTask>,
    next_generation: u64,
}

/// Concurrency-bounded owner of all capture tasks.
///
/// Cheap to clone; clones share the in-flight registry. The spawned
/// pipeline futures and watchdogs each hold a clone.
#[derive(Clone)]
pub struct CaptureScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    config: SchedulerConfig,
    gate: QualityGate,
    gateway: Arc<dyn VoiceGateway>,
    enhancer: Arc<dyn Enhancer>,
    recognition: RecognitionHandle,
    hook: Arc<TranscriptHook>,
    scratch: Arc<ScratchStore>,
    cooldowns: Arc<CooldownMap>,
    registry: Mutex<Registry>,
}

impl CaptureScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SchedulerConfig,
        gateway: Arc<dyn VoiceGateway>,
        enhancer: Arc<dyn Enhancer>,
        recognition: RecognitionHandle,
        hook: Arc<TranscriptHook>,
        scratch: Arc<ScratchStore>,
        cooldowns: Arc<CooldownMap>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                gate: QualityGate::new(config.gate),
                config,
                gateway,
                enhancer,
                recognition,
                hook,
                scratch,
                cooldowns,
                registry: Mutex::new(Registry {
                    in_flight: HashMap::new(),
                    next_generation: 0,
                }),
            }),
        }
    }

    /// Number of tasks currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inner
            .registry
            .lock()
            .expect("registry poisoned")
            .in_flight
            .len()
    }

    /// Attempts to admit a capture task for the speaker.
    ///
    /// Rejects when the speaker already has an in-flight task, is under an
    /// active cooldown, or the concurrency ceiling is reached. On
    /// admission the pipeline future and its timeout watchdog are spawned;
    /// the call itself returns immediately.
    pub async fn admit(&self, key: SpeakerKey) -> AdmitOutcome {
        let inner = &self.inner;
        let (generation, scratch) = {
            let mut registry = inner.registry.lock().expect("registry poisoned");

            if registry.in_flight.contains_key(&key) {
                debug!(speaker = %key, "admission rejected: task already in flight");
                return AdmitOutcome::AlreadyInFlight;
            }
            if inner.cooldowns.is_active(key) {
                debug!(speaker = %key, "admission rejected: speaker in cooldown");
                return AdmitOutcome::InCooldown;
            }
            if registry.in_flight.len() >= inner.config.max_concurrent {
                debug!(
                    speaker = %key,
                    ceiling = inner.config.max_concurrent,
                    "admission rejected: concurrency ceiling reached"
                );
                return AdmitOutcome::AtCapacity;
            }

            let generation = registry.next_generation;
            registry.next_generation += 1;

            let timestamp_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            let scratch = inner.scratch.allocate(key.speaker, timestamp_ms, generation);

            registry.in_flight.insert(
                key,
                CaptureTask {
                    key,
                    generation,
                    state: TaskState::Capturing,
                    scratch: scratch.clone(),
                },
            );
            (generation, scratch)
        };

        debug!(speaker = %key, generation, "capture task admitted");

        // Watchdog: reclaims the accounting slot if the task overstays.
        let watchdog = inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(watchdog.config.task_timeout).await;
            watchdog.expire(key, generation);
        });

        let runner = inner.clone();
        tokio::spawn(async move {
            let state = runner.drive(key, generation, &scratch).await;
            runner.finish(key, generation, &scratch, state);
        });

        AdmitOutcome::Admitted
    }
}

impl SchedulerInner {
    /// Runs the staged pipeline for one task and returns its terminal
    /// state. Cleanup is the caller's job.
    async fn drive(&self, key: SpeakerKey, generation: u64, scratch: &TaskScratch) -> TaskState {
        // Capture
        let mut stream = match self.gateway.subscribe(key).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(speaker = %key, error = %e, "subscription failed");
                return TaskState::Failed;
            }
        };

        let mut collector = SegmentCollector::new(self.config.collector, PcmFrameDecoder);
        let captured = match collector.collect(stream.as_mut(), &scratch.raw).await {
            Ok(captured) => captured,
            // Collector already classified and logged the cause.
            Err(_) => return TaskState::Failed,
        };

        debug!(
            speaker = %key,
            bytes = captured.metrics.byte_len,
            duration_ms = captured.metrics.duration_ms,
            rms = captured.metrics.rms,
            elapsed_ms = captured.elapsed_ms,
            "segment captured"
        );

        // Gate
        if !self.advance(key, generation, TaskState::Gating) {
            return TaskState::Done;
        }
        if let Err(rejection) = self.gate.evaluate(&captured.metrics) {
            debug!(speaker = %key, %rejection, "segment rejected by quality gate");
            // Rejection deletes the scratch buffer before returning.
            self.scratch.release(scratch);
            return TaskState::Done;
        }

        // Enhance
        if !self.advance(key, generation, TaskState::Enhancing) {
            return TaskState::Done;
        }
        if let Err(e) = self.enhancer.enhance(&scratch.raw, &scratch.enhanced).await {
            warn!(speaker = %key, error = %e, "enhancement failed");
            return TaskState::Failed;
        }

        // Recognize
        if !self.advance(key, generation, TaskState::Recognizing) {
            return TaskState::Done;
        }
        let samples = match crate::audio::wav::read_samples_mono(&scratch.enhanced) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(speaker = %key, error = %e, "failed to read enhanced segment");
                return TaskState::Failed;
            }
        };
        let text = self.recognition.transcribe(samples).await;
        // Both scratch files are consumed once recognition returns.
        self.scratch.release(scratch);

        // Detect. A reclaimed task must not act on its late result.
        if !self.is_live(key, generation) {
            debug!(speaker = %key, generation, "discarding transcript for reclaimed task");
            return TaskState::Done;
        }
        self.hook.on_transcript(key, &text).await;

        TaskState::Done
    }

    /// Records a stage transition if the task is still registered.
    ///
    /// Returns false when the slot was reclaimed (watchdog fired); the
    /// pipeline stops doing further work in that case.
    fn advance(&self, key: SpeakerKey, generation: u64, state: TaskState) -> bool {
        let mut registry = self.registry.lock().expect("registry poisoned");
        match registry.in_flight.get_mut(&key) {
            Some(task) if task.generation == generation => {
                task.state = state;
                true
            }
            _ => false,
        }
    }

    fn is_live(&self, key: SpeakerKey, generation: u64) -> bool {
        let registry = self.registry.lock().expect("registry poisoned");
        matches!(
            registry.in_flight.get(&key),
            Some(task) if task.generation == generation
        )
    }

    /// Single cleanup point for every terminal transition.
    ///
    /// Frees the accounting slot (when the generation still matches) and
    /// releases scratch files. Late completions after a timeout only do
    /// the idempotent scratch release.
    fn finish(&self, key: SpeakerKey, generation: u64, scratch: &TaskScratch, state: TaskState) {
        let removed = {
            let mut registry = self.registry.lock().expect("registry poisoned");
            let owns_slot = registry
                .in_flight
                .get(&key)
                .is_some_and(|task| task.generation == generation);
            if owns_slot {
                registry.in_flight.remove(&key);
            }
            owns_slot
        };

        if removed {
            debug!(speaker = %key, generation, ?state, "capture task finished");
        } else {
            debug!(
                speaker = %key,
                generation,
                "late completion against reclaimed slot, ignoring"
            );
        }

        self.scratch.release(scratch);
    }

    /// Watchdog path: reclaims the slot for a task that outlived its
    /// timeout. Does not interrupt in-flight native work; the pipeline's
    /// eventual completion becomes a no-op.
    fn expire(&self, key: SpeakerKey, generation: u64) {
        let expired = {
            let mut registry = self.registry.lock().expect("registry poisoned");
            let still_running = registry
                .in_flight
                .get(&key)
                .is_some_and(|task| task.generation == generation && !task.state.is_terminal());
            if still_running {
                registry.in_flight.remove(&key)
            } else {
                None
            }
        };

        if let Some(task) = expired {
            info!(
                speaker = %key,
                generation,
                last_state = ?task.state,
                "task timed out, reclaiming slot"
            );
            self.scratch.release(&task.scratch);
        }
    }
}
