//! Composition root.
//!
//! Wires the moderation pipeline together from configuration plus the
//! three external collaborators: the voice gateway, the enforcement
//! implementation, and a loaded transcriber.

use crate::config::Config;
use crate::enhance::{Enhancer, FfmpegEnhancer, FilterChain, NoopEnhancer};
use crate::error::Result;
use crate::gateway::{SessionMonitor, VoiceEvent, VoiceGateway};
use crate::moderation::cooldown::CooldownMap;
use crate::moderation::enforce::Enforcer;
use crate::moderation::hook::TranscriptHook;
use crate::moderation::matcher::WordSetMatcher;
use crate::scheduler::CaptureScheduler;
use crate::scratch::ScratchStore;
use crate::stt::queue::RecognitionQueue;
use crate::stt::transcriber::Transcriber;
use std::sync::Arc;
use tracing::info;

/// Assembled moderation pipeline.
///
/// Holds the long-lived shared state: the scheduler, the session monitor,
/// the mutable term set and the cooldown map.
pub struct Warden {
    scheduler: CaptureScheduler,
    monitor: SessionMonitor,
    matcher: Arc<WordSetMatcher>,
}

impl Warden {
    /// Builds the pipeline from configuration and collaborators.
    pub fn build(
        config: &Config,
        gateway: Arc<dyn VoiceGateway>,
        enforcer: Arc<dyn Enforcer>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Result<Self> {
        let scratch = match &config.scratch.dir {
            Some(dir) => Arc::new(ScratchStore::at(dir)?),
            None => Arc::new(ScratchStore::temporary()?),
        };

        let matcher = Arc::new(WordSetMatcher::new(&config.moderation.terms));
        let cooldowns = Arc::new(CooldownMap::new(config.cooldown()));
        let hook = Arc::new(TranscriptHook::new(
            matcher.clone(),
            enforcer,
            cooldowns.clone(),
        ));

        let enhancer: Arc<dyn Enhancer> = if config.enhance.enabled {
            Arc::new(
                FfmpegEnhancer::new(FilterChain::speech_default()).with_bin(&config.enhance.bin),
            )
        } else {
            Arc::new(NoopEnhancer::new())
        };

        let recognition = RecognitionQueue::start(transcriber);

        let scheduler = CaptureScheduler::new(
            config.scheduler_config(),
            gateway,
            enhancer,
            recognition,
            hook,
            scratch,
            cooldowns.clone(),
        );

        info!(
            max_concurrent = config.scheduler.max_concurrent,
            terms = config.moderation.terms.len(),
            enhance = config.enhance.enabled,
            "moderation pipeline assembled"
        );

        Ok(Self {
            monitor: SessionMonitor::new(scheduler.clone(), cooldowns),
            scheduler,
            matcher,
        })
    }

    /// Feeds one gateway event into the pipeline.
    pub async fn handle_event(&self, event: VoiceEvent) {
        self.monitor.handle_event(event).await;
    }

    /// The mutable moderation term set.
    pub fn matcher(&self) -> &Arc<WordSetMatcher> {
        &self.matcher
    }

    /// Number of capture tasks currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.scheduler.in_flight_count()
    }
}
