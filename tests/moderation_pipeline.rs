//! End-to-end pipeline tests over the public API: scripted gateway in,
//! mock enforcement out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use voxwarden::Result;
use voxwarden::app::Warden;
use voxwarden::config::Config;
use voxwarden::gateway::{ScriptedGateway, ScriptedStream, SpeakerKey, VoiceEvent};
use voxwarden::moderation::enforce::MockEnforcer;
use voxwarden::stt::transcriber::{MockTranscriber, Transcriber};

fn test_config() -> Config {
    let mut config = Config::default();
    // Fixtures are 16kHz mono PCM.
    config.audio.sample_rate = 16_000;
    config.audio.channels = 1;
    config.capture.trailing_silence_ms = 300;
    config.gate.min_bytes = 1000;
    config.gate.min_duration_ms = 100;
    config.gate.min_rms = 0.001;
    // No ffmpeg dependency in tests.
    config.enhance.enabled = false;
    config
}

fn speech_samples(duration_ms: u32) -> Vec<i16> {
    vec![3000i16; (16 * duration_ms) as usize]
}

fn silence_samples(duration_ms: u32) -> Vec<i16> {
    vec![0i16; (16 * duration_ms) as usize]
}

fn stream_of(samples: &[i16]) -> ScriptedStream {
    ScriptedStream::from_pcm_samples(samples, 16_000, 1, 20)
}

async fn drain(warden: &Warden) {
    for _ in 0..400 {
        if warden.in_flight_count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pipeline did not drain");
}

#[tokio::test(start_paused = true)]
async fn matched_term_enforces_and_cooldown_blocks_rejoin() {
    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let mut config = test_config();
    config.moderation.terms = vec!["touchdown".to_string()];

    let warden = Warden::build(
        &config,
        gateway.clone(),
        enforcer.clone(),
        Arc::new(MockTranscriber::new("mock").with_response("did you see that touchdown")),
    )
    .unwrap();

    let key = SpeakerKey::new(1, 42);
    // 3 seconds of speech
    gateway.push_stream(key, stream_of(&speech_samples(3000)));

    warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    drain(&warden).await;

    let calls = enforcer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, key);
    assert_eq!(calls[0].1, vec!["touchdown"]);

    // A start event inside the cooldown window must not spawn a task.
    gateway.push_stream(key, stream_of(&speech_samples(3000)));
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    assert_eq!(warden.in_flight_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn silent_segment_is_gated_and_never_reaches_the_hook() {
    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let mut config = test_config();
    config.moderation.terms = vec!["touchdown".to_string()];

    // If the hook ever ran, this transcript would enforce.
    let warden = Warden::build(
        &config,
        gateway.clone(),
        enforcer.clone(),
        Arc::new(MockTranscriber::new("mock").with_response("touchdown")),
    )
    .unwrap();

    let key = SpeakerKey::new(1, 7);
    // 2 seconds of pure silence: RMS ~ 0.
    gateway.push_stream(key, stream_of(&silence_samples(2000)));

    warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    drain(&warden).await;

    assert!(enforcer.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrency_ceiling_admits_exactly_three_of_five() {
    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let config = test_config();

    let warden = Warden::build(
        &config,
        gateway.clone(),
        enforcer.clone(),
        Arc::new(MockTranscriber::new("mock").with_response("clean")),
    )
    .unwrap();

    for speaker in 0..5 {
        let key = SpeakerKey::new(1, speaker);
        gateway.push_stream(key, stream_of(&speech_samples(1000)));
        warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    }
    for speaker in 0..5 {
        let key = SpeakerKey::new(1, speaker);
        warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    }

    // Five simultaneous start events, ceiling of three.
    assert_eq!(warden.in_flight_count(), 3);
    drain(&warden).await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_start_events_spawn_one_task() {
    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let mut config = test_config();
    config.moderation.terms = vec!["touchdown".to_string()];

    let warden = Warden::build(
        &config,
        gateway.clone(),
        enforcer.clone(),
        Arc::new(MockTranscriber::new("mock").with_response("touchdown")),
    )
    .unwrap();

    let key = SpeakerKey::new(1, 3);
    gateway.push_stream(key, stream_of(&speech_samples(1000)));

    warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    assert_eq!(warden.in_flight_count(), 1);
    drain(&warden).await;

    // Exactly one capture ran; the duplicate never subscribed.
    assert_eq!(enforcer.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unmonitored_speaker_start_is_ignored() {
    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());

    let warden = Warden::build(
        &test_config(),
        gateway.clone(),
        enforcer.clone(),
        Arc::new(MockTranscriber::new("mock")),
    )
    .unwrap();

    let key = SpeakerKey::new(1, 5);
    gateway.push_stream(key, stream_of(&speech_samples(1000)));

    // No SpeakerJoined first.
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    assert_eq!(warden.in_flight_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn recognition_never_runs_concurrently_across_speakers() {
    /// Transcriber that records its peak reentrancy.
    struct ReentrancyProbe {
        entries: AtomicU32,
        peak: AtomicU32,
    }

    impl Transcriber for ReentrancyProbe {
        fn transcribe(&self, _audio: &[i16]) -> Result<String> {
            let current = self.entries.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(25));
            self.entries.fetch_sub(1, Ordering::SeqCst);
            Ok("clean".to_string())
        }

        fn model_name(&self) -> &str {
            "probe"
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    let probe = Arc::new(ReentrancyProbe {
        entries: AtomicU32::new(0),
        peak: AtomicU32::new(0),
    });

    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let mut config = test_config();
    // Short utterances so all three tasks hit recognition close together.
    config.capture.trailing_silence_ms = 100;

    let warden = Warden::build(
        &config,
        gateway.clone(),
        enforcer.clone(),
        probe.clone() as Arc<dyn Transcriber>,
    )
    .unwrap();

    for speaker in 0..3 {
        let key = SpeakerKey::new(1, speaker);
        gateway.push_stream(key, stream_of(&speech_samples(400)));
        warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
        warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    }

    for _ in 0..400 {
        if warden.in_flight_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(warden.in_flight_count(), 0, "pipeline did not drain");

    assert_eq!(
        probe.peak.load(Ordering::SeqCst),
        1,
        "recognition resource was entered concurrently"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cooldown_expiry_readmits_exactly_once() {
    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let mut config = test_config();
    config.moderation.terms = vec!["touchdown".to_string()];
    config.moderation.cooldown_secs = 1;

    let warden = Warden::build(
        &config,
        gateway.clone(),
        enforcer.clone(),
        Arc::new(MockTranscriber::new("mock").with_response("touchdown")),
    )
    .unwrap();

    let key = SpeakerKey::new(1, 9);
    gateway.push_stream(key, stream_of(&speech_samples(500)));
    warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    drain(&warden).await;
    assert_eq!(enforcer.calls().len(), 1);

    // Inside the window: rejected.
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    assert_eq!(warden.in_flight_count(), 0);

    // After expiry: the next start event is admitted (exactly one task).
    tokio::time::sleep(Duration::from_millis(1200)).await;
    gateway.push_stream(key, stream_of(&speech_samples(500)));
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    assert_eq!(warden.in_flight_count(), 1);
    drain(&warden).await;
    assert_eq!(enforcer.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn speaker_leaving_clears_cooldown() {
    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let mut config = test_config();
    config.moderation.terms = vec!["touchdown".to_string()];
    config.moderation.cooldown_secs = 3600;

    let warden = Warden::build(
        &config,
        gateway.clone(),
        enforcer.clone(),
        Arc::new(MockTranscriber::new("mock").with_response("touchdown")),
    )
    .unwrap();

    let key = SpeakerKey::new(1, 11);
    gateway.push_stream(key, stream_of(&speech_samples(500)));
    warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    drain(&warden).await;
    assert_eq!(enforcer.calls().len(), 1);

    // Leave and rejoin: the hour-long cooldown must be gone.
    warden.handle_event(VoiceEvent::SpeakerLeft(key)).await;
    warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    gateway.push_stream(key, stream_of(&speech_samples(500)));
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;
    assert_eq!(warden.in_flight_count(), 1);
    drain(&warden).await;
}
