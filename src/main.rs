use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use voxwarden::app::Warden;
use voxwarden::cli::{Cli, Commands, ConfigAction};
use voxwarden::config::Config;
use voxwarden::gateway::{ScriptedGateway, ScriptedStream, SpeakerKey, VoiceEvent};
use voxwarden::moderation::enforce::MockEnforcer;
use voxwarden::stt::transcriber::{MockTranscriber, Transcriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.quiet, cli.verbose);

    let config = load_config(cli.config.as_deref())?.with_env_overrides();

    match cli.command {
        Commands::Simulate {
            wav,
            term,
            transcript,
            task_timeout,
            no_enhance,
        } => {
            run_simulation(config, &wav, term, &transcript, task_timeout, no_enhance).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Path => {
                println!("{}", Config::default_path().display());
            }
        },
    }

    Ok(())
}

fn init_logging(quiet: bool, verbosity: u8) {
    let default_filter = if quiet {
        "voxwarden=error"
    } else {
        match verbosity {
            0 => "voxwarden=info",
            1 => "voxwarden=debug",
            _ => "debug",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Config::load_or_default(&Config::default_path()),
    }
}

/// Feeds one WAV fixture through the assembled pipeline as a single
/// speaker's utterance and reports what the pipeline did with it.
async fn run_simulation(
    mut config: Config,
    wav: &Path,
    terms: Vec<String>,
    transcript: &str,
    task_timeout: Option<Duration>,
    no_enhance: bool,
) -> Result<()> {
    let (samples, sample_rate, channels) = read_wav(wav)?;

    // The fixture defines the source layout for this run.
    config.audio.sample_rate = sample_rate;
    config.audio.channels = channels;
    if !terms.is_empty() {
        config.moderation.terms = terms;
    }
    if let Some(timeout) = task_timeout {
        config.scheduler.task_timeout_secs = timeout.as_secs().max(1);
    }
    if no_enhance {
        config.enhance.enabled = false;
    }

    let gateway = Arc::new(ScriptedGateway::new());
    let enforcer = Arc::new(MockEnforcer::new());
    let transcriber = build_transcriber(&config, transcript)?;

    let warden = Warden::build(&config, gateway.clone(), enforcer.clone(), transcriber)?;

    let key = SpeakerKey::new(1, 1);
    gateway.push_stream(
        key,
        ScriptedStream::from_pcm_samples(&samples, sample_rate, channels, 20),
    );

    warden.handle_event(VoiceEvent::SpeakerJoined(key)).await;
    warden.handle_event(VoiceEvent::SpeakerStarted(key)).await;

    // Wait for the single task to drain.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(120);
    while warden.in_flight_count() > 0 {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("simulation did not finish within 120s");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let calls = enforcer.calls();
    if calls.is_empty() {
        println!("no enforcement triggered");
    } else {
        for (speaker, terms) in calls {
            println!("enforced speaker {} for terms: {}", speaker, terms.join(", "));
        }
    }

    Ok(())
}

fn read_wav(path: &Path) -> Result<(Vec<i16>, u32, u16)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open WAV fixture {}", path.display()))?;
    let spec = reader.spec();
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read WAV samples")?;
    Ok((samples, spec.sample_rate, spec.channels))
}

#[cfg(feature = "whisper")]
fn build_transcriber(config: &Config, fallback_transcript: &str) -> Result<Arc<dyn Transcriber>> {
    use voxwarden::stt::whisper::{WhisperConfig, WhisperTranscriber};

    let model_path = std::path::PathBuf::from(format!("models/ggml-{}.bin", config.stt.model));
    match WhisperTranscriber::new(WhisperConfig {
        model_path,
        language: config.stt.language.clone(),
        threads: None,
    }) {
        Ok(whisper) => Ok(Arc::new(whisper)),
        Err(e) => {
            tracing::warn!(error = %e, "whisper unavailable, using mock transcriber");
            Ok(Arc::new(
                MockTranscriber::new("mock").with_response(fallback_transcript),
            ))
        }
    }
}

#[cfg(not(feature = "whisper"))]
fn build_transcriber(_config: &Config, fallback_transcript: &str) -> Result<Arc<dyn Transcriber>> {
    Ok(Arc::new(
        MockTranscriber::new("mock").with_response(fallback_transcript),
    ))
}
