use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use leviathan_cohost::brain::Brain;
use leviathan_cohost::config::TtsProvider;
use leviathan_cohost::context::{ClipboardContext, ContextProvider, StaticContext};
use leviathan_cohost::hotkey::{HotkeyListener, parse_key};
use leviathan_cohost::pipeline::{self, TRIGGER_QUEUE_DEPTH, Trigger, TurnRunner};
use leviathan_cohost::voice::{
    AudioCapture, CpalPlayer, ElevenLabs, OpenAiTts, Player, Synthesizer, Transcriber, WhisperApi,
};
use leviathan_cohost::{AnnouncementWatcher, Config, GamestateLog, OverlayServer, OverlayStore};

/// Leviathan - voice co-host for live streams
#[derive(Parser)]
#[command(name = "leviathan", version, about)]
struct Cli {
    /// Feed text straight to the co-host and exit (bypasses capture)
    #[arg(long)]
    say: Option<String>,

    /// Fixed context string woven into replies
    #[arg(long)]
    context: Option<String>,

    /// Include current clipboard text as reply context
    #[arg(long)]
    use_clipboard: bool,

    /// Use the vendor's streaming synthesis endpoint
    #[arg(long)]
    stream: bool,

    /// Overlay only, no synthesis or playback
    #[arg(long)]
    mute: bool,

    /// Push-to-talk key (e.g. "ctrl", "f9", "space")
    #[arg(long, env = "LEVIATHAN_HOTKEY", default_value = "ctrl")]
    hotkey: String,

    /// Overlay server host
    #[arg(long, env = "LEVIATHAN_OVERLAY_HOST")]
    overlay_host: Option<String>,

    /// Overlay server port
    #[arg(long, env = "LEVIATHAN_OVERLAY_PORT")]
    overlay_port: Option<u16>,

    /// Overlay font size in px
    #[arg(long)]
    overlay_font_size: Option<u32>,

    /// Overlay static assets directory (defaults to the embedded page)
    #[arg(long, env = "LEVIATHAN_STATIC_DIR")]
    overlay_assets: Option<std::path::PathBuf>,

    /// Gamestate event log path (NDJSON)
    #[arg(long, env = "LEVIATHAN_GAMESTATE_LOG")]
    gamestate_log: Option<std::path::PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech synthesis output
    TestTts {
        /// Text to speak
        #[arg(default_value = "The abyss answers. This is a synthesis test.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => std::env::var("LOG_LEVEL")
            .map_or_else(|_| "info".to_string(), |l| l.to_lowercase()),
        1 => "info,leviathan_cohost=debug".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&text, cli.stream).await,
        };
    }

    let mut config = Config::load()?;
    apply_cli_overrides(&mut config, &cli);
    config.validate(!cli.mute)?;

    tracing::info!(
        brain = %config.brain.provider,
        overlay = format!("{}:{}", config.overlay.host, config.overlay.port),
        mute = cli.mute,
        "starting leviathan co-host"
    );

    let overlay = OverlayStore::new(config.overlay.font_size);
    let log = GamestateLog::open(&config.gamestate.log_path)?;
    tracing::info!(path = %log.path().display(), "gamestate log ready");

    // Bind before anything else so a busy port fails the whole startup
    let server = OverlayServer::new(overlay.clone(), log.clone(), config.overlay.clone());
    let _server_handle = server.spawn().await?;

    let runner = build_runner(&config, &cli, overlay)?;

    if let Some(text) = cli.say {
        // One-shot direct-text mode
        runner.run_turn(Trigger::DirectText(text)).await?;
        return Ok(());
    }

    let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE_DEPTH);

    let watcher = AnnouncementWatcher::new(log, trigger_tx, config.gamestate.poll_interval);
    tokio::spawn(watcher.run());

    match AudioCapture::new() {
        Ok(capture) => {
            let (hotkey_tx, hotkey_rx) = mpsc::channel(16);
            let key = parse_key(&cli.hotkey)?;
            let _listener = HotkeyListener::start(key, hotkey_tx);
            tracing::info!(hotkey = %cli.hotkey, "hold to record, release to transcribe");

            // The capture device lives on this task; cpal streams aren't Send
            pipeline::run_interactive(&runner, trigger_rx, hotkey_rx, capture, config.max_record)
                .await?;
        }
        Err(e) => {
            // No microphone is not fatal: announcements and /gamestate keep working
            tracing::warn!(error = %e, "no capture device, running announce-only");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
                () = runner.serve(trigger_rx) => {}
            }
        }
    }

    Ok(())
}

/// Fold CLI flags into the resolved configuration
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(host) = &cli.overlay_host {
        config.overlay.host.clone_from(host);
    }
    if let Some(port) = cli.overlay_port {
        config.overlay.port = port;
    }
    if let Some(font_size) = cli.overlay_font_size {
        config.overlay.font_size = font_size;
    }
    if let Some(dir) = &cli.overlay_assets {
        config.overlay.static_dir = Some(dir.clone());
    }
    if let Some(path) = &cli.gamestate_log {
        config.gamestate.log_path.clone_from(path);
    }
}

/// Assemble the turn runner from configuration
fn build_runner(config: &Config, cli: &Cli, overlay: OverlayStore) -> anyhow::Result<TurnRunner> {
    let brain = Arc::new(Brain::new(config.brain.clone()));
    let player: Arc<dyn Player> = Arc::new(CpalPlayer::new(config.speech.volume));

    let mut runner = TurnRunner::new(overlay, brain, player, config.stage_timeout)
        .with_streaming(cli.stream);

    if !cli.mute {
        runner = runner.with_synthesizer(build_synthesizer(config)?);
    }

    if let Some(api_key) = &config.speech.openai_api_key {
        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperApi::new(
            api_key.clone(),
            config.speech.stt_model.clone(),
        )?);
        runner = runner.with_transcriber(transcriber);
    } else {
        tracing::warn!("OPENAI_API_KEY not set: push-to-talk transcription unavailable");
    }

    let mut providers: Vec<Box<dyn ContextProvider>> = Vec::new();
    if let Some(context) = &cli.context {
        providers.push(Box::new(StaticContext(context.clone())));
    }
    if cli.use_clipboard {
        providers.push(Box::new(ClipboardContext));
    }
    if !providers.is_empty() {
        runner = runner.with_context_providers(providers);
    }

    Ok(runner)
}

/// Construct the configured synthesis backend
fn build_synthesizer(config: &Config) -> anyhow::Result<Arc<dyn Synthesizer>> {
    Ok(match config.speech.tts_provider {
        TtsProvider::ElevenLabs => Arc::new(ElevenLabs::from_config(&config.speech)?),
        TtsProvider::OpenAi => Arc::new(OpenAiTts::new(
            config.speech.openai_api_key.clone().unwrap_or_default(),
            "alloy".to_string(),
            "tts-1".to_string(),
        )?),
    })
}

/// Test microphone input with a level meter
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If the meter moved, your mic is working.");
    println!("If RMS stayed near 0, check your input device and levels.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_f32;
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let tone: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples...", tone.len());

    let player = CpalPlayer::new(None);
    player.play_raw(tone).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");

    Ok(())
}

/// Test speech synthesis end to end
async fn test_tts(text: &str, stream: bool) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    config.validate(true)?;

    let synthesizer = build_synthesizer(&config)?;

    println!("Synthesizing speech...");
    let mp3 = if stream {
        synthesizer.synthesize_streaming(text).await?
    } else {
        synthesizer.synthesize(text).await?
    };
    println!("Got {} bytes of audio data", mp3.len());

    println!("Playing audio...");
    let player = CpalPlayer::new(config.speech.volume);
    player.play(&mp3).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working.");

    Ok(())
}
