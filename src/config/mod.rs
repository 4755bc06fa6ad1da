//! Configuration management for the co-host gateway
//!
//! Resolution order is env > config file > default. Everything is read once
//! at startup; missing required keys for the *selected* backend fail fast
//! with a descriptive error instead of silently falling back.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default overlay server port
pub const DEFAULT_OVERLAY_PORT: u16 = 5005;

/// Default watcher poll interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default per-stage timeout for transcription/reply/synthesis calls
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;

/// Default maximum push-to-talk recording window
pub const DEFAULT_MAX_RECORD_SECS: u64 = 30;

/// Reply backend selection, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainProvider {
    /// Local Ollama server
    Ollama,
    /// OpenAI chat completions
    OpenAi,
    /// Deterministic persona quips, no network
    Persona,
}

impl BrainProvider {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            // "local" is the historical alias for the Ollama-backed default
            "ollama" | "local" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "persona" | "none" => Ok(Self::Persona),
            other => Err(Error::Config(format!(
                "unknown LLM_PROVIDER {other:?} (expected ollama, openai, or persona)"
            ))),
        }
    }
}

impl std::fmt::Display for BrainProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
            Self::Persona => write!(f, "persona"),
        }
    }
}

/// TTS provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    ElevenLabs,
    OpenAi,
}

/// Brain (reply generation) configuration
#[derive(Debug, Clone)]
pub struct BrainConfig {
    /// Selected provider
    pub provider: BrainProvider,

    /// Ollama model identifier
    pub ollama_model: String,

    /// Ollama server base URL
    pub ollama_url: String,

    /// OpenAI chat model identifier
    pub openai_model: String,

    /// OpenAI API key (required when provider is OpenAi)
    pub openai_api_key: Option<String>,
}

/// Speech (STT/TTS/playback) configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// TTS provider
    pub tts_provider: TtsProvider,

    /// ElevenLabs API key
    pub elevenlabs_api_key: Option<String>,

    /// ElevenLabs voice identifier
    pub voice_id: Option<String>,

    /// ElevenLabs model identifier
    pub model_id: String,

    /// Voice stability (0.0 - 1.0)
    pub stability: f32,

    /// Voice similarity boost (0.0 - 1.0)
    pub similarity_boost: f32,

    /// Speech rate multiplier (1.0 is neutral)
    pub speed: Option<f32>,

    /// Streaming latency optimization level (0-4, lower is lower latency)
    pub optimize_streaming_latency: Option<u8>,

    /// OpenAI API key (shared with STT and the OpenAI TTS provider)
    pub openai_api_key: Option<String>,

    /// OpenAI STT model (Whisper)
    pub stt_model: String,

    /// Playback volume, clamped to 0.0 - 2.0 at playback time
    pub volume: Option<f32>,
}

/// Overlay server configuration
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Host to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Optional static assets directory (falls back to the embedded page)
    pub static_dir: Option<PathBuf>,

    /// Overlay font size in px
    pub font_size: u32,
}

/// Gamestate log and watcher configuration
#[derive(Debug, Clone)]
pub struct GamestateConfig {
    /// Path to the append-only NDJSON event log
    pub log_path: PathBuf,

    /// Watcher poll interval
    pub poll_interval: Duration,
}

/// Fully resolved gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub brain: BrainConfig,
    pub speech: SpeechConfig,
    pub overlay: OverlayConfig,
    pub gamestate: GamestateConfig,

    /// Per-stage timeout for transcribe/reply/synthesize calls
    pub stage_timeout: Duration,

    /// Maximum push-to-talk recording window
    pub max_record: Duration,
}

impl Config {
    /// Load configuration from the environment and the optional config file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a required key for the selected backend
    /// is missing or a value cannot be parsed.
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let provider = std::env::var("LLM_PROVIDER")
            .ok()
            .or(fc.brain.provider)
            .map_or(Ok(BrainProvider::Persona), |s| BrainProvider::parse(&s))?;

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai);

        let brain = BrainConfig {
            provider,
            ollama_model: std::env::var("OLLAMA_MODEL")
                .ok()
                .or(fc.brain.ollama_model)
                .unwrap_or_else(|| "llama3:8b".to_string()),
            ollama_url: std::env::var("OLLAMA_URL")
                .ok()
                .or(fc.brain.ollama_url)
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            openai_model: std::env::var("OPENAI_LLM_MODEL")
                .ok()
                .or(fc.brain.openai_model)
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_api_key: openai_api_key.clone(),
        };

        let tts_provider = match std::env::var("TTS_PROVIDER")
            .ok()
            .or(fc.speech.tts_provider)
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("elevenlabs") => TtsProvider::ElevenLabs,
            Some("openai") => TtsProvider::OpenAi,
            Some(other) => {
                return Err(Error::Config(format!(
                    "unknown TTS_PROVIDER {other:?} (expected elevenlabs or openai)"
                )));
            }
        };

        let speech = SpeechConfig {
            tts_provider,
            elevenlabs_api_key: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .or(fc.api_keys.elevenlabs),
            voice_id: std::env::var("ELEVENLABS_VOICE_ID").ok().or(fc.speech.voice_id),
            model_id: std::env::var("ELEVENLABS_MODEL_ID")
                .ok()
                .or(fc.speech.model_id)
                .unwrap_or_else(|| "eleven_multilingual_v2".to_string()),
            stability: optional_parse("ELEVENLABS_VOICE_STABILITY")?.unwrap_or(0.35),
            similarity_boost: optional_parse("ELEVENLABS_VOICE_SIMILARITY")?.unwrap_or(0.7),
            speed: optional_parse("ELEVENLABS_VOICE_SPEED")?,
            optimize_streaming_latency: optional_parse("ELEVENLABS_OPTIMIZE_STREAMING_LATENCY")?,
            openai_api_key,
            stt_model: std::env::var("OPENAI_STT_MODEL")
                .ok()
                .or(fc.speech.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            volume: optional_parse::<f32>("TTS_PLAYBACK_VOLUME")?.or(fc.speech.volume),
        };

        let overlay = OverlayConfig {
            host: std::env::var("LEVIATHAN_OVERLAY_HOST")
                .ok()
                .or(fc.overlay.host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: optional_parse("LEVIATHAN_OVERLAY_PORT")?
                .or(fc.overlay.port)
                .unwrap_or(DEFAULT_OVERLAY_PORT),
            static_dir: std::env::var("LEVIATHAN_STATIC_DIR")
                .ok()
                .or(fc.overlay.static_dir)
                .map(PathBuf::from),
            font_size: optional_parse("LEVIATHAN_OVERLAY_FONT_SIZE")?
                .or(fc.overlay.font_size)
                .unwrap_or(30),
        };

        let gamestate = GamestateConfig {
            log_path: std::env::var("LEVIATHAN_GAMESTATE_LOG")
                .ok()
                .or(fc.gamestate.log_path)
                .map_or_else(default_gamestate_log_path, PathBuf::from),
            poll_interval: Duration::from_millis(
                optional_parse("LEVIATHAN_POLL_INTERVAL_MS")?
                    .or(fc.gamestate.poll_interval_ms)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        };

        Ok(Self {
            brain,
            speech,
            overlay,
            gamestate,
            stage_timeout: Duration::from_secs(
                optional_parse("LEVIATHAN_STAGE_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS),
            ),
            max_record: Duration::from_secs(
                optional_parse("LEVIATHAN_MAX_RECORD_SECS")?.unwrap_or(DEFAULT_MAX_RECORD_SECS),
            ),
        })
    }

    /// Validate that the selected backends have the credentials they need
    ///
    /// Called once at startup. Runtime call failures still fall back (brain →
    /// persona, playback → temp file); a deliberately selected backend with
    /// missing config is a startup error instead.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the missing key.
    pub fn validate(&self, speech_enabled: bool) -> Result<()> {
        if self.brain.provider == BrainProvider::OpenAi && self.brain.openai_api_key.is_none() {
            return Err(Error::Config(
                "LLM_PROVIDER=openai requires OPENAI_API_KEY".to_string(),
            ));
        }

        if speech_enabled {
            match self.speech.tts_provider {
                TtsProvider::ElevenLabs => {
                    if self.speech.elevenlabs_api_key.is_none() {
                        return Err(Error::Config(
                            "ElevenLabs TTS requires ELEVENLABS_API_KEY".to_string(),
                        ));
                    }
                    if self.speech.voice_id.is_none() {
                        return Err(Error::Config(
                            "ElevenLabs TTS requires ELEVENLABS_VOICE_ID".to_string(),
                        ));
                    }
                }
                TtsProvider::OpenAi => {
                    if self.speech.openai_api_key.is_none() {
                        return Err(Error::Config(
                            "TTS_PROVIDER=openai requires OPENAI_API_KEY".to_string(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Parse an optional env var, erroring on unparseable values
fn optional_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("invalid value for {key}: {raw:?}"))),
        Err(_) => Ok(None),
    }
}

/// Default gamestate log path: `~/.local/share/leviathan/gamestate.ndjson`
fn default_gamestate_log_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("gamestate.ndjson"),
        |d| d.data_dir().join("leviathan").join("gamestate.ndjson"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parse_accepts_aliases() {
        assert_eq!(BrainProvider::parse("ollama").unwrap(), BrainProvider::Ollama);
        assert_eq!(BrainProvider::parse("local").unwrap(), BrainProvider::Ollama);
        assert_eq!(BrainProvider::parse("OpenAI").unwrap(), BrainProvider::OpenAi);
        assert_eq!(BrainProvider::parse("persona").unwrap(), BrainProvider::Persona);
        assert!(BrainProvider::parse("cohere").is_err());
    }

    #[test]
    fn openai_brain_without_key_fails_validation() {
        let config = test_config(BrainProvider::OpenAi, None);
        let err = config.validate(false).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn elevenlabs_without_voice_id_fails_when_speaking() {
        let mut config = test_config(BrainProvider::Persona, None);
        config.speech.elevenlabs_api_key = Some("key".to_string());
        config.speech.voice_id = None;
        let err = config.validate(true).unwrap_err();
        assert!(err.to_string().contains("ELEVENLABS_VOICE_ID"));
    }

    #[test]
    fn persona_brain_muted_needs_no_keys() {
        let config = test_config(BrainProvider::Persona, None);
        assert!(config.validate(false).is_ok());
    }

    fn test_config(provider: BrainProvider, openai_key: Option<String>) -> Config {
        Config {
            brain: BrainConfig {
                provider,
                ollama_model: "llama3:8b".to_string(),
                ollama_url: "http://localhost:11434".to_string(),
                openai_model: "gpt-4o-mini".to_string(),
                openai_api_key: openai_key.clone(),
            },
            speech: SpeechConfig {
                tts_provider: TtsProvider::ElevenLabs,
                elevenlabs_api_key: None,
                voice_id: None,
                model_id: "eleven_multilingual_v2".to_string(),
                stability: 0.35,
                similarity_boost: 0.7,
                speed: None,
                optimize_streaming_latency: None,
                openai_api_key: openai_key,
                stt_model: "whisper-1".to_string(),
                volume: None,
            },
            overlay: OverlayConfig {
                host: "127.0.0.1".to_string(),
                port: DEFAULT_OVERLAY_PORT,
                static_dir: None,
                font_size: 30,
            },
            gamestate: GamestateConfig {
                log_path: PathBuf::from("/tmp/gamestate.ndjson"),
                poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            },
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            max_record: Duration::from_secs(DEFAULT_MAX_RECORD_SECS),
        }
    }
}
