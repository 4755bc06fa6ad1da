//! TOML configuration file loading
//!
//! Supports `~/.config/leviathan/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CohostConfigFile {
    /// Brain (LLM) configuration
    #[serde(default)]
    pub brain: BrainFileConfig,

    /// Speech synthesis and playback configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Overlay server configuration
    #[serde(default)]
    pub overlay: OverlayFileConfig,

    /// Gamestate log configuration
    #[serde(default)]
    pub gamestate: GamestateFileConfig,
}

/// Brain-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct BrainFileConfig {
    /// Reply provider ("ollama", "openai", "persona")
    pub provider: Option<String>,

    /// Ollama model identifier (e.g. "llama3:8b")
    pub ollama_model: Option<String>,

    /// Ollama server base URL
    pub ollama_url: Option<String>,

    /// OpenAI chat model identifier (e.g. "gpt-4o-mini")
    pub openai_model: Option<String>,
}

/// Speech synthesis and playback configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// TTS provider ("elevenlabs" or "openai")
    pub tts_provider: Option<String>,

    /// ElevenLabs voice identifier
    pub voice_id: Option<String>,

    /// ElevenLabs model identifier
    pub model_id: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Playback volume (0.0 - 2.0)
    pub volume: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Overlay server configuration
#[derive(Debug, Default, Deserialize)]
pub struct OverlayFileConfig {
    /// Host to bind (default 127.0.0.1)
    pub host: Option<String>,

    /// Port to bind (default 5005)
    pub port: Option<u16>,

    /// Static assets directory override
    pub static_dir: Option<String>,

    /// Overlay font size in px
    pub font_size: Option<u32>,
}

/// Gamestate log configuration
#[derive(Debug, Default, Deserialize)]
pub struct GamestateFileConfig {
    /// Path to the NDJSON event log
    pub log_path: Option<String>,

    /// Watcher poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `CohostConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> CohostConfigFile {
    let Some(path) = config_file_path() else {
        return CohostConfigFile::default();
    };

    if !path.exists() {
        return CohostConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                CohostConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            CohostConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/leviathan/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("leviathan").join("config.toml"))
}
