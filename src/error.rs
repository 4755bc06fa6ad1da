//! Error types for the co-host gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the co-host gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Push-to-talk capture error
    #[error("capture error: {0}")]
    Capture(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Reply backend error
    #[error("backend error: {0}")]
    Backend(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// Gamestate ingest error (malformed payload)
    #[error("ingest error: {0}")]
    Ingest(String),

    /// A pipeline stage exceeded its timeout
    #[error("stage timed out: {0}")]
    StageTimeout(&'static str),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
