//! Text-to-speech synthesis
//!
//! Two vendors behind one trait: ElevenLabs (the house voice) and OpenAI.
//! Both return MP3 bytes; the streaming variant pulls chunks off the wire as
//! they arrive so first-byte latency is not paid twice.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use crate::config::SpeechConfig;
use crate::{Error, Result};

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1";

/// Synthesizes one reply to speech audio
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` to MP3 bytes via the buffered endpoint
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Synthesize `text` via the vendor's streaming endpoint, collecting
    /// chunks as they arrive
    ///
    /// Falls back to the buffered endpoint for vendors without one.
    async fn synthesize_streaming(&self, text: &str) -> Result<Vec<u8>> {
        self.synthesize(text).await
    }
}

/// ElevenLabs text-to-speech client
pub struct ElevenLabs {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
    stability: f32,
    similarity_boost: f32,
    speed: Option<f32>,
    optimize_streaming_latency: Option<u8>,
}

impl ElevenLabs {
    /// Build a client from the speech configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the API key or voice id is missing.
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let api_key = config
            .elevenlabs_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("ElevenLabs API key required for TTS".to_string()))?;
        let voice_id = config
            .voice_id
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("ElevenLabs voice id required for TTS".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id,
            model_id: config.model_id.clone(),
            stability: config.stability,
            similarity_boost: config.similarity_boost,
            speed: config.speed,
            optimize_streaming_latency: config.optimize_streaming_latency,
        })
    }

    fn payload(&self, text: &str) -> Value {
        let mut voice_settings = serde_json::json!({
            "stability": self.stability,
            "similarity_boost": self.similarity_boost,
            "use_speaker_boost": true,
        });
        if let Some(speed) = self.speed {
            voice_settings["speed"] = speed.into();
        }

        let mut payload = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": voice_settings,
            "output_format": "mp3_44100_128",
        });
        if let Some(latency) = self.optimize_streaming_latency {
            payload["optimize_streaming_latency"] = latency.into();
        }
        payload
    }

    async fn request(&self, text: &str, stream: bool) -> Result<reqwest::Response> {
        let mut endpoint = format!("{ELEVENLABS_API_BASE}/text-to-speech/{}", self.voice_id);
        if stream {
            endpoint.push_str("/stream");
        }

        let response = self
            .client
            .post(&endpoint)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&self.payload(text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs error {status}: {body}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl Synthesizer for ElevenLabs {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let response = self.request(text, false).await?;
        let audio = response.bytes().await?;

        tracing::debug!(bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }

    async fn synthesize_streaming(&self, text: &str) -> Result<Vec<u8>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let response = self.request(text, true).await?;

        let mut audio = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Tts(format!("ElevenLabs stream error: {e}")))?;
            audio.extend_from_slice(&chunk);
        }

        tracing::debug!(bytes = audio.len(), "streaming synthesis complete");
        Ok(audio)
    }
}

/// OpenAI text-to-speech client
pub struct OpenAiTts {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    model: String,
}

impl OpenAiTts {
    /// Create an OpenAI TTS client
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the API key is empty.
    pub fn new(api_key: String, voice: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            model,
        })
    }
}

#[async_trait]
impl Synthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}
