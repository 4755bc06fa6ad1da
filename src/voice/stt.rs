//! Speech-to-text transcription

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

/// Response from the OpenAI Whisper transcription API
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Converts captured audio bytes to text
///
/// The engine behind this trait is pluggable and potentially slow
/// (seconds-scale); the pipeline wraps calls in its stage timeout.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio bytes to text
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// OpenAI Whisper API transcription
#[derive(Debug)]
pub struct WhisperApi {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl WhisperApi {
    /// Create a Whisper API transcriber
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the API key is empty.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperApi {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Stt(format!("Whisper request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Stt(format!("failed to parse Whisper response: {e}")))?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_a_config_error() {
        let err = WhisperApi::new(String::new(), "whisper-1".to_string()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn empty_audio_short_circuits() {
        let stt = WhisperApi::new("key".to_string(), "whisper-1".to_string()).unwrap();
        assert_eq!(stt.transcribe(&[]).await.unwrap(), "");
    }
}
