//! Reply generation: the co-host's brain
//!
//! One capability interface ([`ReplyEngine`]) over a closed set of backends
//! selected once at startup: a local Ollama server, OpenAI chat completions,
//! or the deterministic persona quip generator. A backend failure at call
//! time falls back to the persona reply as an explicit second hop, never an
//! implicit retry.

mod persona;

pub use persona::persona_reply;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{BrainConfig, BrainProvider};
use crate::{Error, Result};

/// System prompt for the LLM-backed co-host voice
const SYSTEM_PROMPT: &str = "You are Leviathan, a high-energy human co-host \
(the dragon look is visual only; do not roleplay it unless asked).\n\
- On-camera: keep the volley moving, avoid dead air; default to 1-2 sentences.\n\
- Useful first, playful second: answer directly, give a next step or take, \
then a quick wit if there's room.\n\
- Tone: lively, clever, grounded; no pet names, no fantasy theatrics.\n\
- Humor: timely and on-topic; include names and events verbatim; tease \
lightly, stay constructive.\n\
- Deliver one cohesive response; avoid double-takes or follow-ups.";

/// Generates one short reply for an operator request
///
/// Implementors must be `Send + Sync` so the pipeline can hold them behind
/// an `Arc<dyn ReplyEngine>`.
#[async_trait]
pub trait ReplyEngine: Send + Sync {
    /// Produce a reply for `text`, optionally seasoned with `context`
    async fn reply(&self, text: &str, context: Option<&str>) -> Result<String>;
}

/// The configured brain: selected backend plus the persona fallback
pub struct Brain {
    client: reqwest::Client,
    config: BrainConfig,
}

impl Brain {
    /// Create a brain for the configured provider
    #[must_use]
    pub fn new(config: BrainConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// The provider this brain was resolved to at startup
    #[must_use]
    pub fn provider(&self) -> BrainProvider {
        self.config.provider
    }

    async fn ollama_chat(&self, text: &str, context: Option<&str>) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.ollama_model,
            "prompt": build_prompt(text, context),
            "system": SYSTEM_PROMPT,
            "stream": false,
        });

        let url = format!("{}/api/generate", self.config.ollama_url);
        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!("Ollama error {status}: {body}")));
        }

        let parsed: Value = response.json().await?;
        let reply = parsed
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        if reply.is_empty() {
            return Err(Error::Backend("Ollama returned an empty reply".to_string()));
        }

        Ok(reply)
    }

    async fn openai_chat(&self, text: &str, context: Option<&str>) -> Result<String> {
        let api_key = self
            .config
            .openai_api_key
            .as_deref()
            .ok_or_else(|| Error::Backend("OPENAI_API_KEY is not set".to_string()))?;

        let body = serde_json::json!({
            "model": self.config.openai_model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(text, context) },
            ],
            "temperature": 0.6,
            "max_tokens": 120,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!("OpenAI chat error {status}: {body}")));
        }

        let parsed: Value = response.json().await?;
        let reply = parsed["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();

        if reply.is_empty() {
            return Err(Error::Backend("OpenAI returned an empty reply".to_string()));
        }

        Ok(reply)
    }
}

#[async_trait]
impl ReplyEngine for Brain {
    /// Generate a reply via the configured backend
    ///
    /// Backend failures are downgraded to the deterministic persona line, so
    /// this implementation only errors when the persona path itself is
    /// unreachable (it is not); callers still get `Result` for mock
    /// engines that do fail.
    async fn reply(&self, text: &str, context: Option<&str>) -> Result<String> {
        let attempt = match self.config.provider {
            BrainProvider::Ollama => self.ollama_chat(text, context).await,
            BrainProvider::OpenAi => self.openai_chat(text, context).await,
            BrainProvider::Persona => return Ok(persona_reply(text, context)),
        };

        match attempt {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::warn!(
                    provider = %self.config.provider,
                    error = %e,
                    "reply backend failed, falling back to persona"
                );
                Ok(persona_reply(text, context))
            }
        }
    }
}

/// Frame the operator request for the LLM backends
fn build_prompt(text: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => format!(
            "Request: {text}\nContext: {ctx}\nProvide one cohesive reply. Keep it concise."
        ),
        _ => format!("Request: {text}\nProvide one cohesive reply. Keep it concise."),
    }
}
