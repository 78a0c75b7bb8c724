//! Language model access used by LLM classification and field extraction.
//!
//! The Ollama-backed client issues non-streaming `/api/generate` requests directly over HTTP.
//! When no provider is configured an [`UnavailableModel`] is wired instead, so every call
//! fails fast and the failure is folded into the caller's result.

use crate::config::{Config, LlmProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while calling a language model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Language model unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Language model request failed: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed language model response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by text-completion backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`, producing at most roughly `max_tokens` tokens.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// Build the language model configured for this process.
pub fn build_language_model(config: &Config) -> Arc<dyn LanguageModel> {
    match config.llm_provider {
        LlmProvider::None => Arc::new(UnavailableModel),
        LlmProvider::Ollama => Arc::new(OllamaModel::new(
            config.ollama_url.clone(),
            config.llm_model.clone(),
        )),
    }
}

/// Placeholder used when no language model is configured.
pub struct UnavailableModel;

#[async_trait]
impl LanguageModel for UnavailableModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        Err(LlmError::ProviderUnavailable(
            "no language model provider configured".into(),
        ))
    }
}

/// Ollama `/api/generate` client.
pub struct OllamaModel {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaModel {
    /// Create a client targeting `base_url` with the given model name.
    pub fn new(base_url: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("intakemcp/llm")
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "Falling back to default reqwest client");
                Client::new()
            });
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                // Classification and extraction both want deterministic output.
                "temperature": 0.0,
                "num_predict": max_tokens,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(LlmError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
