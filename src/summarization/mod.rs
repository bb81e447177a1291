//! Abstractive summaries via a hosted chat-completion API.
//!
//! The OpenAI-backed client issues a single chat completion per document. Callers bound the text
//! they pass in; this layer only wraps it in the summarization prompt.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes documents.";

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider could not be reached or the client could not be built.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Produce a natural-language summary of `text`.
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError>;
}

/// Chat-completions client for OpenAI and API-compatible providers.
pub struct OpenAiSummarizationClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizationClient {
    /// Build a client against `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SummarizationClientError> {
        let mut builder = Client::builder().user_agent("docsum/summary");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build a client from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        Self::new(
            config.openai_base_url.clone(),
            config.chatgpt_api_key.clone(),
            config.summary_model.clone(),
            config.summary_timeout_secs.map(Duration::from_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl SummarizationClient for OpenAiSummarizationClient {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("Summarize this document:\n{text}") },
            ],
        });

        tracing::debug!(model = %self.model, chars = text.chars().count(), "Requesting summary");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode chat completion: {error}"
            ))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("response contained no choices".into())
            })
    }
}
