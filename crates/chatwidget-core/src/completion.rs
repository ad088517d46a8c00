use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::CompletionSettings;
use crate::state::Message;

/// History entries forwarded as conversation context.
pub const CONTEXT_MESSAGES: usize = 5;

/// System message used when the corpus carries no instructions.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion timed out after {after_ms}ms")]
    Timeout { after_ms: u128 },
    #[error("completion request failed: {0}")]
    Network(String),
    #[error("completion service error {status}: {body}")]
    Service { status: u16, body: String },
    #[error("completion response could not be read: {0}")]
    Malformed(String),
    #[error("completion service returned no text")]
    EmptyResponse,
}

/// Anything that can answer a message the corpus could not.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        instructions: &str,
        recent: &[Message],
        user_message: &str,
        timeout: Duration,
    ) -> Result<String, CompletionError>;
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionResponseMessage,
}

#[derive(Deserialize)]
struct CompletionResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// Chat-completion client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(settings: &CompletionSettings) -> Self {
        Self {
            client: Client::new(),
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    async fn send(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Service {
                status: status.as_u16(),
                body: text,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(
        &self,
        instructions: &str,
        recent: &[Message],
        user_message: &str,
        timeout: Duration,
    ) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: build_messages(instructions, recent, user_message),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        // dropping the request future aborts the connection
        match tokio::time::timeout(timeout, self.send(&request)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout {
                after_ms: timeout.as_millis(),
            }),
        }
    }
}

/// System prompt, then the last few turns, then the current message.
pub fn build_messages(
    instructions: &str,
    recent: &[Message],
    user_message: &str,
) -> Vec<CompletionMessage> {
    let system = if instructions.trim().is_empty() {
        DEFAULT_SYSTEM_PROMPT
    } else {
        instructions
    };

    let start = recent.len().saturating_sub(CONTEXT_MESSAGES);
    let mut messages = Vec::with_capacity(CONTEXT_MESSAGES + 2);
    messages.push(CompletionMessage {
        role: "system".to_string(),
        content: system.to_string(),
    });
    messages.extend(recent[start..].iter().map(|m| CompletionMessage {
        role: m.sender.role().to_string(),
        content: m.text.clone(),
    }));
    messages.push(CompletionMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
    });
    messages
}
