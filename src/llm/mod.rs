//! Chat-completion client: port trait, OpenAI-compatible HTTP
//! implementation, prompt templates, and mock.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod prompts;

pub use error::LlmError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockChatClient;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sampling options for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 256,
        }
    }
}

/// Port to the chat-completion model provider.
pub trait ChatClient: Send + Sync {
    /// Runs one completion and returns the assistant text.
    fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}

/// Configuration for [`HttpChatClient`].
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    /// Base URL of an OpenAI-compatible endpoint (no trailing `/v1`).
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Bearer token, if the service requires one.
    pub api_key: Option<String>,
    /// Client-side request timeout.
    pub timeout: Duration,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8082".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout: Duration::from_secs(2),
        }
    }
}

impl ChatClientConfig {
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.endpoint.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "endpoint must not be empty".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "model must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible `/v1/chat/completions` client.
#[derive(Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    config: ChatClientConfig,
}

impl std::fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl HttpChatClient {
    pub fn new(config: ChatClientConfig) -> Result<Self, LlmError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ChatClientConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

impl ChatClient for HttpChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<String, LlmError> {
        debug!(
            model = %self.config.model,
            temperature = opts.temperature,
            prompt_len = user_prompt.len(),
            "Requesting completion"
        );

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
        };

        let mut request = self.client.post(self.url()).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| LlmError::RequestFailed {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ServiceError {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::MalformedResponse {
                reason: "no assistant content in response".to_string(),
            })
    }
}
