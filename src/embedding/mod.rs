//! Embedding service client: port trait, OpenAI-compatible HTTP
//! implementation, and mock.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingClient;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Port to the embedding model provider.
pub trait EmbeddingClient: Send + Sync {
    /// Embeds one text. The returned vector length is model-defined and
    /// must match the chunk collection's dense vector size.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

/// Configuration for [`HttpEmbeddingClient`].
#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    /// Base URL of an OpenAI-compatible endpoint (no trailing `/v1`).
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Bearer token, if the service requires one.
    pub api_key: Option<String>,
    /// Client-side request timeout.
    pub timeout: Duration,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8081".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            timeout: Duration::from_millis(500),
        }
    }
}

impl EmbeddingClientConfig {
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.endpoint.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "endpoint must not be empty".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/v1/embeddings` client.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    config: EmbeddingClientConfig,
}

impl std::fmt::Debug for HttpEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingClientConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EmbeddingClientConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/v1/embeddings", self.config.endpoint.trim_end_matches('/'))
    }
}

impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!(text_len = text.len(), model = %self.config.model, "Requesting embedding");

        let mut request = self.client.post(self.url()).json(&EmbeddingRequest {
            model: &self.config.model,
            input: text,
        });
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServiceError {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        let parsed: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::MalformedResponse {
                reason: "empty data array".to_string(),
            })?;

        if embedding.is_empty() {
            return Err(EmbeddingError::MalformedResponse {
                reason: "zero-length embedding".to_string(),
            });
        }

        Ok(embedding)
    }
}
