//! Cross-encoder reranking: port trait, HTTP client, and the batching
//! stage with its RRF fallback.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod stage;


pub use error::RerankError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockRerankClient;
pub use stage::{RerankStage, RerankStageConfig, RerankStageOutput, RerankedResult};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One scored pair from the reranker; `index` refers to the submitted
/// text's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankScore {
    pub index: usize,
    pub score: f32,
}

/// Port to the cross-encoder reranker service.
pub trait RerankClient: Send + Sync {
    /// Scores every `(query, text)` pair. The result may arrive in any
    /// order; indices map back to the input.
    fn rerank(
        &self,
        query: &str,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<RerankScore>, RerankError>> + Send;
}

/// Configuration for [`HttpRerankClient`].
#[derive(Debug, Clone)]
pub struct RerankClientConfig {
    /// Base URL of the rerank service.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Bearer token, if the service requires one.
    pub api_key: Option<String>,
    /// Client-side request timeout (per batch).
    pub timeout: Duration,
}

impl Default for RerankClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8083".to_string(),
            model: "bge-reranker-v2-m3".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RerankClientConfig {
    pub fn validate(&self) -> Result<(), RerankError> {
        if self.endpoint.trim().is_empty() {
            return Err(RerankError::InvalidConfig {
                reason: "endpoint must not be empty".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(RerankError::InvalidConfig {
                reason: "model must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResponseItem>,
}

#[derive(Deserialize)]
struct RerankResponseItem {
    index: usize,
    relevance_score: f32,
}

/// HTTP client for a Jina/Cohere-style `/v1/rerank` endpoint.
#[derive(Clone)]
pub struct HttpRerankClient {
    client: reqwest::Client,
    config: RerankClientConfig,
}

impl std::fmt::Debug for HttpRerankClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRerankClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl HttpRerankClient {
    pub fn new(config: RerankClientConfig) -> Result<Self, RerankError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RerankError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RerankClientConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/v1/rerank", self.config.endpoint.trim_end_matches('/'))
    }
}

impl RerankClient for HttpRerankClient {
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<RerankScore>, RerankError> {
        debug!(
            query_len = query.len(),
            texts = texts.len(),
            model = %self.config.model,
            "Submitting rerank batch"
        );

        let mut request = self.client.post(self.url()).json(&RerankRequest {
            model: &self.config.model,
            query,
            documents: texts,
        });
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RerankError::RequestFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RerankError::ServiceError {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        let parsed: RerankResponse =
            response
                .json()
                .await
                .map_err(|e| RerankError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        let scores: Vec<RerankScore> = parsed
            .results
            .into_iter()
            .map(|item| {
                if item.index >= texts.len() {
                    return Err(RerankError::MalformedResponse {
                        reason: format!(
                            "index {} out of range for {} documents",
                            item.index,
                            texts.len()
                        ),
                    });
                }
                Ok(RerankScore {
                    index: item.index,
                    score: item.relevance_score,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(scores)
    }
}
