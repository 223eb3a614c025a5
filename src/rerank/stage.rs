use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, instrument, warn};

use super::{RerankClient, RerankError, RerankScore};
use crate::fusion::FusedResult;

/// A fused candidate carrying its cross-encoder score (or, after fallback,
/// its RRF score in that slot).
#[derive(Debug, Clone, PartialEq)]
pub struct RerankedResult {
    pub fused: FusedResult,
    pub rerank_score: f32,
}

/// Stage configuration.
#[derive(Debug, Clone)]
pub struct RerankStageConfig {
    /// Candidates per reranker call; larger inputs are split.
    pub batch_size: usize,
    /// Total deadline across all batches.
    pub timeout: Duration,
}

impl Default for RerankStageConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            timeout: Duration::from_secs(30),
        }
    }
}

/// What the stage produced, including whether it had to fall back.
#[derive(Debug, Clone)]
pub struct RerankStageOutput {
    pub results: Vec<RerankedResult>,
    pub fallback_triggered: bool,
    pub warnings: Vec<String>,
}

/// Reranks fused candidates, batching when needed and degrading to RRF
/// ordering when the reranker misbehaves.
pub struct RerankStage<R> {
    client: Arc<R>,
    config: RerankStageConfig,
}

impl<R: RerankClient> RerankStage<R> {
    pub fn new(client: Arc<R>, config: RerankStageConfig) -> Self {
        Self { client, config }
    }

    /// Reranks `fused` against `query`.
    ///
    /// Candidates with empty content are dropped before submission. On any
    /// reranker error or on the total deadline, the fused ordering is
    /// returned as-is with RRF scores standing in for rerank scores and
    /// `fallback_triggered` set; the pipeline proceeds unchanged either way.
    #[instrument(skip_all, fields(candidates = fused.len()))]
    pub async fn run(&self, query: &str, fused: Vec<FusedResult>) -> RerankStageOutput {
        let candidates: Vec<FusedResult> = fused
            .iter()
            .filter(|f| !f.content.trim().is_empty())
            .cloned()
            .collect();

        if candidates.is_empty() {
            debug!("No rerankable candidates");
            return RerankStageOutput {
                results: Vec::new(),
                fallback_triggered: false,
                warnings: Vec::new(),
            };
        }

        match tokio::time::timeout(self.config.timeout, self.rerank_batched(query, &candidates))
            .await
        {
            Ok(Ok(mut results)) => {
                results.sort_by(|a, b| {
                    b.rerank_score
                        .partial_cmp(&a.rerank_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| {
                            a.fused.child_chunk_id.cmp(&b.fused.child_chunk_id)
                        })
                });
                debug!(results = results.len(), "Rerank complete");
                RerankStageOutput {
                    results,
                    fallback_triggered: false,
                    warnings: Vec::new(),
                }
            }
            Ok(Err(e)) => self.fallback(fused, format!("reranker failed: {e}")),
            Err(_) => self.fallback(
                fused,
                format!(
                    "reranker exceeded {}ms deadline",
                    self.config.timeout.as_millis()
                ),
            ),
        }
    }

    /// Scores all batches concurrently. Cross-encoder scores for the same
    /// query are comparable across batches, so a plain merge is sound.
    async fn rerank_batched(
        &self,
        query: &str,
        candidates: &[FusedResult],
    ) -> Result<Vec<RerankedResult>, RerankError> {
        let batches: Vec<&[FusedResult]> = candidates.chunks(self.config.batch_size).collect();

        let scored = join_all(batches.iter().map(|batch| {
            let texts: Vec<String> = batch.iter().map(|f| f.content.clone()).collect();
            async move {
                let scores = self.client.rerank(query, &texts).await?;
                if scores.len() != texts.len() {
                    return Err(RerankError::MalformedResponse {
                        reason: format!(
                            "expected {} scores, got {}",
                            texts.len(),
                            scores.len()
                        ),
                    });
                }
                Ok::<Vec<RerankScore>, RerankError>(scores)
            }
        }))
        .await;

        let mut results = Vec::with_capacity(candidates.len());
        for (batch, batch_scores) in batches.iter().zip(scored) {
            let batch_scores = batch_scores?;
            for score in batch_scores {
                let fused = batch.get(score.index).ok_or_else(|| {
                    RerankError::MalformedResponse {
                        reason: format!(
                            "index {} out of range for batch of {}",
                            score.index,
                            batch.len()
                        ),
                    }
                })?;
                results.push(RerankedResult {
                    fused: fused.clone(),
                    rerank_score: score.score,
                });
            }
        }

        Ok(results)
    }

    fn fallback(&self, fused: Vec<FusedResult>, warning: String) -> RerankStageOutput {
        warn!(warning = %warning, "Falling back to RRF ordering");
        let results = fused
            .into_iter()
            .map(|f| RerankedResult {
                rerank_score: f.rrf_score,
                fused: f,
            })
            .collect();

        RerankStageOutput {
            results,
            fallback_triggered: true,
            warnings: vec![warning],
        }
    }
}
