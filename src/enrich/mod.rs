//! Small-to-big enrichment: group reranked child hits by parent and swap
//! in the parent body for surrounding context.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::metadata::ParentStore;
use crate::rerank::RerankedResult;
use crate::types::{ChildHit, Context};

/// Enricher configuration.
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Deadline for the batched parent fetch.
    pub fetch_timeout: Duration,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(500),
        }
    }
}

/// Output of one enrichment pass.
#[derive(Debug, Clone, Default)]
pub struct EnrichOutcome {
    /// Enriched contexts, sorted descending by `best_score`.
    pub contexts: Vec<Context>,
    pub warnings: Vec<String>,
}

/// Groups reranked children under their parents and fetches parent bodies
/// in one batched metadata call.
pub struct Enricher<M> {
    parents: Arc<M>,
    config: EnricherConfig,
}

impl<M: ParentStore> Enricher<M> {
    pub fn new(parents: Arc<M>, config: EnricherConfig) -> Self {
        Self { parents, config }
    }

    /// Enriches `reranked`. Children whose parent is missing are dropped;
    /// a failed parent fetch degrades to an empty result with a warning.
    #[instrument(skip_all, fields(children = reranked.len()))]
    pub async fn run(&self, reranked: &[RerankedResult]) -> EnrichOutcome {
        if reranked.is_empty() {
            return EnrichOutcome::default();
        }

        // Parent ids in first-appearance (best child) order.
        let mut parent_ids: Vec<String> = Vec::new();
        for result in reranked {
            let parent_id = &result.fused.parent_chunk_id;
            if !parent_ids.contains(parent_id) {
                parent_ids.push(parent_id.clone());
            }
        }

        let fetch = self.parents.fetch_parents(&parent_ids);
        let fetched = match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(parents)) => parents,
            Ok(Err(e)) => {
                warn!(error = %e, "Parent fetch failed");
                return EnrichOutcome {
                    contexts: Vec::new(),
                    warnings: vec![format!("parent fetch failed: {e}")],
                };
            }
            Err(_) => {
                let timeout_ms = self.config.fetch_timeout.as_millis();
                warn!(timeout_ms, "Parent fetch timed out");
                return EnrichOutcome {
                    contexts: Vec::new(),
                    warnings: vec![format!("parent fetch timed out after {timeout_ms}ms")],
                };
            }
        };

        let mut contexts: Vec<Context> = Vec::with_capacity(fetched.len());
        for parent in fetched {
            let child_hits: Vec<ChildHit> = reranked
                .iter()
                .filter(|r| r.fused.parent_chunk_id == parent.parent_chunk_id)
                .map(|r| ChildHit {
                    chunk_id: r.fused.child_chunk_id.clone(),
                    content: r.fused.content.clone(),
                    score: r.rerank_score,
                })
                .collect();

            if child_hits.is_empty() {
                continue;
            }

            let best_score = child_hits
                .iter()
                .map(|c| c.score)
                .fold(f32::NEG_INFINITY, f32::max);

            contexts.push(Context {
                parent_chunk_id: parent.parent_chunk_id,
                document_id: parent.document_id,
                content: parent.content,
                tokens: parent.tokens,
                metadata: parent.metadata,
                best_score,
                child_hits,
            });
        }

        contexts.sort_by(|a, b| {
            b.best_score
                .partial_cmp(&a.best_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.parent_chunk_id.cmp(&b.parent_chunk_id))
        });

        debug!(
            parents_requested = parent_ids.len(),
            contexts = contexts.len(),
            "Enrichment complete"
        );

        EnrichOutcome {
            contexts,
            warnings: Vec::new(),
        }
    }
}
