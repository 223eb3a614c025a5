//! One-shot executor for decomposed sub-queries.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::access::AccessFilter;
use crate::embedding::EmbeddingClient;
use crate::retrieve::{HybridRetriever, ProbeResult, RetrieveError};
use crate::vectordb::VectorStore;

/// Output of the sub-query pass.
#[derive(Debug, Default)]
pub struct SubQueryOutcome {
    /// Dense probe results tagged `subquery`, ready for re-fusion.
    pub probes: Vec<ProbeResult>,
    pub warnings: Vec<String>,
}

/// Embeds decomposed sub-queries and probes each one once.
///
/// The whole pass is degraded-path: by the time decomposition runs the
/// pipeline already has results, so failures here only produce warnings.
pub struct SubQueryExecutor<E, V> {
    embedder: Arc<E>,
    retriever: HybridRetriever<V>,
    embed_timeout: Duration,
}

impl<E: EmbeddingClient, V: VectorStore + 'static> SubQueryExecutor<E, V> {
    pub fn new(
        embedder: Arc<E>,
        retriever: HybridRetriever<V>,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            retriever,
            embed_timeout,
        }
    }

    #[instrument(skip_all, fields(subqueries = decompositions.len()))]
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        decompositions: &[String],
        filter: &Arc<AccessFilter>,
        candidates_per_probe: u64,
    ) -> SubQueryOutcome {
        let mut outcome = SubQueryOutcome::default();
        if decompositions.is_empty() {
            return outcome;
        }

        let embeds = join_all(decompositions.iter().map(|subquery| async move {
            tokio::time::timeout(self.embed_timeout, self.embedder.embed(subquery)).await
        }))
        .await;

        let mut embeddings = Vec::with_capacity(decompositions.len());
        for (subquery, result) in decompositions.iter().zip(embeds) {
            match result {
                Ok(Ok(embedding)) => embeddings.push(embedding),
                Ok(Err(e)) => outcome
                    .warnings
                    .push(format!("sub-query '{subquery}' embedding failed: {e}")),
                Err(_) => outcome
                    .warnings
                    .push(format!("sub-query '{subquery}' embedding timed out")),
            }
        }

        if embeddings.is_empty() {
            return outcome;
        }

        match self
            .retriever
            .run_subqueries(cancel, embeddings, filter, candidates_per_probe)
            .await
        {
            Ok(probe_outcome) => {
                debug!(probes = probe_outcome.probes.len(), "Sub-query probes complete");
                outcome.probes = probe_outcome.probes;
                outcome.warnings.extend(probe_outcome.warnings);
            }
            Err(RetrieveError::Cancelled) => {
                outcome.warnings.push("sub-query probes cancelled".to_string());
            }
            Err(e) => {
                outcome.warnings.push(format!("sub-query probes failed: {e}"));
            }
        }

        outcome
    }
}
