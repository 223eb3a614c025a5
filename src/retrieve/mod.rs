//! Hybrid retrieval: concurrent dense and sparse probes under one access
//! filter, with a bounded worker pool and per-probe deadlines.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::RetrieveError;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::access::AccessFilter;
use crate::analyze::QueryAnalysis;
use crate::hashing::hash_term_u32;
use crate::vectordb::{ChunkHit, SparseVector, VectorStore};

/// Which probe produced a hit. Tagged through fusion and into metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProbeSource {
    Dense,
    Hyde,
    Rewrite,
    Reformulation,
    Sparse,
    Subquery,
}

impl ProbeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeSource::Dense => "dense",
            ProbeSource::Hyde => "hyde",
            ProbeSource::Rewrite => "rewrite",
            ProbeSource::Reformulation => "reformulation",
            ProbeSource::Sparse => "sparse",
            ProbeSource::Subquery => "subquery",
        }
    }
}

/// One probe's result list, sorted by the probe's native score.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub source: ProbeSource,
    pub hits: Vec<ChunkHit>,
}

/// Output of one retrieval pass: per-probe lists plus degraded-path notes.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    pub probes: Vec<ProbeResult>,
    pub warnings: Vec<String>,
}

/// What a single probe searches with.
#[derive(Debug, Clone)]
enum ProbeKind {
    Dense(Vec<f32>),
    Sparse(SparseVector),
}

#[derive(Debug, Clone)]
struct ProbeSpec {
    source: ProbeSource,
    kind: ProbeKind,
}

/// Retriever configuration.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Chunk collection to probe.
    pub chunk_collection: String,
    /// Deadline per probe.
    pub probe_timeout: Duration,
    /// Bounded worker count for concurrent probes.
    pub max_concurrent_probes: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            chunk_collection: crate::vectordb::DEFAULT_CHUNK_COLLECTION.to_string(),
            probe_timeout: Duration::from_millis(800),
            max_concurrent_probes: 4,
        }
    }
}

/// Runs all probes of one retrieval pass concurrently against the store.
pub struct HybridRetriever<V> {
    store: Arc<V>,
    config: RetrieverConfig,
}

impl<V: VectorStore + 'static> HybridRetriever<V> {
    pub fn new(store: Arc<V>, config: RetrieverConfig) -> Self {
        Self { store, config }
    }

    /// Builds the probe plan from the analysis and executes it.
    ///
    /// Individual probe failures degrade to warnings; only a pass in which
    /// every probe failed is an error.
    #[instrument(skip_all, fields(candidates_per_probe = candidates_per_probe))]
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        analysis: &QueryAnalysis,
        query_text: &str,
        filter: &Arc<AccessFilter>,
        candidates_per_probe: u64,
    ) -> Result<ProbeOutcome, RetrieveError> {
        let mut specs = vec![ProbeSpec {
            source: ProbeSource::Dense,
            kind: ProbeKind::Dense(analysis.query_embedding.clone()),
        }];

        if let Some(ref hyde) = analysis.hyde_embedding {
            specs.push(ProbeSpec {
                source: ProbeSource::Hyde,
                kind: ProbeKind::Dense(hyde.clone()),
            });
        }
        if let Some(ref rewritten) = analysis.rewritten_embedding {
            specs.push(ProbeSpec {
                source: ProbeSource::Rewrite,
                kind: ProbeKind::Dense(rewritten.clone()),
            });
        }
        for reformulation in &analysis.reformulations {
            specs.push(ProbeSpec {
                source: ProbeSource::Reformulation,
                kind: ProbeKind::Dense(reformulation.embedding.clone()),
            });
        }

        let sparse = sparse_query(query_text);
        if !sparse.is_empty() {
            specs.push(ProbeSpec {
                source: ProbeSource::Sparse,
                kind: ProbeKind::Sparse(sparse),
            });
        }

        self.execute(cancel, specs, filter, candidates_per_probe)
            .await
    }

    /// Runs one dense probe per decomposed sub-query.
    pub async fn run_subqueries(
        &self,
        cancel: &CancellationToken,
        embeddings: Vec<Vec<f32>>,
        filter: &Arc<AccessFilter>,
        candidates_per_probe: u64,
    ) -> Result<ProbeOutcome, RetrieveError> {
        let specs = embeddings
            .into_iter()
            .map(|embedding| ProbeSpec {
                source: ProbeSource::Subquery,
                kind: ProbeKind::Dense(embedding),
            })
            .collect();

        self.execute(cancel, specs, filter, candidates_per_probe)
            .await
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        specs: Vec<ProbeSpec>,
        filter: &Arc<AccessFilter>,
        candidates_per_probe: u64,
    ) -> Result<ProbeOutcome, RetrieveError> {
        let attempted = specs.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_probes));
        let mut join_set: JoinSet<(usize, ProbeSource, Result<Vec<ChunkHit>, String>)> =
            JoinSet::new();

        for (idx, spec) in specs.into_iter().enumerate() {
            let store = Arc::clone(&self.store);
            let filter = Arc::clone(filter);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let collection = self.config.chunk_collection.clone();
            let probe_timeout = self.config.probe_timeout;

            join_set.spawn(async move {
                let permit = semaphore.acquire_owned().await;
                if permit.is_err() {
                    return (idx, spec.source, Err("worker pool closed".to_string()));
                }

                let search = async {
                    match spec.kind {
                        ProbeKind::Dense(vector) => {
                            store
                                .dense_search(
                                    &collection,
                                    vector,
                                    filter.doc_ids(),
                                    candidates_per_probe,
                                )
                                .await
                        }
                        ProbeKind::Sparse(sparse) => {
                            store
                                .sparse_search(
                                    &collection,
                                    sparse,
                                    filter.doc_ids(),
                                    candidates_per_probe,
                                )
                                .await
                        }
                    }
                };

                let result = tokio::select! {
                    _ = cancel.cancelled() => Err("cancelled".to_string()),
                    searched = tokio::time::timeout(probe_timeout, search) => match searched {
                        Ok(Ok(hits)) => Ok(hits),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err(format!(
                            "probe timed out after {}ms",
                            probe_timeout.as_millis()
                        )),
                    },
                };

                (idx, spec.source, result)
            });
        }

        let mut slots: Vec<Option<(ProbeSource, Result<Vec<ChunkHit>, String>)>> =
            (0..attempted).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, source, result)) => slots[idx] = Some((source, result)),
                Err(e) => warn!(error = %e, "Probe task panicked or was aborted"),
            }
        }

        if cancel.is_cancelled() {
            return Err(RetrieveError::Cancelled);
        }

        let mut outcome = ProbeOutcome::default();
        for slot in slots.into_iter().flatten() {
            match slot {
                (source, Ok(hits)) => {
                    debug!(source = source.as_str(), hits = hits.len(), "Probe complete");
                    outcome.probes.push(ProbeResult { source, hits });
                }
                (source, Err(message)) => {
                    warn!(source = source.as_str(), error = %message, "Probe failed");
                    outcome
                        .warnings
                        .push(format!("{} probe failed: {message}", source.as_str()));
                }
            }
        }

        if outcome.probes.is_empty() {
            return Err(RetrieveError::AllProbesFailed { attempted });
        }

        Ok(outcome)
    }
}

/// Words too common to carry retrieval signal in the sparse probe.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "do", "for", "from", "how", "i",
    "in", "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "we", "what",
    "when", "where", "which", "who", "why", "will", "with", "you",
];

/// Builds the query-side sparse vector: hashed term indices with term
/// frequencies as weights, sorted by index for determinism.
pub fn sparse_query(text: &str) -> SparseVector {
    let mut frequencies: HashMap<u32, f32> = HashMap::new();

    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(t))
    {
        *frequencies.entry(hash_term_u32(token)).or_insert(0.0) += 1.0;
    }

    let mut entries: Vec<(u32, f32)> = frequencies.into_iter().collect();
    entries.sort_by_key(|(index, _)| *index);

    SparseVector {
        indices: entries.iter().map(|(index, _)| *index).collect(),
        values: entries.iter().map(|(_, value)| *value).collect(),
    }
}
