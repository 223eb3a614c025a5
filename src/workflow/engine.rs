//! The orchestrator: owns per-request state, sequences nodes, applies the
//! adaptive retry loop, and enforces the request-wide deadline and
//! cancellation.
//!
//! The engine holds no shared mutable state; all request state lives in a
//! per-request [`WorkflowState`], so one instance serves concurrent
//! requests.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::access::{AccessControl, FilterBuilder};
use crate::analyze::{AnalyzerKnobs, QueryAnalyzer};
use crate::cache::{SemanticCache, WriteOutcome};
use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::constants::{HYDE_TEMPERATURE_DECAY, MAX_REFORMULATIONS, RETRY_CANDIDATE_STEP};
use crate::embedding::EmbeddingClient;
use crate::enrich::Enricher;
use crate::fusion::fuse;
use crate::llm::ChatClient;
use crate::metadata::ParentStore;
use crate::rerank::{RerankClient, RerankStage};
use crate::retrieve::{HybridRetriever, RetrieveError};
use crate::types::{Context, QueryRequest, UserContext};
use crate::vectordb::VectorStore;
use crate::workflow::controller::{self, Decision, SufficiencyConfig};
use crate::workflow::error::WorkflowError;
use crate::workflow::output;
use crate::workflow::state::{WorkflowStage, WorkflowState};
use crate::workflow::subquery::SubQueryExecutor;

use super::metrics::WorkflowMetrics;

/// What a successful request returns.
#[derive(Debug, Clone)]
pub struct RetrievalOutput {
    pub contexts: Vec<Context>,
    pub metrics: WorkflowMetrics,
}

/// The retrieval workflow engine. Construct once per process and share.
///
/// The request's `mode` flag is carried through but `Generation` currently
/// behaves exactly like `RetrievalOnly`; answer synthesis is reserved.
pub struct WorkflowEngine<V, E, L, R, M, A, K> {
    embedder: Arc<E>,
    analyzer: QueryAnalyzer<E, L>,
    filter_builder: FilterBuilder<A>,
    retriever: HybridRetriever<V>,
    rerank_stage: RerankStage<R>,
    enricher: Enricher<M>,
    subqueries: SubQueryExecutor<E, V>,
    cache: SemanticCache<V, A, K>,
    sufficiency: SufficiencyConfig,
    config: Config,
}

impl<V, E, L, R, M, A, K> WorkflowEngine<V, E, L, R, M, A, K>
where
    V: VectorStore + 'static,
    E: EmbeddingClient + 'static,
    L: ChatClient + 'static,
    R: RerankClient + 'static,
    M: ParentStore + 'static,
    A: AccessControl + 'static,
    K: Clock + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<V>,
        embedder: Arc<E>,
        chat: Arc<L>,
        reranker: Arc<R>,
        parents: Arc<M>,
        acl: Arc<A>,
        clock: Arc<K>,
        config: Config,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache = SemanticCache::new(
            Arc::clone(&store),
            Arc::clone(&acl),
            clock,
            config.cache_config(),
        )
        .map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })?;

        let analyzer = QueryAnalyzer::new(
            Arc::clone(&embedder),
            chat,
            config.analyzer_config(),
        );
        let filter_builder = FilterBuilder::new(acl, config.acl_timeout());
        let retriever = HybridRetriever::new(Arc::clone(&store), config.retriever_config());
        let rerank_stage = RerankStage::new(reranker, config.rerank_stage_config());
        let enricher = Enricher::new(parents, config.enricher_config());
        let subqueries = SubQueryExecutor::new(
            Arc::clone(&embedder),
            HybridRetriever::new(store, config.retriever_config()),
            config.embed_timeout(),
        );
        let sufficiency = config.sufficiency_config();

        Ok(Self {
            embedder,
            analyzer,
            filter_builder,
            retriever,
            rerank_stage,
            enricher,
            subqueries,
            cache,
            sufficiency,
            config,
        })
    }

    /// Ensures the cache collection exists in the vector store.
    pub async fn ensure_cache_collection(&self, vector_size: u64) -> Result<(), WorkflowError> {
        self.cache
            .ensure_collection(vector_size)
            .await
            .map_err(|e| WorkflowError::RetrievalFailed {
                reason: e.to_string(),
            })
    }

    /// Runs one request to completion.
    pub async fn execute(
        &self,
        request: QueryRequest,
        user: UserContext,
    ) -> Result<RetrievalOutput, WorkflowError> {
        self.execute_with_token(request, user, CancellationToken::new())
            .await
    }

    /// Runs one request under an external cancellation token. Cancelling
    /// the token makes the call return [`WorkflowError::Cancelled`]
    /// promptly; in-flight probes are aborted with it.
    pub async fn execute_with_token(
        &self,
        request: QueryRequest,
        user: UserContext,
        cancel: CancellationToken,
    ) -> Result<RetrievalOutput, WorkflowError> {
        request
            .validate()
            .map_err(|reason| WorkflowError::InvalidInput { reason })?;

        let request_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "workflow",
            request_id = %request_id,
            user_id = %user.user_id,
            top_k = request.top_k,
        );

        // Child token: a blown deadline must stop our probes without
        // cancelling whatever else the caller uses the parent token for.
        let cancel = cancel.child_token();
        let deadline = self.config.request_deadline();
        let started = Instant::now();

        let result = async {
            tokio::select! {
                _ = cancel.cancelled() => Err(WorkflowError::Cancelled),
                run = tokio::time::timeout(
                    deadline,
                    self.run_pipeline(&request, &user, &cancel, request_id.clone()),
                ) => match run {
                    Ok(result) => result,
                    Err(_) => {
                        cancel.cancel();
                        Err(WorkflowError::DeadlineExceeded {
                            deadline_ms: deadline.as_millis() as u64,
                        })
                    }
                },
            }
        }
        .instrument(span)
        .await;

        match result {
            Ok(mut retrieval) => {
                retrieval.metrics.total_ms = started.elapsed().as_millis() as u64;
                Ok(retrieval)
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Workflow failed");
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &QueryRequest,
        user: &UserContext,
        cancel: &CancellationToken,
        request_id: String,
    ) -> Result<RetrievalOutput, WorkflowError> {
        let mut state = WorkflowState::new(request.clone(), user.clone(), request_id);

        // Base embedding: the one analyzer artifact that is mandatory. The
        // cache lookup and every dense probe key off it.
        let timer = Instant::now();
        let base_embedding = match tokio::time::timeout(
            self.config.embed_timeout(),
            self.embedder.embed(&request.text),
        )
        .await
        {
            Ok(Ok(embedding)) => embedding,
            Ok(Err(e)) => {
                return Err(WorkflowError::EmbeddingUnavailable {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(WorkflowError::EmbeddingUnavailable {
                    reason: format!("timed out after {}ms", self.config.embed_timeout_ms),
                });
            }
        };
        state.metrics.record_stage("embed", timer.elapsed());

        // Cache short-circuit. Lookup failure is degraded, not fatal.
        let timer = Instant::now();
        match self.cache.lookup(&base_embedding, request.use_cache).await {
            Ok(Some(hit)) => {
                state.metrics.record_stage("cache_lookup", timer.elapsed());
                state.stage = WorkflowStage::CacheHitReturn;
                state.metrics.cache_hit = true;
                info!(
                    similarity = hit.similarity,
                    contexts = hit.contexts.len(),
                    "Cache hit, bypassing retrieval pipeline"
                );
                return Ok(RetrievalOutput {
                    contexts: hit.contexts,
                    metrics: state.metrics,
                });
            }
            Ok(None) => state.metrics.record_stage("cache_lookup", timer.elapsed()),
            Err(e) => {
                state.metrics.record_stage("cache_lookup", timer.elapsed());
                state.metrics.warn(format!("cache lookup failed: {e}"));
            }
        }

        // Initial analysis pass.
        let mut knobs = AnalyzerKnobs::default();
        let timer = Instant::now();
        let mut analysis = self
            .analyzer
            .run(&request.text, base_embedding.clone(), knobs)
            .await;
        for warning in analysis.warnings.drain(..) {
            state.metrics.warn(warning);
        }
        state.metrics.record_stage("analyze", timer.elapsed());
        state.stage = WorkflowStage::Analyzed;

        // Access filter, fail closed.
        let timer = Instant::now();
        let filter = self
            .filter_builder
            .build(user)
            .await
            .map_err(|e| WorkflowError::AccessDenied {
                reason: e.to_string(),
            })?;
        state.metrics.record_stage("access_filter", timer.elapsed());
        state.stage = WorkflowStage::FilterBuilt;

        let filter = Arc::new(filter);
        state.filter = Some(Arc::clone(&filter));

        if filter.is_empty_whitelist() {
            info!("Empty visibility whitelist, returning zero results");
            state.stage = WorkflowStage::Complete;
            return Ok(RetrievalOutput {
                contexts: Vec::new(),
                metrics: state.metrics,
            });
        }

        // Adaptive loop: retrieve → fuse → rerank → enrich → assess.
        let mut candidates_per_probe = self.config.candidates_per_probe;
        let decision = loop {
            let timer = Instant::now();
            let outcome = self
                .retriever
                .run(
                    cancel,
                    &analysis,
                    &request.text,
                    &filter,
                    candidates_per_probe,
                )
                .await
                .map_err(|e| match e {
                    RetrieveError::Cancelled => WorkflowError::Cancelled,
                    other => WorkflowError::RetrievalFailed {
                        reason: other.to_string(),
                    },
                })?;
            state.metrics.record_stage("retrieve", timer.elapsed());
            for warning in outcome.warnings {
                state.metrics.warn(warning);
            }
            state.probes = outcome.probes;
            state.stage = WorkflowStage::Retrieved;

            let effective_query = analysis.effective_query(&request.text).to_string();
            self.rank_and_enrich(&mut state, &effective_query).await;

            let report = controller::assess(&state.enriched, request.top_k, &self.sufficiency);
            state.stage = WorkflowStage::Assess;
            let decision = controller::decide(
                &report,
                &self.sufficiency,
                state.iteration,
                self.config.max_iterations,
                !analysis.decompositions.is_empty(),
                state.subqueries_run,
            );
            state.sufficiency = Some(report);
            state.metrics.sufficiency_score = Some(report.score);
            debug!(
                score = report.score,
                iteration = state.iteration,
                ?decision,
                "Assessment complete"
            );

            match decision {
                Decision::Retry => {
                    state.iteration += 1;
                    state.metrics.iterations = state.iteration;
                    candidates_per_probe += RETRY_CANDIDATE_STEP;
                    knobs.hyde_temperature *= HYDE_TEMPERATURE_DECAY;
                    knobs.reformulation_count =
                        (knobs.reformulation_count + 1).min(MAX_REFORMULATIONS);

                    // The final retry only widens the candidate budget; the
                    // analyzer budget is capped at max_iterations passes.
                    if state.iteration < self.config.max_iterations {
                        let timer = Instant::now();
                        analysis = self
                            .analyzer
                            .run(&request.text, base_embedding.clone(), knobs)
                            .await;
                        for warning in analysis.warnings.drain(..) {
                            state.metrics.warn(warning);
                        }
                        state.metrics.record_stage("analyze", timer.elapsed());
                    }
                }
                other => break other,
            }
        };

        // Decomposition: one extra probe pass merged into the existing
        // fusion input, never a second adaptive loop.
        if decision == Decision::Decompose {
            let timer = Instant::now();
            let outcome = self
                .subqueries
                .run(cancel, &analysis.decompositions, &filter, candidates_per_probe)
                .await;
            state.metrics.record_stage("subqueries", timer.elapsed());
            for warning in outcome.warnings {
                state.metrics.warn(warning);
            }
            state.metrics.decomposition_triggered = true;
            state.subqueries_run = true;
            state.stage = WorkflowStage::SubqueriesRun;

            if !outcome.probes.is_empty() {
                state.probes.extend(outcome.probes);
                let effective_query = analysis.effective_query(&request.text).to_string();
                self.rank_and_enrich(&mut state, &effective_query).await;

                let report =
                    controller::assess(&state.enriched, request.top_k, &self.sufficiency);
                state.sufficiency = Some(report);
                state.metrics.sufficiency_score = Some(report.score);
            }
        }

        state.analysis = Some(analysis);

        // Output shaping, then the conditional cache write. The write is
        // best-effort and must never fail the request.
        let contexts = output::format_contexts(&state.enriched, request.top_k);
        state.metrics.source_counts = output::source_counts(&state.probes);

        let timer = Instant::now();
        match self
            .cache
            .store(&request.text, base_embedding, &contexts, request.use_cache)
            .await
        {
            Ok(WriteOutcome::Stored) => state.metrics.cache_write_performed = true,
            Ok(WriteOutcome::Suppressed { reason }) => {
                state.metrics.cache_write_suppressed = true;
                state.metrics.warn(format!("cache write suppressed: {reason}"));
            }
            Ok(WriteOutcome::Skipped { .. }) => {}
            Err(e) => state.metrics.warn(format!("cache write failed: {e}")),
        }
        state.metrics.record_stage("cache_store", timer.elapsed());
        state.stage = WorkflowStage::Complete;

        info!(
            contexts = contexts.len(),
            iterations = state.iteration,
            sufficiency = state.metrics.sufficiency_score,
            "Workflow complete"
        );

        Ok(RetrievalOutput {
            contexts,
            metrics: state.metrics,
        })
    }

    /// fuse → rerank → enrich, shared by the loop body and the
    /// post-decomposition merge.
    async fn rank_and_enrich(&self, state: &mut WorkflowState, effective_query: &str) {
        let timer = Instant::now();
        state.fused = fuse(&state.probes, self.config.rrf_k, self.config.fusion_top_n);
        state.stage = WorkflowStage::Fused;
        state.metrics.record_stage("fuse", timer.elapsed());

        let timer = Instant::now();
        let reranked = self
            .rerank_stage
            .run(effective_query, state.fused.clone())
            .await;
        if reranked.fallback_triggered {
            state.metrics.rerank_fallback_triggered = true;
        }
        for warning in reranked.warnings {
            state.metrics.warn(warning);
        }
        state.reranked = reranked.results;
        state.stage = WorkflowStage::Reranked;
        state.metrics.record_stage("rerank", timer.elapsed());

        let timer = Instant::now();
        if state.reranked.is_empty() {
            state.enriched = Vec::new();
        } else {
            let outcome = self.enricher.run(&state.reranked).await;
            for warning in outcome.warnings {
                state.metrics.warn(warning);
            }
            state.enriched = outcome.contexts;
        }
        state.stage = WorkflowStage::Enriched;
        state.metrics.record_stage("enrich", timer.elapsed());
    }
}
