//! Query analysis: base embedding reuse, LLM rewrite, HyDE, reformulation,
//! and eager decomposition.
//!
//! Every artifact except the base embedding is best-effort: a failed or
//! timed-out LLM/embedding call leaves the artifact absent and appends a
//! warning, and downstream probes simply skip it.

pub mod heuristics;

pub use heuristics::needs_rewrite;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, instrument};

use crate::constants::MAX_REFORMULATIONS;
use crate::embedding::EmbeddingClient;
use crate::llm::prompts::{
    DECOMPOSE_SYSTEM_PROMPT, HYDE_SYSTEM_PROMPT, REFORMULATE_SYSTEM_PROMPT,
    REWRITE_SYSTEM_PROMPT, parse_list_output,
};
use crate::llm::{ChatClient, CompletionOptions, LlmError};

/// Static analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Deadline for each embedding call.
    pub embed_timeout: Duration,
    /// Deadline for each LLM call.
    pub llm_timeout: Duration,
    /// Token budget for the HyDE passage.
    pub hyde_max_tokens: u32,
    /// Upper bound on decomposed sub-questions.
    pub max_decompositions: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            embed_timeout: Duration::from_millis(500),
            llm_timeout: Duration::from_secs(2),
            hyde_max_tokens: 192,
            max_decompositions: 4,
        }
    }
}

/// Per-pass knobs the adaptive loop tightens on retries.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerKnobs {
    /// HyDE sampling temperature (lowered on each retry).
    pub hyde_temperature: f32,
    /// Number of paraphrases to request (raised on retries, capped at 3).
    pub reformulation_count: usize,
}

impl Default for AnalyzerKnobs {
    fn default() -> Self {
        Self {
            hyde_temperature: 0.7,
            reformulation_count: 2,
        }
    }
}

/// A paraphrase probe-ready with its embedding.
#[derive(Debug, Clone)]
pub struct Reformulation {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Everything one analysis pass produced.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalysis {
    /// Embedding of the original query. Always present; computed by the
    /// engine before the cache check and threaded through here.
    pub query_embedding: Vec<f32>,
    pub rewritten_query: Option<String>,
    pub rewritten_embedding: Option<Vec<f32>>,
    pub hyde_passage: Option<String>,
    pub hyde_embedding: Option<Vec<f32>>,
    pub reformulations: Vec<Reformulation>,
    /// Atomic sub-questions, generated eagerly but executed only when the
    /// controller decides to decompose.
    pub decompositions: Vec<String>,
    pub warnings: Vec<String>,
}

impl QueryAnalysis {
    /// The query the reranker should judge against: the cleaned rewrite if
    /// one was produced, the original otherwise.
    pub fn effective_query<'a>(&'a self, original: &'a str) -> &'a str {
        self.rewritten_query.as_deref().unwrap_or(original)
    }
}

/// Produces [`QueryAnalysis`] from the raw query.
pub struct QueryAnalyzer<E, L> {
    embedder: Arc<E>,
    chat: Arc<L>,
    config: AnalyzerConfig,
}

impl<E: EmbeddingClient, L: ChatClient> QueryAnalyzer<E, L> {
    pub fn new(embedder: Arc<E>, chat: Arc<L>, config: AnalyzerConfig) -> Self {
        Self {
            embedder,
            chat,
            config,
        }
    }

    /// Runs one analysis pass. Never fails; degraded artifacts are absent
    /// and recorded in `warnings`.
    #[instrument(skip(self, query, base_embedding), fields(query_len = query.len(), reformulations = knobs.reformulation_count))]
    pub async fn run(
        &self,
        query: &str,
        base_embedding: Vec<f32>,
        knobs: AnalyzerKnobs,
    ) -> QueryAnalysis {
        let mut analysis = QueryAnalysis {
            query_embedding: base_embedding,
            ..Default::default()
        };

        let reformulation_count = knobs.reformulation_count.min(MAX_REFORMULATIONS);

        let rewrite_fut = async {
            if needs_rewrite(query) {
                Some(
                    self.complete(
                        REWRITE_SYSTEM_PROMPT,
                        query,
                        CompletionOptions {
                            temperature: 0.2,
                            max_tokens: 128,
                        },
                    )
                    .await,
                )
            } else {
                None
            }
        };

        let hyde_fut = self.complete(
            HYDE_SYSTEM_PROMPT,
            query,
            CompletionOptions {
                temperature: knobs.hyde_temperature,
                max_tokens: self.config.hyde_max_tokens,
            },
        );

        let reformulate_fut = async {
            if reformulation_count > 0 {
                let prompt = format!("Give {reformulation_count} paraphrases of: {query}");
                Some(
                    self.complete(
                        REFORMULATE_SYSTEM_PROMPT,
                        &prompt,
                        CompletionOptions {
                            temperature: 0.8,
                            max_tokens: 192,
                        },
                    )
                    .await,
                )
            } else {
                None
            }
        };

        let decompose_fut = self.complete(
            DECOMPOSE_SYSTEM_PROMPT,
            query,
            CompletionOptions {
                temperature: 0.2,
                max_tokens: 192,
            },
        );

        let (rewrite, hyde, reformulate, decompose) =
            tokio::join!(rewrite_fut, hyde_fut, reformulate_fut, decompose_fut);

        match rewrite {
            Some(Ok(text)) => {
                let text = text.trim().to_string();
                if !text.is_empty() && text != query {
                    analysis.rewritten_query = Some(text);
                }
            }
            Some(Err(e)) => analysis.warnings.push(format!("query rewrite failed: {e}")),
            None => {}
        }

        match hyde {
            Ok(passage) => {
                let passage = passage.trim().to_string();
                if !passage.is_empty() {
                    analysis.hyde_passage = Some(passage);
                }
            }
            Err(e) => analysis.warnings.push(format!("HyDE generation failed: {e}")),
        }

        let mut reformulation_texts = Vec::new();
        match reformulate {
            Some(Ok(output)) => {
                reformulation_texts = parse_list_output(&output, reformulation_count);
            }
            Some(Err(e)) => analysis.warnings.push(format!("reformulation failed: {e}")),
            None => {}
        }

        match decompose {
            Ok(output) => {
                let questions = parse_list_output(&output, self.config.max_decompositions);
                // A single question back means the query was already atomic.
                if questions.len() > 1 {
                    analysis.decompositions = questions;
                }
            }
            Err(e) => analysis.warnings.push(format!("decomposition failed: {e}")),
        }

        self.embed_artifacts(&mut analysis, reformulation_texts)
            .await;

        debug!(
            rewritten = analysis.rewritten_query.is_some(),
            hyde = analysis.hyde_embedding.is_some(),
            reformulations = analysis.reformulations.len(),
            decompositions = analysis.decompositions.len(),
            warnings = analysis.warnings.len(),
            "Query analysis complete"
        );

        analysis
    }

    /// Embeds the rewrite, HyDE passage, and reformulations concurrently.
    async fn embed_artifacts(&self, analysis: &mut QueryAnalysis, reformulations: Vec<String>) {
        let mut texts: Vec<(&'static str, String)> = Vec::new();
        if let Some(ref rewritten) = analysis.rewritten_query {
            texts.push(("rewrite", rewritten.clone()));
        }
        if let Some(ref hyde) = analysis.hyde_passage {
            texts.push(("hyde", hyde.clone()));
        }
        for text in &reformulations {
            texts.push(("reformulation", text.clone()));
        }

        let embeds = join_all(texts.iter().map(|(_, text)| self.embed(text))).await;

        let mut reformulation_iter = reformulations.into_iter();
        for ((kind, _), result) in texts.iter().zip(embeds) {
            match (*kind, result) {
                ("rewrite", Ok(embedding)) => analysis.rewritten_embedding = Some(embedding),
                ("hyde", Ok(embedding)) => analysis.hyde_embedding = Some(embedding),
                ("reformulation", Ok(embedding)) => {
                    if let Some(text) = reformulation_iter.next() {
                        analysis.reformulations.push(Reformulation { text, embedding });
                    }
                }
                ("reformulation", Err(e)) => {
                    reformulation_iter.next();
                    analysis
                        .warnings
                        .push(format!("reformulation embedding failed: {e}"));
                }
                (kind, Err(e)) => {
                    analysis.warnings.push(format!("{kind} embedding failed: {e}"));
                }
                _ => {}
            }
        }
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        opts: CompletionOptions,
    ) -> Result<String, LlmError> {
        match tokio::time::timeout(self.config.llm_timeout, self.chat.complete(system, user, opts))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::RequestFailed {
                message: format!("timed out after {}ms", self.config.llm_timeout.as_millis()),
            }),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::embedding::EmbeddingError> {
        match tokio::time::timeout(self.config.embed_timeout, self.embedder.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(crate::embedding::EmbeddingError::RequestFailed {
                message: format!("timed out after {}ms", self.config.embed_timeout.as_millis()),
            }),
        }
    }
}
