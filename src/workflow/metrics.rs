//! Aggregate metrics reported with every workflow result.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Everything the caller can observe about how a request ran.
///
/// Ordered maps keep serialized output stable for log diffing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowMetrics {
    /// Random id correlating log lines of one request.
    pub request_id: String,
    /// The semantic cache answered the request outright.
    pub cache_hit: bool,
    /// A cache entry was written on completion.
    pub cache_write_performed: bool,
    /// The write-time safety gate refused to cache the result.
    pub cache_write_suppressed: bool,
    /// Adaptive retries taken (0 when the first pass sufficed).
    pub iterations: u32,
    /// Last computed sufficiency score, if the pipeline got that far.
    pub sufficiency_score: Option<f32>,
    /// The reranker failed or timed out and RRF ordering was used.
    pub rerank_fallback_triggered: bool,
    /// Decomposed sub-queries were executed.
    pub decomposition_triggered: bool,
    /// Cumulative wall time per stage, in milliseconds.
    pub stage_ms: BTreeMap<String, u64>,
    /// Hits contributed per probe source across all passes.
    pub source_counts: BTreeMap<String, usize>,
    /// End-to-end wall time in milliseconds.
    pub total_ms: u64,
    /// Degraded-path notes, in occurrence order.
    pub warnings: Vec<String>,
}

impl WorkflowMetrics {
    /// Accumulates elapsed time under `stage` (retried stages add up).
    pub fn record_stage(&mut self, stage: &str, elapsed: Duration) {
        *self.stage_ms.entry(stage.to_string()).or_insert(0) += elapsed.as_millis() as u64;
    }

    /// Appends a degraded-path warning.
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
