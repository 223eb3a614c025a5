//! Reciprocal Rank Fusion over probe result lists.
//!
//! `score(c) = Σ_p 1/(k + rank_p(c))` over the probes containing `c`,
//! ranks starting at 1. Ordering is fully deterministic: score desc, then
//! number of probes containing the candidate desc, then best single-probe
//! rank asc, then `child_chunk_id` asc.


use std::collections::HashMap;

use tracing::debug;

use crate::retrieve::{ProbeResult, ProbeSource};

/// A deduplicated candidate with its fused score.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub child_chunk_id: String,
    pub parent_chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub rrf_score: f32,
    /// `(source, rank)` per probe that returned this candidate.
    pub per_source_ranks: Vec<(ProbeSource, usize)>,
}

impl FusedResult {
    fn probe_count(&self) -> usize {
        self.per_source_ranks.len()
    }

    fn best_rank(&self) -> usize {
        self.per_source_ranks
            .iter()
            .map(|(_, rank)| *rank)
            .min()
            .unwrap_or(usize::MAX)
    }
}

/// Fuses probe lists into one ranked candidate list, truncated to `top_n`.
///
/// Deduplication key is `child_chunk_id`; content fields are taken from the
/// first probe that produced the candidate (probes agree, chunk content is
/// immutable).
pub fn fuse(probes: &[ProbeResult], rrf_k: f32, top_n: usize) -> Vec<FusedResult> {
    let mut by_child: HashMap<String, FusedResult> = HashMap::new();

    for probe in probes {
        for (position, hit) in probe.hits.iter().enumerate() {
            let rank = position + 1;
            let contribution = 1.0 / (rrf_k + rank as f32);

            by_child
                .entry(hit.child_chunk_id.clone())
                .and_modify(|fused| {
                    fused.rrf_score += contribution;
                    fused.per_source_ranks.push((probe.source, rank));
                })
                .or_insert_with(|| FusedResult {
                    child_chunk_id: hit.child_chunk_id.clone(),
                    parent_chunk_id: hit.parent_chunk_id.clone(),
                    document_id: hit.document_id.clone(),
                    content: hit.content.clone(),
                    rrf_score: contribution,
                    per_source_ranks: vec![(probe.source, rank)],
                });
        }
    }

    let mut fused: Vec<FusedResult> = by_child.into_values().collect();

    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.probe_count().cmp(&a.probe_count()))
            .then_with(|| a.best_rank().cmp(&b.best_rank()))
            .then_with(|| a.child_chunk_id.cmp(&b.child_chunk_id))
    });

    fused.truncate(top_n);

    debug!(candidates = fused.len(), "Fusion complete");
    fused
}
