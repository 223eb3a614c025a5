//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.
//! Anything a deployment is expected to tune lives in [`crate::config`];
//! the values here are either protocol invariants (RRF shape, sufficiency
//! weights) or the defaults those configs start from.

/// Default embedding dimension (OpenAI `text-embedding-3-small` family).
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Default vector size for collection creation, as the u64 qdrant expects.
pub const DEFAULT_VECTOR_SIZE_U64: u64 = DEFAULT_EMBEDDING_DIM as u64;

/// RRF constant `k` in `1 / (k + rank)`.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Cosine similarity a cache candidate must reach to count as a hit.
pub const DEFAULT_CACHE_SIMILARITY_THRESHOLD: f32 = 0.95;

/// Default semantic cache entry TTL.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 86_400;

/// Per-probe candidate budget.
pub const DEFAULT_CANDIDATES_PER_PROBE: u64 = 50;

/// Extra candidates granted to every probe on each adaptive retry.
pub const RETRY_CANDIDATE_STEP: u64 = 25;

/// Post-fusion truncation.
pub const DEFAULT_FUSION_TOP_N: usize = 50;

/// Sufficiency decision threshold.
pub const DEFAULT_SUFFICIENCY_THRESHOLD: f32 = 0.6;

/// Rerank score above which an enriched context counts as high quality.
pub const DEFAULT_HIGH_QUALITY_MIN: f32 = 0.7;

/// Minimum enriched contexts for the coverage term to score 1.
pub const DEFAULT_MIN_COVERAGE: usize = 3;

/// Weight of the high-quality fraction in the sufficiency composite.
pub const SUFFICIENCY_HIGH_QUALITY_WEIGHT: f32 = 0.5;
/// Weight of the mean best-score term in the sufficiency composite.
pub const SUFFICIENCY_AVG_SCORE_WEIGHT: f32 = 0.3;
/// Weight of the coverage term in the sufficiency composite.
pub const SUFFICIENCY_COVERAGE_WEIGHT: f32 = 0.2;

/// Adaptive loop iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Lower bound on `top_k` in a query request.
pub const MIN_TOP_K: usize = 1;
/// Upper bound on `top_k` in a query request.
pub const MAX_TOP_K: usize = 50;
/// `top_k` used when a request does not specify one.
pub const DEFAULT_TOP_K: usize = 10;

/// Upper bound on LLM reformulations per analysis pass.
pub const MAX_REFORMULATIONS: usize = 3;

/// Multiplier applied to the HyDE sampling temperature on each retry.
pub const HYDE_TEMPERATURE_DECAY: f32 = 0.8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sufficiency_weights_sum_to_one() {
        let sum = SUFFICIENCY_HIGH_QUALITY_WEIGHT
            + SUFFICIENCY_AVG_SCORE_WEIGHT
            + SUFFICIENCY_COVERAGE_WEIGHT;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_top_k_bounds_ordered() {
        assert!(MIN_TOP_K <= DEFAULT_TOP_K);
        assert!(DEFAULT_TOP_K <= MAX_TOP_K);
    }

    #[test]
    fn test_vector_size_derived_from_dim() {
        assert_eq!(DEFAULT_VECTOR_SIZE_U64, DEFAULT_EMBEDDING_DIM as u64);
    }
}
