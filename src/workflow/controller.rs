//! Sufficiency scoring and the retry/decompose/proceed decision.

use tracing::debug;

use crate::constants::{
    DEFAULT_HIGH_QUALITY_MIN, DEFAULT_MIN_COVERAGE, DEFAULT_SUFFICIENCY_THRESHOLD,
    SUFFICIENCY_AVG_SCORE_WEIGHT, SUFFICIENCY_COVERAGE_WEIGHT, SUFFICIENCY_HIGH_QUALITY_WEIGHT,
};
use crate::types::Context;

/// Controller thresholds.
#[derive(Debug, Clone)]
pub struct SufficiencyConfig {
    /// Composite score at or above which the loop exits.
    pub threshold: f32,
    /// Best-score floor for a context to count as high quality.
    pub high_quality_min: f32,
    /// Minimum enriched contexts for full coverage credit.
    pub min_coverage: usize,
}

impl Default for SufficiencyConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SUFFICIENCY_THRESHOLD,
            high_quality_min: DEFAULT_HIGH_QUALITY_MIN,
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

/// Composite quality estimate of one enriched result set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SufficiencyReport {
    pub score: f32,
    pub high_quality_count: usize,
    pub avg_score: f32,
    pub coverage_met: bool,
}

/// What the controller wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Good enough (or out of options): continue to output.
    Proceed,
    /// Re-run analyze + retrieve with widened knobs.
    Retry,
    /// Execute the decomposed sub-queries and re-fuse.
    Decompose,
}

/// Scores the enriched set against the requested `top_k`.
///
/// The high-quality fraction divides by `top_k`, not by the enriched count,
/// so under-retrieval is penalized instead of hidden.
pub fn assess(contexts: &[Context], top_k: usize, config: &SufficiencyConfig) -> SufficiencyReport {
    let high_quality_count = contexts
        .iter()
        .filter(|c| c.best_score >= config.high_quality_min)
        .count();

    let avg_score = if contexts.is_empty() {
        0.0
    } else {
        contexts.iter().map(|c| c.best_score).sum::<f32>() / contexts.len() as f32
    };

    let coverage_met = contexts.len() >= config.min_coverage;

    let top_k = top_k.max(1);
    let score = SUFFICIENCY_HIGH_QUALITY_WEIGHT * (high_quality_count as f32 / top_k as f32)
        + SUFFICIENCY_AVG_SCORE_WEIGHT * avg_score
        + SUFFICIENCY_COVERAGE_WEIGHT * if coverage_met { 1.0 } else { 0.0 };

    debug!(
        score,
        high_quality_count, avg_score, coverage_met, "Sufficiency assessed"
    );

    SufficiencyReport {
        score,
        high_quality_count,
        avg_score,
        coverage_met,
    }
}

/// Decides the next edge out of the assessment node.
///
/// Retries strictly precede decomposition: the controller never decomposes
/// while retry budget remains, and never retries after decomposing.
pub fn decide(
    report: &SufficiencyReport,
    config: &SufficiencyConfig,
    iteration: u32,
    max_iterations: u32,
    decompositions_available: bool,
    subqueries_run: bool,
) -> Decision {
    if report.score >= config.threshold {
        return Decision::Proceed;
    }
    if iteration < max_iterations {
        return Decision::Retry;
    }
    if !subqueries_run && decompositions_available {
        return Decision::Decompose;
    }
    Decision::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn context(score: f32) -> Context {
        Context {
            parent_chunk_id: "p".to_string(),
            document_id: "d".to_string(),
            content: String::new(),
            tokens: 0,
            metadata: HashMap::new(),
            best_score: score,
            child_hits: Vec::new(),
        }
    }

    fn config() -> SufficiencyConfig {
        SufficiencyConfig::default()
    }

    #[test]
    fn test_assess_formula() {
        // 2 of 3 contexts high quality, top_k 10, coverage met
        let contexts = vec![context(0.9), context(0.8), context(0.3)];
        let report = assess(&contexts, 10, &config());

        assert_eq!(report.high_quality_count, 2);
        assert!(report.coverage_met);
        let expected_avg = (0.9 + 0.8 + 0.3) / 3.0;
        assert!((report.avg_score - expected_avg).abs() < 1e-6);
        let expected = 0.5 * (2.0 / 10.0) + 0.3 * expected_avg + 0.2;
        assert!((report.score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_assess_empty_set_scores_zero() {
        let report = assess(&[], 10, &config());
        assert_eq!(report.score, 0.0);
        assert_eq!(report.high_quality_count, 0);
        assert!(!report.coverage_met);
    }

    #[test]
    fn test_assess_divides_by_top_k_not_enriched_count() {
        // One perfect context out of top_k=10 must not look like full marks.
        let contexts = vec![context(0.95)];
        let report = assess(&contexts, 10, &config());

        let expected = 0.5 * 0.1 + 0.3 * 0.95;
        assert!((report.score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_coverage_threshold_boundary() {
        let two = vec![context(0.1), context(0.1)];
        assert!(!assess(&two, 10, &config()).coverage_met);

        let three = vec![context(0.1), context(0.1), context(0.1)];
        assert!(assess(&three, 10, &config()).coverage_met);
    }

    fn report(score: f32) -> SufficiencyReport {
        SufficiencyReport {
            score,
            high_quality_count: 0,
            avg_score: 0.0,
            coverage_met: false,
        }
    }

    #[test]
    fn test_decide_proceeds_at_threshold() {
        assert_eq!(
            decide(&report(0.6), &config(), 0, 3, true, false),
            Decision::Proceed
        );
        assert_eq!(
            decide(&report(0.9), &config(), 3, 3, true, false),
            Decision::Proceed
        );
    }

    #[test]
    fn test_decide_retries_while_budget_remains() {
        for iteration in 0..3 {
            assert_eq!(
                decide(&report(0.1), &config(), iteration, 3, true, false),
                Decision::Retry,
                "iteration {iteration}"
            );
        }
    }

    #[test]
    fn test_decide_decomposes_only_after_retries_exhausted() {
        assert_eq!(
            decide(&report(0.1), &config(), 3, 3, true, false),
            Decision::Decompose
        );
    }

    #[test]
    fn test_decide_never_decomposes_twice() {
        assert_eq!(
            decide(&report(0.1), &config(), 3, 3, true, true),
            Decision::Proceed
        );
    }

    #[test]
    fn test_decide_proceeds_without_decompositions() {
        assert_eq!(
            decide(&report(0.1), &config(), 3, 3, false, false),
            Decision::Proceed
        );
    }
}
