//! Final output shaping: order-preserving truncation and per-source counts.

use std::collections::BTreeMap;

use crate::retrieve::ProbeResult;
use crate::types::Context;

/// Truncates the enriched list to `top_k`, preserving order.
pub fn format_contexts(enriched: &[Context], top_k: usize) -> Vec<Context> {
    enriched.iter().take(top_k).cloned().collect()
}

/// Counts hits contributed per probe source across every pass.
pub fn source_counts(probes: &[ProbeResult]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for probe in probes {
        *counts.entry(probe.source.as_str().to_string()).or_insert(0) += probe.hits.len();
    }
    counts
}
