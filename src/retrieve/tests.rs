use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{HybridRetriever, ProbeSource, RetrieverConfig, sparse_query};
use crate::access::AccessFilter;
use crate::analyze::{QueryAnalysis, Reformulation};
use crate::hashing::hash_term_u32;
use crate::vectordb::{MockChunk, MockVectorStore};

fn chunk(child: &str, doc: &str, dense: Vec<f32>, terms: &[(&str, f32)]) -> MockChunk {
    MockChunk {
        child_chunk_id: child.to_string(),
        parent_chunk_id: format!("parent-{child}"),
        document_id: doc.to_string(),
        content: format!("content of {child}"),
        dense,
        terms: terms
            .iter()
            .map(|(t, w)| (hash_term_u32(t), *w))
            .collect(),
    }
}

fn analysis_with_embedding(embedding: Vec<f32>) -> QueryAnalysis {
    QueryAnalysis {
        query_embedding: embedding,
        ..Default::default()
    }
}

fn retriever(store: Arc<MockVectorStore>) -> HybridRetriever<MockVectorStore> {
    HybridRetriever::new(store, RetrieverConfig::default())
}

#[tokio::test]
async fn test_dense_and_sparse_probes_run() {
    let store = Arc::new(MockVectorStore::new());
    store.add_chunk(chunk("c1", "d1", vec![1.0, 0.0], &[("refund", 1.0)]));
    store.add_chunk(chunk("c2", "d1", vec![0.0, 1.0], &[("billing", 1.0)]));

    let analysis = analysis_with_embedding(vec![1.0, 0.0]);
    let filter = Arc::new(AccessFilter::AllowAll);
    let outcome = retriever(Arc::clone(&store))
        .run(
            &CancellationToken::new(),
            &analysis,
            "refund window",
            &filter,
            10,
        )
        .await
        .unwrap();

    assert_eq!(outcome.probes.len(), 2);
    assert_eq!(outcome.probes[0].source, ProbeSource::Dense);
    assert_eq!(outcome.probes[1].source, ProbeSource::Sparse);
    assert!(outcome.warnings.is_empty());
    assert_eq!(store.dense_search_calls(), 1);
    assert_eq!(store.sparse_search_calls(), 1);
}

#[tokio::test]
async fn test_variant_probes_included_when_present() {
    let store = Arc::new(MockVectorStore::new());
    store.add_chunk(chunk("c1", "d1", vec![1.0, 0.0], &[]));

    let mut analysis = analysis_with_embedding(vec![1.0, 0.0]);
    analysis.hyde_embedding = Some(vec![0.9, 0.1]);
    analysis.rewritten_embedding = Some(vec![0.8, 0.2]);
    analysis.reformulations = vec![
        Reformulation {
            text: "r1".to_string(),
            embedding: vec![0.7, 0.3],
        },
        Reformulation {
            text: "r2".to_string(),
            embedding: vec![0.6, 0.4],
        },
    ];

    let filter = Arc::new(AccessFilter::AllowAll);
    let outcome = retriever(Arc::clone(&store))
        .run(
            &CancellationToken::new(),
            &analysis,
            "refund window",
            &filter,
            10,
        )
        .await
        .unwrap();

    let sources: Vec<ProbeSource> = outcome.probes.iter().map(|p| p.source).collect();
    assert_eq!(
        sources,
        vec![
            ProbeSource::Dense,
            ProbeSource::Hyde,
            ProbeSource::Rewrite,
            ProbeSource::Reformulation,
            ProbeSource::Reformulation,
            ProbeSource::Sparse,
        ]
    );
    // 1 base + 4 variant dense probes
    assert_eq!(store.dense_search_calls(), 5);
}

#[tokio::test]
async fn test_all_probes_failing_is_an_error() {
    let store = Arc::new(MockVectorStore::new());
    store.add_chunk(chunk("c1", "d1", vec![1.0], &[]));
    store.set_fail_chunk_searches(true);

    let analysis = analysis_with_embedding(vec![1.0]);
    let filter = Arc::new(AccessFilter::AllowAll);
    let result = retriever(store)
        .run(
            &CancellationToken::new(),
            &analysis,
            "refund",
            &filter,
            10,
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_degrades_to_warning() {
    let store = Arc::new(MockVectorStore::new());
    store.add_chunk(chunk("c1", "d1", vec![1.0], &[("refund", 1.0)]));
    store.set_search_delay(Some(Duration::from_secs(5)));

    // One probe (sparse) would also hang, so both time out -> error; with a
    // short delay only slower-than-deadline probes degrade. Here all probes
    // hang past the deadline, which must surface as AllProbesFailed.
    let analysis = analysis_with_embedding(vec![1.0]);
    let filter = Arc::new(AccessFilter::AllowAll);
    let result = retriever(store)
        .run(
            &CancellationToken::new(),
            &analysis,
            "refund",
            &filter,
            10,
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_filter_restricts_every_probe() {
    let store = Arc::new(MockVectorStore::new());
    store.add_chunk(chunk("c1", "d1", vec![1.0, 0.0], &[("refund", 1.0)]));
    store.add_chunk(chunk("c2", "d2", vec![1.0, 0.0], &[("refund", 1.0)]));

    let analysis = analysis_with_embedding(vec![1.0, 0.0]);
    let filter = Arc::new(AccessFilter::DocIdSet(
        ["d1".to_string()].into_iter().collect(),
    ));
    let outcome = retriever(store)
        .run(
            &CancellationToken::new(),
            &analysis,
            "refund",
            &filter,
            10,
        )
        .await
        .unwrap();

    for probe in &outcome.probes {
        for hit in &probe.hits {
            assert_eq!(hit.document_id, "d1");
        }
    }
}

#[tokio::test]
async fn test_subquery_probes_tagged() {
    let store = Arc::new(MockVectorStore::new());
    store.add_chunk(chunk("c1", "d1", vec![1.0, 0.0], &[]));

    let filter = Arc::new(AccessFilter::AllowAll);
    let outcome = retriever(store)
        .run_subqueries(
            &CancellationToken::new(),
            vec![vec![1.0, 0.0], vec![0.5, 0.5]],
            &filter,
            10,
        )
        .await
        .unwrap();

    assert_eq!(outcome.probes.len(), 2);
    assert!(outcome.probes.iter().all(|p| p.source == ProbeSource::Subquery));
}

#[tokio::test]
async fn test_cancelled_token_aborts_retrieval() {
    let store = Arc::new(MockVectorStore::new());
    store.add_chunk(chunk("c1", "d1", vec![1.0], &[]));
    store.set_search_delay(Some(Duration::from_secs(10)));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let analysis = analysis_with_embedding(vec![1.0]);
    let filter = Arc::new(AccessFilter::AllowAll);
    let result = retriever(store)
        .run(&cancel, &analysis, "refund", &filter, 10)
        .await;

    assert!(result.is_err());
}

#[test]
fn test_sparse_query_drops_stopwords_and_counts_terms() {
    let sparse = sparse_query("what is the refund refund policy?");

    assert_eq!(sparse.indices.len(), 2);
    let refund_idx = hash_term_u32("refund");
    let position = sparse.indices.iter().position(|&i| i == refund_idx).unwrap();
    assert_eq!(sparse.values[position], 2.0);
}

#[test]
fn test_sparse_query_is_deterministic() {
    let a = sparse_query("annual refund policy window");
    let b = sparse_query("annual refund policy window");
    assert_eq!(a, b);
}

#[test]
fn test_sparse_query_empty_for_stopwords_only() {
    assert!(sparse_query("what is the").is_empty());
}
