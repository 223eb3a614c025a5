use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{Enricher, EnricherConfig};
use crate::fusion::FusedResult;
use crate::metadata::{MockParentStore, ParentChunk};
use crate::rerank::RerankedResult;
use crate::retrieve::ProbeSource;

fn reranked(child: &str, parent: &str, score: f32) -> RerankedResult {
    RerankedResult {
        fused: FusedResult {
            child_chunk_id: child.to_string(),
            parent_chunk_id: parent.to_string(),
            document_id: "d1".to_string(),
            content: format!("child content {child}"),
            rrf_score: 0.01,
            per_source_ranks: vec![(ProbeSource::Dense, 1)],
        },
        rerank_score: score,
    }
}

fn parent(id: &str) -> ParentChunk {
    ParentChunk {
        parent_chunk_id: id.to_string(),
        document_id: "d1".to_string(),
        content: format!("parent body {id}"),
        tokens: 1800,
        metadata: HashMap::from([("source".to_string(), "handbook".to_string())]),
    }
}

fn enricher(store: Arc<MockParentStore>) -> Enricher<MockParentStore> {
    Enricher::new(store, EnricherConfig::default())
}

#[tokio::test]
async fn test_groups_children_under_parent() {
    let store = Arc::new(MockParentStore::new());
    store.add_parent(parent("p1"));
    store.add_parent(parent("p2"));

    let outcome = enricher(Arc::clone(&store))
        .run(&[
            reranked("c1", "p1", 0.9),
            reranked("c2", "p2", 0.8),
            reranked("c3", "p1", 0.4),
        ])
        .await;

    assert_eq!(outcome.contexts.len(), 2);
    assert_eq!(store.fetch_calls(), 1);

    let p1 = &outcome.contexts[0];
    assert_eq!(p1.parent_chunk_id, "p1");
    assert_eq!(p1.best_score, 0.9);
    assert_eq!(p1.child_hits.len(), 2);
    assert_eq!(p1.content, "parent body p1");

    let p2 = &outcome.contexts[1];
    assert_eq!(p2.best_score, 0.8);
}

#[tokio::test]
async fn test_sorted_by_best_score_desc() {
    let store = Arc::new(MockParentStore::new());
    store.add_parent(parent("p1"));
    store.add_parent(parent("p2"));

    let outcome = enricher(store)
        .run(&[reranked("c1", "p1", 0.3), reranked("c2", "p2", 0.7)])
        .await;

    assert_eq!(outcome.contexts[0].parent_chunk_id, "p2");
    assert_eq!(outcome.contexts[1].parent_chunk_id, "p1");
}

#[tokio::test]
async fn test_missing_parent_drops_children_silently() {
    let store = Arc::new(MockParentStore::new());
    store.add_parent(parent("p1"));

    let outcome = enricher(store)
        .run(&[reranked("c1", "p1", 0.9), reranked("c2", "missing", 0.8)])
        .await;

    assert_eq!(outcome.contexts.len(), 1);
    assert_eq!(outcome.contexts[0].parent_chunk_id, "p1");
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn test_empty_input_makes_no_fetch() {
    let store = Arc::new(MockParentStore::new());

    let outcome = enricher(Arc::clone(&store)).run(&[]).await;

    assert!(outcome.contexts.is_empty());
    assert_eq!(store.fetch_calls(), 0);
}

#[tokio::test]
async fn test_fetch_failure_degrades_with_warning() {
    let store = Arc::new(MockParentStore::new());
    store.set_fail(true);

    let outcome = enricher(store).run(&[reranked("c1", "p1", 0.9)]).await;

    assert!(outcome.contexts.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_timeout_degrades_with_warning() {
    let store = Arc::new(MockParentStore::new());
    store.add_parent(parent("p1"));
    store.set_delay(Some(Duration::from_secs(30)));

    let outcome = enricher(store).run(&[reranked("c1", "p1", 0.9)]).await;

    assert!(outcome.contexts.is_empty());
    assert!(outcome.warnings[0].contains("timed out"));
}
