use std::collections::{HashMap, HashSet};

use super::mock::{MockChunk, MockVectorStore, cosine_similarity};
use super::model::{CachePayload, CachePoint, SparseVector};
use super::{DEFAULT_CACHE_COLLECTION, DEFAULT_CHUNK_COLLECTION, VectorStore};

fn chunk(child: &str, doc: &str, dense: Vec<f32>) -> MockChunk {
    MockChunk {
        child_chunk_id: child.to_string(),
        parent_chunk_id: format!("parent-{child}"),
        document_id: doc.to_string(),
        content: format!("content of {child}"),
        dense,
        terms: HashMap::new(),
    }
}

#[tokio::test]
async fn test_dense_search_orders_by_similarity() {
    let store = MockVectorStore::new();
    store.add_chunk(chunk("c1", "d1", vec![1.0, 0.0]));
    store.add_chunk(chunk("c2", "d1", vec![0.8, 0.6]));
    store.add_chunk(chunk("c3", "d1", vec![0.0, 1.0]));

    let hits = store
        .dense_search(DEFAULT_CHUNK_COLLECTION, vec![1.0, 0.0], None, 10)
        .await
        .unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.child_chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn test_dense_search_honors_doc_filter() {
    let store = MockVectorStore::new();
    store.add_chunk(chunk("c1", "d1", vec![1.0, 0.0]));
    store.add_chunk(chunk("c2", "d2", vec![1.0, 0.0]));

    let filter: HashSet<String> = HashSet::from(["d2".to_string()]);
    let hits = store
        .dense_search(DEFAULT_CHUNK_COLLECTION, vec![1.0, 0.0], Some(&filter), 10)
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_id, "d2");
}

#[tokio::test]
async fn test_sparse_search_scores_by_term_overlap() {
    let store = MockVectorStore::new();

    let mut c1 = chunk("c1", "d1", vec![0.0, 0.0]);
    c1.terms = HashMap::from([(7, 2.0), (9, 1.0)]);
    let mut c2 = chunk("c2", "d1", vec![0.0, 0.0]);
    c2.terms = HashMap::from([(9, 1.0)]);
    let mut c3 = chunk("c3", "d1", vec![0.0, 0.0]);
    c3.terms = HashMap::from([(11, 5.0)]);
    store.add_chunk(c1);
    store.add_chunk(c2);
    store.add_chunk(c3);

    let query = SparseVector {
        indices: vec![7, 9],
        values: vec![1.0, 1.0],
    };
    let hits = store
        .sparse_search(DEFAULT_CHUNK_COLLECTION, query, None, 10)
        .await
        .unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.child_chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}

#[tokio::test]
async fn test_cache_roundtrip() {
    let store = MockVectorStore::new();
    let point = CachePoint {
        id: 42,
        vector: vec![0.6, 0.8],
        payload: CachePayload {
            query_text: "original query".to_string(),
            contexts_json: "[]".to_string(),
            created_at_ms: 1_000,
            expires_at_ms: 2_000,
        },
    };

    store
        .upsert_cache_entry(DEFAULT_CACHE_COLLECTION, point)
        .await
        .unwrap();

    let hits = store
        .search_cache(DEFAULT_CACHE_COLLECTION, vec![0.6, 0.8], 1)
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 42);
    assert!(hits[0].score > 0.99);
    assert_eq!(hits[0].payload.query_text, "original query");
}

#[tokio::test]
async fn test_failure_injection() {
    let store = MockVectorStore::new();
    store.add_chunk(chunk("c1", "d1", vec![1.0]));
    store.set_fail_chunk_searches(true);

    let result = store
        .dense_search(DEFAULT_CHUNK_COLLECTION, vec![1.0], None, 10)
        .await;
    assert!(result.is_err());

    store.set_fail_chunk_searches(false);
    let result = store
        .dense_search(DEFAULT_CHUNK_COLLECTION, vec![1.0], None, 10)
        .await;
    assert!(result.is_ok());
}

#[test]
fn test_cosine_similarity_basics() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
}
