//! End-to-end workflow tests over mock ports: the seed scenarios plus the
//! cross-cutting properties (access enforcement, cache safety, fallback,
//! iteration caps, cancellation, idempotence).

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::harness::Harness;
use trawl::llm::prompts::DECOMPOSE_SYSTEM_PROMPT;
use trawl::{
    AccessType, CachePayload, CachePoint, CancellationToken, ChildHit, Context, QueryRequest,
    Role, WorkflowError,
};

const QUERY: &str = "what is the refund policy for annual plans?";

fn pinned_query_vector() -> Vec<f32> {
    vec![1.0, 0.0, 0.0, 0.0]
}

/// Scenario 1: public-only fast path on a cache miss.
#[tokio::test]
async fn test_public_fast_path_cache_miss() {
    let harness = Harness::new();
    harness.embedder.pin(QUERY, pinned_query_vector());

    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    harness.add_chunk("c2", "P1", "D1", "beta", vec![0.9, 0.44, 0.0, 0.0]);
    harness.add_chunk("c3", "P2", "D2", "gamma", vec![0.8, 0.6, 0.0, 0.0]);
    harness.add_parent("P1", "D1", "refund policy parent");
    harness.add_parent("P2", "D2", "cancellation parent");

    harness.acl.grant("u-1", ["D1", "D2"]);
    harness.acl.set_access_type("D1", AccessType::Public);
    harness.acl.set_access_type("D2", AccessType::Public);

    harness.reranker.set_score("alpha", 0.9);
    harness.reranker.set_score("beta", 0.7);
    harness.reranker.set_score("gamma", 0.6);

    let mut harness = harness;
    harness.config.min_coverage = 2;
    let engine = harness.engine();

    let output = engine
        .execute(
            QueryRequest::new(QUERY).with_top_k(2),
            harness.user(Role::User),
        )
        .await
        .expect("workflow should succeed");

    assert_eq!(output.contexts.len(), 2);
    assert_eq!(output.contexts[0].parent_chunk_id, "P1");
    assert_eq!(output.contexts[0].best_score, 0.9);
    assert_eq!(output.contexts[0].child_hits.len(), 2);
    assert_eq!(output.contexts[1].parent_chunk_id, "P2");
    assert_eq!(output.contexts[1].best_score, 0.6);

    // P2: every returned document is inside the whitelist.
    for context in &output.contexts {
        assert!(["D1", "D2"].contains(&context.document_id.as_str()));
    }

    assert!(!output.metrics.cache_hit);
    assert_eq!(output.metrics.iterations, 0);
    assert!(output.metrics.sufficiency_score.unwrap() >= 0.6);

    // P3: all referenced documents are public, so the write happened.
    assert!(output.metrics.cache_write_performed);
    assert!(!output.metrics.cache_write_suppressed);
    assert_eq!(harness.store.cache_upsert_calls(), 1);
}

/// Scenario 2: one restricted document suppresses the cache write but not
/// the response.
#[tokio::test]
async fn test_restricted_document_suppresses_cache_write() {
    let harness = Harness::new();
    harness.embedder.pin(QUERY, pinned_query_vector());

    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    harness.add_chunk("c3", "P2", "D2", "gamma", vec![0.8, 0.6, 0.0, 0.0]);
    harness.add_parent("P1", "D1", "public parent");
    harness.add_parent("P2", "D2", "restricted parent");

    harness.acl.grant("u-1", ["D1", "D2"]);
    harness.acl.set_access_type("D1", AccessType::Public);
    harness.acl.set_access_type("D2", AccessType::Restricted);

    harness.reranker.set_score("alpha", 0.9);
    harness.reranker.set_score("gamma", 0.8);

    let mut harness = harness;
    harness.config.min_coverage = 2;
    let engine = harness.engine();

    let output = engine
        .execute(
            QueryRequest::new(QUERY).with_top_k(2),
            harness.user(Role::User),
        )
        .await
        .expect("workflow should succeed");

    assert_eq!(output.contexts.len(), 2);
    assert!(output.metrics.cache_write_suppressed);
    assert!(!output.metrics.cache_write_performed);
    assert_eq!(harness.store.cache_upsert_calls(), 0);
}

/// Scenario 3: an empty visibility whitelist short-circuits to zero
/// results with no store, reranker, or metadata calls.
#[tokio::test]
async fn test_empty_whitelist_short_circuit() {
    let harness = Harness::new();
    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    // No grants for u-1.

    let engine = harness.engine();
    let output = engine
        .execute(
            QueryRequest::new(QUERY).without_cache(),
            harness.user(Role::User),
        )
        .await
        .expect("workflow should succeed with zero results");

    assert!(output.contexts.is_empty());
    assert_eq!(harness.acl.visible_calls(), 1);
    assert_eq!(harness.store.dense_search_calls(), 0);
    assert_eq!(harness.store.sparse_search_calls(), 0);
    assert_eq!(harness.store.cache_search_calls(), 0);
    assert_eq!(harness.reranker.calls(), 0);
    assert_eq!(harness.parents.fetch_calls(), 0);
}

/// Scenario 4: a hanging reranker falls back to RRF ordering.
#[tokio::test(start_paused = true)]
async fn test_reranker_timeout_fallback() {
    let harness = Harness::new();
    harness.embedder.pin(QUERY, pinned_query_vector());
    // Kill the LLM so only the base dense probe contributes, making the
    // fused ordering equal the dense ordering.
    harness.chat.set_fail(true);

    for i in 0..10 {
        let child = format!("c{i:02}");
        let parent = format!("P{i:02}");
        harness.add_chunk(
            &child,
            &parent,
            "D1",
            &format!("text {i}"),
            vec![1.0 - 0.05 * i as f32, 0.05 * i as f32, 0.0, 0.0],
        );
        harness.add_parent(&parent, "D1", &format!("parent {i}"));
    }

    harness.reranker.set_delay(Some(Duration::from_secs(120)));

    let mut harness = harness;
    harness.config.rerank_timeout_ms = 200;
    harness.config.sufficiency_threshold = 0.0;
    let engine = harness.engine();

    let output = engine
        .execute(
            QueryRequest::new(QUERY).without_cache(),
            harness.user(Role::SuperAdmin),
        )
        .await
        .expect("fallback must not surface an error");

    assert!(output.metrics.rerank_fallback_triggered);
    assert_eq!(output.contexts.len(), 10);
    let parents: Vec<&str> = output
        .contexts
        .iter()
        .map(|c| c.parent_chunk_id.as_str())
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("P{i:02}")).collect();
    assert_eq!(parents, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

/// Scenario 5: weak recall retries three times, then decomposes once.
#[tokio::test]
async fn test_adaptive_retry_then_decompose() {
    let harness = Harness::new();
    let query = "what is the refund window and how are cancellations handled?";
    harness.embedder.pin(query, pinned_query_vector());
    harness.chat.set_response(
        DECOMPOSE_SYSTEM_PROMPT,
        "what is the refund window?\nhow are cancellations handled?",
    );

    harness.add_chunk("c1", "P1", "D1", "weak one", vec![1.0, 0.0, 0.0, 0.0]);
    harness.add_chunk("c2", "P2", "D1", "weak two", vec![0.7, 0.7, 0.0, 0.0]);
    harness.add_parent("P1", "D1", "parent one");
    harness.add_parent("P2", "D1", "parent two");
    // Default mock rerank score of 0.5 keeps sufficiency below threshold.

    let engine = harness.engine();
    let output = engine
        .execute(
            QueryRequest::new(query).without_cache(),
            harness.user(Role::SuperAdmin),
        )
        .await
        .expect("workflow should proceed with what it has");

    assert_eq!(output.metrics.iterations, 3);
    assert!(output.metrics.decomposition_triggered);
    assert!(output.metrics.sufficiency_score.unwrap() < 0.6);
    assert_eq!(output.contexts.len(), 2);

    // P8: analyzer passes are capped at max_iterations (initial + two
    // re-analyses); the final retry only widens the candidate budget.
    assert_eq!(
        harness
            .chat
            .calls_for(trawl::llm::prompts::HYDE_SYSTEM_PROMPT),
        3
    );

    // Sub-query probes actually contributed to the final fusion input.
    assert!(output.metrics.source_counts.contains_key("subquery"));
}

/// Scenario 6: a close-enough cache entry bypasses the entire pipeline.
#[tokio::test]
async fn test_cache_hit_bypass() {
    let harness = Harness::new();
    harness.embedder.pin(QUERY, pinned_query_vector());

    let cached = vec![Context {
        parent_chunk_id: "P9".to_string(),
        document_id: "D9".to_string(),
        content: "cached parent".to_string(),
        tokens: 900,
        metadata: HashMap::new(),
        best_score: 0.88,
        child_hits: vec![ChildHit {
            chunk_id: "c9".to_string(),
            content: "cached child".to_string(),
            score: 0.88,
        }],
    }];
    harness.store.seed_cache_point(CachePoint {
        id: 99,
        vector: pinned_query_vector(),
        payload: CachePayload {
            query_text: "an earlier phrasing of the refund question".to_string(),
            contexts_json: serde_json::to_string(&cached).unwrap(),
            created_at_ms: common::harness::NOW_MS - 5_000,
            expires_at_ms: common::harness::NOW_MS + 60_000,
        },
    });

    let engine = harness.engine();
    let output = engine
        .execute(QueryRequest::new(QUERY), harness.user(Role::User))
        .await
        .expect("cache hit should succeed");

    // P4: the cached contexts come back verbatim with no downstream calls.
    assert!(output.metrics.cache_hit);
    assert_eq!(output.contexts, cached);
    assert_eq!(harness.embedder.calls(), 1);
    assert_eq!(harness.chat.calls(), 0);
    assert_eq!(harness.store.dense_search_calls(), 0);
    assert_eq!(harness.store.sparse_search_calls(), 0);
    assert_eq!(harness.reranker.calls(), 0);
    assert_eq!(harness.parents.fetch_calls(), 0);
    assert_eq!(harness.acl.visible_calls(), 0);
}

/// P7: identical inputs with the cache disabled produce identical outputs.
#[tokio::test]
async fn test_idempotence_with_cache_disabled() {
    let harness = Harness::new();
    harness.embedder.pin(QUERY, pinned_query_vector());
    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    harness.add_chunk("c2", "P2", "D1", "beta", vec![0.9, 0.44, 0.0, 0.0]);
    harness.add_parent("P1", "D1", "parent one");
    harness.add_parent("P2", "D1", "parent two");
    harness.reranker.set_score("alpha", 0.9);
    harness.reranker.set_score("beta", 0.8);

    let engine = harness.engine();
    let request = QueryRequest::new(QUERY).without_cache();
    let user = harness.user(Role::SuperAdmin);

    let first = engine
        .execute(request.clone(), user.clone())
        .await
        .expect("first run");
    let second = engine
        .execute(request, user)
        .await
        .expect("second run");

    assert_eq!(first.contexts, second.contexts);
    assert_eq!(
        first.metrics.sufficiency_score,
        second.metrics.sufficiency_score
    );
    assert_eq!(harness.store.cache_upsert_calls(), 0);
}

#[tokio::test]
async fn test_empty_query_rejected_without_side_effects() {
    let harness = Harness::new();
    let engine = harness.engine();

    let result = engine
        .execute(QueryRequest::new("   "), harness.user(Role::User))
        .await;

    assert!(matches!(result, Err(WorkflowError::InvalidInput { .. })));
    assert_eq!(harness.embedder.calls(), 0);
    assert_eq!(harness.store.cache_search_calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_top_k_rejected() {
    let harness = Harness::new();
    let engine = harness.engine();

    let result = engine
        .execute(
            QueryRequest::new(QUERY).with_top_k(51),
            harness.user(Role::User),
        )
        .await;

    assert!(matches!(result, Err(WorkflowError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_embedding_failure_is_fatal_with_no_cache_write() {
    let harness = Harness::new();
    harness.embedder.set_fail(true);

    let engine = harness.engine();
    let result = engine
        .execute(QueryRequest::new(QUERY), harness.user(Role::User))
        .await;

    assert!(matches!(
        result,
        Err(WorkflowError::EmbeddingUnavailable { .. })
    ));
    assert_eq!(harness.store.cache_upsert_calls(), 0);
}

#[tokio::test]
async fn test_acl_failure_fails_closed() {
    let harness = Harness::new();
    harness.acl.set_fail(true);

    let engine = harness.engine();
    let result = engine
        .execute(
            QueryRequest::new(QUERY).without_cache(),
            harness.user(Role::User),
        )
        .await;

    assert!(matches!(result, Err(WorkflowError::AccessDenied { .. })));
    assert_eq!(harness.store.dense_search_calls(), 0);
}

#[tokio::test]
async fn test_all_probes_failing_is_retrieval_failed() {
    let harness = Harness::new();
    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    harness.store.set_fail_chunk_searches(true);

    let engine = harness.engine();
    let result = engine
        .execute(
            QueryRequest::new(QUERY).without_cache(),
            harness.user(Role::SuperAdmin),
        )
        .await;

    assert!(matches!(result, Err(WorkflowError::RetrievalFailed { .. })));
}

/// P9: a pre-cancelled token returns promptly without new I/O.
#[tokio::test]
async fn test_pre_cancelled_token() {
    let harness = Harness::new();
    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);

    let token = CancellationToken::new();
    token.cancel();

    let engine = harness.engine();
    let result = engine
        .execute_with_token(
            QueryRequest::new(QUERY).without_cache(),
            harness.user(Role::SuperAdmin),
            token,
        )
        .await;

    assert!(matches!(result, Err(WorkflowError::Cancelled)));
    assert_eq!(harness.store.dense_search_calls(), 0);
}

/// P9: cancellation mid-flight aborts in-flight probes and returns.
#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_mid_flight() {
    let harness = Harness::new();
    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    harness.store.set_search_delay(Some(Duration::from_millis(400)));

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let engine = harness.engine();
    let started = std::time::Instant::now();
    let result = engine
        .execute_with_token(
            QueryRequest::new(QUERY).without_cache(),
            harness.user(Role::SuperAdmin),
            token,
        )
        .await;

    assert!(matches!(result, Err(WorkflowError::Cancelled)));
    assert!(started.elapsed() < Duration::from_millis(350));
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_exceeded() {
    let harness = Harness::new();
    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    harness.store.set_search_delay(Some(Duration::from_secs(60)));

    let mut harness = harness;
    harness.config.request_deadline_ms = 100;
    let engine = harness.engine();

    let result = engine
        .execute(
            QueryRequest::new(QUERY).without_cache(),
            harness.user(Role::SuperAdmin),
        )
        .await;

    assert!(matches!(
        result,
        Err(WorkflowError::DeadlineExceeded { deadline_ms: 100 })
    ));
}

/// A degraded cache lookup must not fail the request.
#[tokio::test]
async fn test_cache_lookup_failure_is_degraded() {
    let harness = Harness::new();
    harness.embedder.pin(QUERY, pinned_query_vector());
    harness.add_chunk("c1", "P1", "D1", "alpha", vec![1.0, 0.0, 0.0, 0.0]);
    harness.add_parent("P1", "D1", "parent one");
    harness.store.set_fail_cache_ops(true);
    harness.reranker.set_score("alpha", 0.9);

    let mut harness = harness;
    harness.config.sufficiency_threshold = 0.0;
    let engine = harness.engine();

    let output = engine
        .execute(QueryRequest::new(QUERY), harness.user(Role::SuperAdmin))
        .await
        .expect("cache failures are non-fatal");

    assert_eq!(output.contexts.len(), 1);
    assert!(!output.metrics.cache_hit);
    assert!(
        output
            .metrics
            .warnings
            .iter()
            .any(|w| w.contains("cache lookup failed"))
    );
}
