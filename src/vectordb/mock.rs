use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::error::VectorStoreError;
use super::model::{CacheHit, CachePoint, ChunkHit, SparseVector};
use crate::vectordb::VectorStore;

/// A chunk seeded into the mock store: one dense vector plus a sparse
/// term-weight map, the same shape the ingestion pipeline would index.
#[derive(Debug, Clone)]
pub struct MockChunk {
    pub child_chunk_id: String,
    pub parent_chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub dense: Vec<f32>,
    pub terms: HashMap<u32, f32>,
}

/// In-memory [`VectorStore`] with scriptable failures and call counters.
#[derive(Default)]
pub struct MockVectorStore {
    chunks: RwLock<Vec<MockChunk>>,
    cache_points: RwLock<HashMap<u64, CachePoint>>,
    dense_calls: AtomicUsize,
    sparse_calls: AtomicUsize,
    cache_search_calls: AtomicUsize,
    cache_upsert_calls: AtomicUsize,
    fail_chunk_searches: AtomicBool,
    fail_cache_ops: AtomicBool,
    search_delay: RwLock<Option<Duration>>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chunk(&self, chunk: MockChunk) {
        self.chunks.write().push(chunk);
    }

    pub fn seed_cache_point(&self, point: CachePoint) {
        self.cache_points.write().insert(point.id, point);
    }

    /// Makes every chunk-collection search fail until cleared.
    pub fn set_fail_chunk_searches(&self, fail: bool) {
        self.fail_chunk_searches.store(fail, Ordering::SeqCst);
    }

    /// Makes cache search and upsert fail until cleared.
    pub fn set_fail_cache_ops(&self, fail: bool) {
        self.fail_cache_ops.store(fail, Ordering::SeqCst);
    }

    /// Delays every search by `delay`, for deadline tests.
    pub fn set_search_delay(&self, delay: Option<Duration>) {
        *self.search_delay.write() = delay;
    }

    pub fn dense_search_calls(&self) -> usize {
        self.dense_calls.load(Ordering::SeqCst)
    }

    pub fn sparse_search_calls(&self) -> usize {
        self.sparse_calls.load(Ordering::SeqCst)
    }

    pub fn cache_search_calls(&self) -> usize {
        self.cache_search_calls.load(Ordering::SeqCst)
    }

    pub fn cache_upsert_calls(&self) -> usize {
        self.cache_upsert_calls.load(Ordering::SeqCst)
    }

    pub fn cache_point(&self, id: u64) -> Option<CachePoint> {
        self.cache_points.read().get(&id).cloned()
    }

    async fn apply_delay(&self) {
        let delay = *self.search_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn passes_filter(chunk: &MockChunk, doc_filter: Option<&HashSet<String>>) -> bool {
        doc_filter.is_none_or(|ids| ids.contains(&chunk.document_id))
    }

    fn to_hits(mut scored: Vec<(f32, MockChunk)>, limit: u64) -> Vec<ChunkHit> {
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.child_chunk_id.cmp(&b.1.child_chunk_id))
        });
        scored.truncate(limit as usize);
        scored
            .into_iter()
            .map(|(score, c)| ChunkHit {
                child_chunk_id: c.child_chunk_id,
                parent_chunk_id: c.parent_chunk_id,
                document_id: c.document_id,
                content: c.content,
                score,
            })
            .collect()
    }
}

impl VectorStore for MockVectorStore {
    async fn ensure_collection(
        &self,
        _name: &str,
        _vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn dense_search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> Result<Vec<ChunkHit>, VectorStoreError> {
        self.apply_delay().await;
        self.dense_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_chunk_searches.load(Ordering::SeqCst) {
            return Err(VectorStoreError::SearchFailed {
                collection: collection.to_string(),
                message: "mock failure".to_string(),
            });
        }

        let scored: Vec<(f32, MockChunk)> = self
            .chunks
            .read()
            .iter()
            .filter(|c| Self::passes_filter(c, doc_filter))
            .map(|c| (cosine_similarity(&vector, &c.dense), c.clone()))
            .collect();

        Ok(Self::to_hits(scored, limit))
    }

    async fn sparse_search(
        &self,
        collection: &str,
        query: SparseVector,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> Result<Vec<ChunkHit>, VectorStoreError> {
        self.apply_delay().await;
        self.sparse_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_chunk_searches.load(Ordering::SeqCst) {
            return Err(VectorStoreError::SearchFailed {
                collection: collection.to_string(),
                message: "mock failure".to_string(),
            });
        }

        let scored: Vec<(f32, MockChunk)> = self
            .chunks
            .read()
            .iter()
            .filter(|c| Self::passes_filter(c, doc_filter))
            .filter_map(|c| {
                let score: f32 = query
                    .indices
                    .iter()
                    .zip(query.values.iter())
                    .filter_map(|(idx, val)| c.terms.get(idx).map(|w| w * val))
                    .sum();
                (score > 0.0).then(|| (score, c.clone()))
            })
            .collect();

        Ok(Self::to_hits(scored, limit))
    }

    async fn search_cache(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<CacheHit>, VectorStoreError> {
        self.apply_delay().await;
        self.cache_search_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_cache_ops.load(Ordering::SeqCst) {
            return Err(VectorStoreError::SearchFailed {
                collection: collection.to_string(),
                message: "mock failure".to_string(),
            });
        }

        let mut hits: Vec<CacheHit> = self
            .cache_points
            .read()
            .values()
            .map(|p| CacheHit {
                id: p.id,
                score: cosine_similarity(&vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn upsert_cache_entry(
        &self,
        collection: &str,
        point: CachePoint,
    ) -> Result<(), VectorStoreError> {
        self.cache_upsert_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_cache_ops.load(Ordering::SeqCst) {
            return Err(VectorStoreError::UpsertFailed {
                collection: collection.to_string(),
                message: "mock failure".to_string(),
            });
        }

        self.cache_points.write().insert(point.id, point);
        Ok(())
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 on mismatch or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
