use qdrant_client::qdrant::ScoredPoint;
use qdrant_client::qdrant::point_id::PointIdOptions;
use serde::{Deserialize, Serialize};

/// A child-chunk hit returned by a dense or sparse probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub child_chunk_id: String,
    pub parent_chunk_id: String,
    pub document_id: String,
    pub content: String,
    /// Native score of the probe that produced this hit (cosine or BM25-like).
    pub score: f32,
}

impl ChunkHit {
    /// Maps a qdrant scored point from the chunk collection.
    ///
    /// Points missing any of the required payload fields are dropped; the
    /// ingestion pipeline owns the payload schema and malformed points are
    /// not worth failing a probe over.
    pub fn from_scored_point(point: ScoredPoint) -> Option<Self> {
        let payload = point.payload;

        let child_chunk_id = payload.get("child_chunk_id")?.as_str()?.to_string();
        let parent_chunk_id = payload.get("parent_chunk_id")?.as_str()?.to_string();
        let document_id = payload.get("document_id")?.as_str()?.to_string();
        let content = payload.get("content")?.as_str()?.to_string();

        Some(Self {
            child_chunk_id,
            parent_chunk_id,
            document_id,
            content,
            score: point.score,
        })
    }
}

/// Query-side sparse vector (term-hash indices with weights).
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Payload stored alongside a semantic cache point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePayload {
    pub query_text: String,
    /// Serialized `Vec<Context>`, kept opaque to the store.
    pub contexts_json: String,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
}

/// A point to upsert into the cache collection.
#[derive(Debug, Clone)]
pub struct CachePoint {
    /// Content-addressed id, see [`crate::hashing::cache_point_id`].
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: CachePayload,
}

/// A nearest-neighbor hit from the cache collection.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub id: u64,
    pub score: f32,
    pub payload: CachePayload,
}

impl CacheHit {
    /// Maps a qdrant scored point from the cache collection.
    pub fn from_scored_point(point: ScoredPoint) -> Option<Self> {
        let id = match point.id.and_then(|pid| pid.point_id_options) {
            Some(PointIdOptions::Num(n)) => n,
            _ => return None,
        };

        let payload = point.payload;

        let query_text = payload.get("query_text")?.as_str()?.to_string();
        let contexts_json = payload.get("contexts_json")?.as_str()?.to_string();
        let created_at_ms = payload.get("created_at_ms")?.as_integer()?;
        let expires_at_ms = payload.get("expires_at_ms")?.as_integer()?;

        Some(Self {
            id,
            score: point.score,
            payload: CachePayload {
                query_text,
                contexts_json,
                created_at_ms,
                expires_at_ms,
            },
        })
    }
}
