//! Qdrant vector store integration: chunk probes and the cache collection.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;

#[cfg(test)]
mod tests;

pub use client::{QdrantVectorStore, VectorStore};
pub use error::VectorStoreError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockChunk, MockVectorStore, cosine_similarity};
pub use model::{CacheHit, CachePayload, CachePoint, ChunkHit, SparseVector};

/// Collection holding indexed child chunks.
pub const DEFAULT_CHUNK_COLLECTION: &str = "trawl_chunks";

/// Collection holding semantic cache entries. Kept in a namespace distinct
/// from the chunk collection so cache rows can never leak into a probe.
pub const DEFAULT_CACHE_COLLECTION: &str = "trawl_semantic_cache";

/// Name of the chunk collection's sparse vector.
pub const SPARSE_VECTOR_NAME: &str = "sparse";

pub const DEFAULT_VECTOR_SIZE: u64 = crate::constants::DEFAULT_VECTOR_SIZE_U64;
