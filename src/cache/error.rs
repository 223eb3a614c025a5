use thiserror::Error;

use crate::vectordb::VectorStoreError;

#[derive(Debug, Error)]
/// Errors surfaced by the semantic cache. All of them are degraded-path
/// from the workflow's perspective; the engine records them and proceeds.
pub enum CacheError {
    /// The nearest-neighbor lookup failed.
    #[error("cache lookup failed: {source}")]
    LookupFailed {
        /// Underlying store error.
        #[source]
        source: VectorStoreError,
    },

    /// The cache write failed.
    #[error("cache write failed: {source}")]
    WriteFailed {
        /// Underlying store error.
        #[source]
        source: VectorStoreError,
    },

    /// A stored entry could not be decoded.
    #[error("corrupt cache entry {point_id}: {reason}")]
    CorruptEntry {
        /// Point id of the bad entry.
        point_id: u64,
        /// What failed to decode.
        reason: String,
    },

    /// The cache configuration is unusable.
    #[error("invalid cache config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
}
