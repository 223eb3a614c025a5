//! Semantic cache: nearest-neighbor lookup over past answers and a
//! conditional, public-content-only store.
//!
//! The safety rule lives entirely at write time: an entry is written only
//! when every document it references is public at that moment, so reads
//! stay a single vector search with no per-user check. The cache therefore
//! may be served to any user, which is exactly why restricted content must
//! never enter it.

pub mod error;


pub use error::CacheError;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::access::{AccessControl, AccessType};
use crate::clock::Clock;
use crate::constants::{DEFAULT_CACHE_SIMILARITY_THRESHOLD, DEFAULT_CACHE_TTL_SECONDS};
use crate::hashing::cache_point_id;
use crate::types::Context;
use crate::vectordb::{CachePayload, CachePoint, VectorStore};

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Master switch; per-request `use_cache` can only narrow it.
    pub enabled: bool,
    /// Cosine similarity a candidate must reach to count as a hit.
    pub similarity_threshold: f32,
    /// Entry time-to-live. Expired rows are evicted by a background sweep;
    /// lookups also ignore them so a stale row is never served.
    pub ttl: Duration,
    /// Cache collection name, namespaced apart from the chunk collection.
    pub collection_name: String,
    /// Deadline for the write-time document access check.
    pub acl_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: DEFAULT_CACHE_SIMILARITY_THRESHOLD,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            collection_name: crate::vectordb::DEFAULT_CACHE_COLLECTION.to_string(),
            acl_timeout: Duration::from_millis(300),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), CacheError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) || self.similarity_threshold == 0.0 {
            return Err(CacheError::InvalidConfig {
                reason: format!(
                    "similarity_threshold must be in (0, 1], got {}",
                    self.similarity_threshold
                ),
            });
        }
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig {
                reason: "ttl must be non-zero".to_string(),
            });
        }
        if self.collection_name.trim().is_empty() {
            return Err(CacheError::InvalidConfig {
                reason: "collection_name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A cache hit ready to return to the caller.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub contexts: Vec<Context>,
    /// Query text the entry was stored under.
    pub query_text: String,
    /// Similarity between the live query and the stored one.
    pub similarity: f32,
    pub created_at_ms: i64,
}

/// What a store attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Entry written.
    Stored,
    /// Write refused by the safety gate (restricted or uncheckable docs).
    Suppressed {
        /// Why the gate refused.
        reason: String,
    },
    /// Nothing to do (cache disabled or empty result set).
    Skipped {
        /// Why nothing was written.
        reason: String,
    },
}

/// Semantic cache over the vector store's cache collection.
pub struct SemanticCache<V, A, K> {
    vectors: Arc<V>,
    acl: Arc<A>,
    clock: Arc<K>,
    config: CacheConfig,
}

impl<V: VectorStore, A: AccessControl, K: Clock> SemanticCache<V, A, K> {
    pub fn new(
        vectors: Arc<V>,
        acl: Arc<A>,
        clock: Arc<K>,
        config: CacheConfig,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        Ok(Self {
            vectors,
            acl,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up the nearest cached entry for `query_embedding`.
    ///
    /// Returns `Ok(None)` when caching is off, nothing is similar enough,
    /// or the best candidate has expired.
    #[instrument(skip_all, fields(enabled = enabled))]
    pub async fn lookup(
        &self,
        query_embedding: &[f32],
        enabled: bool,
    ) -> Result<Option<CacheLookup>, CacheError> {
        if !self.config.enabled || !enabled {
            return Ok(None);
        }

        let hits = self
            .vectors
            .search_cache(&self.config.collection_name, query_embedding.to_vec(), 1)
            .await
            .map_err(|source| CacheError::LookupFailed { source })?;

        let Some(best) = hits.into_iter().next() else {
            debug!("Cache empty");
            return Ok(None);
        };

        if best.score < self.config.similarity_threshold {
            debug!(
                similarity = best.score,
                threshold = self.config.similarity_threshold,
                "Best cache candidate below threshold"
            );
            return Ok(None);
        }

        if best.payload.expires_at_ms <= self.clock.now_ms() {
            debug!(point_id = best.id, "Best cache candidate expired");
            return Ok(None);
        }

        let contexts: Vec<Context> = serde_json::from_str(&best.payload.contexts_json).map_err(
            |e| CacheError::CorruptEntry {
                point_id: best.id,
                reason: e.to_string(),
            },
        )?;

        info!(
            similarity = best.score,
            contexts = contexts.len(),
            "Semantic cache hit"
        );

        Ok(Some(CacheLookup {
            contexts,
            query_text: best.payload.query_text,
            similarity: best.score,
            created_at_ms: best.payload.created_at_ms,
        }))
    }

    /// Conditionally stores a result set.
    ///
    /// The write happens only when the access check confirms every
    /// referenced document is public. A failed or timed-out check
    /// suppresses the write; it never defaults to writing.
    #[instrument(skip_all, fields(contexts = contexts.len(), enabled = enabled))]
    pub async fn store(
        &self,
        query: &str,
        query_embedding: Vec<f32>,
        contexts: &[Context],
        enabled: bool,
    ) -> Result<WriteOutcome, CacheError> {
        if !self.config.enabled || !enabled {
            return Ok(WriteOutcome::Skipped {
                reason: "cache disabled".to_string(),
            });
        }

        if contexts.is_empty() {
            // An empty result is shaped by this user's ACL; serving it to
            // other users from the cache would be wrong even though the
            // public-document check is vacuously satisfied.
            return Ok(WriteOutcome::Skipped {
                reason: "empty result set".to_string(),
            });
        }

        let document_ids: Vec<String> = contexts
            .iter()
            .map(|c| c.document_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let check = self.acl.document_access_types(&document_ids);
        let access_types = match tokio::time::timeout(self.config.acl_timeout, check).await {
            Ok(Ok(types)) => types,
            Ok(Err(e)) => {
                warn!(error = %e, "Access check failed, suppressing cache write");
                return Ok(WriteOutcome::Suppressed {
                    reason: format!("access check failed: {e}"),
                });
            }
            Err(_) => {
                warn!("Access check timed out, suppressing cache write");
                return Ok(WriteOutcome::Suppressed {
                    reason: "access check timed out".to_string(),
                });
            }
        };

        let non_public: Vec<&String> = document_ids
            .iter()
            .filter(|id| access_types.get(*id) != Some(&AccessType::Public))
            .collect();

        if !non_public.is_empty() {
            info!(
                non_public = non_public.len(),
                "Result references non-public documents, suppressing cache write"
            );
            return Ok(WriteOutcome::Suppressed {
                reason: format!("{} non-public document(s) referenced", non_public.len()),
            });
        }

        let contexts_json =
            serde_json::to_string(contexts).map_err(|e| CacheError::CorruptEntry {
                point_id: cache_point_id(query),
                reason: e.to_string(),
            })?;

        let now_ms = self.clock.now_ms();
        let point = CachePoint {
            id: cache_point_id(query),
            vector: query_embedding,
            payload: CachePayload {
                query_text: query.to_string(),
                contexts_json,
                created_at_ms: now_ms,
                expires_at_ms: now_ms + self.config.ttl.as_millis() as i64,
            },
        };

        self.vectors
            .upsert_cache_entry(&self.config.collection_name, point)
            .await
            .map_err(|source| CacheError::WriteFailed { source })?;

        debug!("Cache entry stored");
        Ok(WriteOutcome::Stored)
    }

    /// Ensures the cache collection exists.
    pub async fn ensure_collection(&self, vector_size: u64) -> Result<(), CacheError> {
        self.vectors
            .ensure_collection(&self.config.collection_name, vector_size)
            .await
            .map_err(|source| CacheError::WriteFailed { source })
    }
}
