//! Parent-chunk metadata store port.
//!
//! The relational store behind this port is an external collaborator; the
//! core only ever performs one batched parent lookup per enrichment pass.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::MetadataError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockParentStore;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A parent passage enclosing one or more indexed child chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentChunk {
    pub parent_chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub tokens: u32,
    pub metadata: HashMap<String, String>,
}

/// Port to the metadata store.
pub trait ParentStore: Send + Sync {
    /// Fetches parent bodies for `ids` in one batch.
    ///
    /// Ids with no stored parent are silently omitted from the result;
    /// callers drop the child hits that referenced them.
    fn fetch_parents(
        &self,
        ids: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<ParentChunk>, MetadataError>> + Send;
}
