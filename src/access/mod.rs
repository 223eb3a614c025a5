//! Per-user document visibility: ACL port, access filter, filter builder.
//!
//! Every index probe carries the filter produced here; there is no code
//! path that reaches the vector store without one.

pub mod error;
pub mod filter;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::AccessError;
pub use filter::{AccessFilter, FilterBuilder};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockAccessControl;

use std::collections::{HashMap, HashSet};

use crate::types::Role;

/// Visibility class of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// Readable by every user; the only class the semantic cache may hold.
    Public,
    /// Readable only by explicitly granted users.
    Restricted,
}

/// Port to the access-control service.
pub trait AccessControl: Send + Sync {
    /// Document ids visible to `user_id` (public plus explicitly granted).
    fn visible_document_ids(
        &self,
        user_id: &str,
        role: Role,
    ) -> impl std::future::Future<Output = Result<HashSet<String>, AccessError>> + Send;

    /// Access class per document id. Unknown ids may be omitted from the
    /// result; callers must treat absence as not-public.
    fn document_access_types(
        &self,
        document_ids: &[String],
    ) -> impl std::future::Future<Output = Result<HashMap<String, AccessType>, AccessError>> + Send;
}
