//! Request, user, and context types shared across the workflow.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TOP_K, MAX_TOP_K, MIN_TOP_K};

/// What the caller wants back from the workflow.
///
/// `Generation` is reserved for a future answer-synthesis mode; the engine
/// currently treats it exactly like `RetrievalOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    RetrievalOnly,
    Generation,
}

/// A single retrieval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language query text. Must be non-empty.
    pub text: String,
    /// Requested mode.
    pub mode: RetrievalMode,
    /// Number of contexts to return, within `[1, 50]`.
    pub top_k: usize,
    /// Per-request semantic cache opt-out.
    pub use_cache: bool,
}

impl QueryRequest {
    /// Creates a retrieval-only request with default `top_k` and caching on.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: RetrievalMode::RetrievalOnly,
            top_k: DEFAULT_TOP_K,
            use_cache: true,
        }
    }

    /// Overrides `top_k`.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Disables the semantic cache for this request.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Validates the request shape. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("query text must not be empty".to_string());
        }
        if self.top_k < MIN_TOP_K || self.top_k > MAX_TOP_K {
            return Err(format!(
                "top_k must be within [{}, {}], got {}",
                MIN_TOP_K, MAX_TOP_K, self.top_k
            ));
        }
        Ok(())
    }
}

/// Role of the authenticated user, as asserted by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

/// The authenticated user a request runs as. Immutable for the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub role: Role,
    pub email: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, role: Role, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            email: email.into(),
        }
    }
}

/// A reranked child passage retained inside an enriched context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildHit {
    pub chunk_id: String,
    pub content: String,
    pub score: f32,
}

/// An enriched parent passage, the unit returned to callers.
///
/// `best_score` is the maximum rerank score among `child_hits`; the final
/// list is ordered descending by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub parent_chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub tokens: u32,
    pub metadata: HashMap<String, String>,
    pub best_score: f32,
    pub child_hits: Vec<ChildHit>,
}
