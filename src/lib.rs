//! # Trawl
//!
//! Adaptive retrieval workflow engine for RAG pipelines.
//!
//! Trawl sits between a hosting service and its retrieval infrastructure
//! (vector store, metadata store, model providers) and answers one
//! question: given a user query, which enriched passages should ground the
//! response?
//!
//! ```text
//! Request → cache check → analyze → access filter
//!         → hybrid probes → RRF fusion → rerank → enrich
//!         → sufficiency {retry | decompose | proceed}
//!         → output → cache store
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trawl::{Config, QueryRequest};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! # fn _t(c: &Config) {}
//! let config = Config::from_env()?;
//! let request = QueryRequest::new("what is the refund window?").with_top_k(5);
//! # _t(&config); let _ = request;
//! # Ok(())
//! # }
//! ```
//!
//! Construct a [`WorkflowEngine`] with your port implementations (Qdrant,
//! HTTP model clients, your metadata and ACL backends) and call
//! [`WorkflowEngine::execute`] per request. The `mock` feature provides
//! in-memory ports for tests.
//!
//! ## Feature flags
//!
//! | Feature | Purpose |
//! |---------|---------|
//! | `mock` | In-memory port implementations for tests/examples |
//!
//! ## Modules
//!
//! - [`workflow`] - Engine, state, controller, metrics
//! - [`analyze`] - Query rewrite, HyDE, reformulation, decomposition
//! - [`access`] - Per-user document visibility filters
//! - [`retrieve`] - Concurrent dense/sparse probes
//! - [`fusion`] - Reciprocal rank fusion
//! - [`rerank`] - Cross-encoder reranking with fallback
//! - [`enrich`] - Small-to-big parent enrichment
//! - [`cache`] - Semantic cache (public content only)
//! - [`vectordb`] - Qdrant integration
//! - [`config`] - Environment-backed configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod access;
pub mod analyze;
pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod enrich;
pub mod fusion;
pub mod hashing;
pub mod llm;
pub mod metadata;
pub mod rerank;
pub mod retrieve;
pub mod types;
pub mod vectordb;
pub mod workflow;

// Re-exported so callers of `execute_with_token` need no direct tokio-util
// dependency.
pub use tokio_util::sync::CancellationToken;

pub use access::{AccessControl, AccessError, AccessFilter, AccessType, FilterBuilder};
#[cfg(any(test, feature = "mock"))]
pub use access::MockAccessControl;

pub use analyze::{
    AnalyzerConfig, AnalyzerKnobs, QueryAnalysis, QueryAnalyzer, Reformulation, needs_rewrite,
};

pub use cache::{CacheConfig, CacheError, CacheLookup, SemanticCache, WriteOutcome};

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "mock"))]
pub use clock::FixedClock;

pub use config::{Config, ConfigError, DEFAULT_QDRANT_URL};

pub use embedding::{
    EmbeddingClient, EmbeddingClientConfig, EmbeddingError, HttpEmbeddingClient,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbeddingClient;

pub use enrich::{EnrichOutcome, Enricher, EnricherConfig};

pub use fusion::{FusedResult, fuse};

pub use hashing::{cache_point_id, hash_term_u32, hash_to_u64};

pub use llm::{ChatClient, ChatClientConfig, CompletionOptions, HttpChatClient, LlmError};
#[cfg(any(test, feature = "mock"))]
pub use llm::MockChatClient;

pub use metadata::{MetadataError, ParentChunk, ParentStore};
#[cfg(any(test, feature = "mock"))]
pub use metadata::MockParentStore;

pub use rerank::{
    HttpRerankClient, RerankClient, RerankClientConfig, RerankError, RerankScore, RerankStage,
    RerankStageConfig, RerankStageOutput, RerankedResult,
};
#[cfg(any(test, feature = "mock"))]
pub use rerank::MockRerankClient;

pub use retrieve::{
    HybridRetriever, ProbeOutcome, ProbeResult, ProbeSource, RetrieveError, RetrieverConfig,
    sparse_query,
};

pub use types::{ChildHit, Context, QueryRequest, RetrievalMode, Role, UserContext};

pub use vectordb::{
    CacheHit, CachePayload, CachePoint, ChunkHit, DEFAULT_CACHE_COLLECTION,
    DEFAULT_CHUNK_COLLECTION, QdrantVectorStore, SparseVector, VectorStore, VectorStoreError,
};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::{MockChunk, MockVectorStore, cosine_similarity};

pub use workflow::{
    Decision, RetrievalOutput, SufficiencyConfig, SufficiencyReport, WorkflowEngine,
    WorkflowError, WorkflowMetrics, WorkflowStage, WorkflowState,
};
