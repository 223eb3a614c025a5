//! Shared mock-backed engine harness for workflow tests.

use std::collections::HashMap;
use std::sync::Arc;

use trawl::{
    Config, FixedClock, MockAccessControl, MockChatClient, MockChunk, MockEmbeddingClient,
    MockParentStore, MockRerankClient, MockVectorStore, ParentChunk, Role, UserContext,
    WorkflowEngine,
};

pub const NOW_MS: i64 = 1_700_000_000_000;

/// Embedding dimension used by every mock in these tests.
pub const DIM: usize = 4;

pub type MockEngine = WorkflowEngine<
    MockVectorStore,
    MockEmbeddingClient,
    MockChatClient,
    MockRerankClient,
    MockParentStore,
    MockAccessControl,
    FixedClock,
>;

pub struct Harness {
    pub store: Arc<MockVectorStore>,
    pub embedder: Arc<MockEmbeddingClient>,
    pub chat: Arc<MockChatClient>,
    pub reranker: Arc<MockRerankClient>,
    pub parents: Arc<MockParentStore>,
    pub acl: Arc<MockAccessControl>,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("trawl=debug")
            .with_test_writer()
            .try_init();

        Self {
            store: Arc::new(MockVectorStore::new()),
            embedder: Arc::new(MockEmbeddingClient::new(DIM)),
            chat: Arc::new(MockChatClient::new()),
            reranker: Arc::new(MockRerankClient::new()),
            parents: Arc::new(MockParentStore::new()),
            acl: Arc::new(MockAccessControl::new()),
            config: Config::default(),
        }
    }

    pub fn engine(&self) -> MockEngine {
        WorkflowEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            Arc::clone(&self.chat),
            Arc::clone(&self.reranker),
            Arc::clone(&self.parents),
            Arc::clone(&self.acl),
            Arc::new(FixedClock(NOW_MS)),
            self.config.clone(),
        )
        .expect("engine construction")
    }

    /// Seeds a child chunk with a pinned dense vector and no sparse terms.
    pub fn add_chunk(&self, child: &str, parent: &str, doc: &str, content: &str, dense: Vec<f32>) {
        self.store.add_chunk(MockChunk {
            child_chunk_id: child.to_string(),
            parent_chunk_id: parent.to_string(),
            document_id: doc.to_string(),
            content: content.to_string(),
            dense,
            terms: HashMap::new(),
        });
    }

    pub fn add_parent(&self, parent: &str, doc: &str, content: &str) {
        self.parents.add_parent(ParentChunk {
            parent_chunk_id: parent.to_string(),
            document_id: doc.to_string(),
            content: content.to_string(),
            tokens: 1800,
            metadata: HashMap::new(),
        });
    }

    pub fn user(&self, role: Role) -> UserContext {
        UserContext::new("u-1", role, "u-1@example.com")
    }
}
