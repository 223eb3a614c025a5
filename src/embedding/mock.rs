use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::{EmbeddingClient, EmbeddingError};
use crate::hashing::hash_to_u64;

/// Deterministic in-memory embedder.
///
/// Unknown texts get a unit vector derived from their hash so distinct texts
/// land far apart; tests can pin exact vectors per text to control
/// similarity relationships.
pub struct MockEmbeddingClient {
    dim: usize,
    pinned: RwLock<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: RwLock<Option<Duration>>,
}

impl MockEmbeddingClient {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            pinned: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: RwLock::new(None),
        }
    }

    /// Pins the exact vector returned for `text`.
    pub fn pin(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.pinned.write().insert(text.into(), vector);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn derive(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dim);
        let mut seed = hash_to_u64(text.as_bytes());
        for _ in 0..self.dim {
            // xorshift keeps the vector deterministic per text
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            vector.push(((seed % 2_000) as f32 / 1_000.0) - 1.0);
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl EmbeddingClient for MockEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::RequestFailed {
                message: "mock failure".to_string(),
            });
        }

        if let Some(vector) = self.pinned.read().get(text) {
            return Ok(vector.clone());
        }

        Ok(self.derive(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let mock = MockEmbeddingClient::new(8);
        let a = mock.embed("hello").await.unwrap();
        let b = mock.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_distinct_texts_differ() {
        let mock = MockEmbeddingClient::new(8);
        let a = mock.embed("hello").await.unwrap();
        let b = mock.embed("goodbye").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_pinned_vector_wins() {
        let mock = MockEmbeddingClient::new(2);
        mock.pin("query", vec![1.0, 0.0]);
        assert_eq!(mock.embed("query").await.unwrap(), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mock = MockEmbeddingClient::new(2);
        mock.set_fail(true);
        assert!(mock.embed("query").await.is_err());
    }
}
