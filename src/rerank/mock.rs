use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::{RerankClient, RerankError, RerankScore};

/// Scriptable in-memory reranker. Scores are looked up by candidate text;
/// unknown texts get a neutral 0.5.
#[derive(Default)]
pub struct MockRerankClient {
    scores: RwLock<HashMap<String, f32>>,
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: RwLock<Option<Duration>>,
}

impl MockRerankClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the score returned for a candidate text.
    pub fn set_score(&self, text: impl Into<String>, score: f32) {
        self.scores.write().insert(text.into(), score);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Delays every call, for deadline tests.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RerankClient for MockRerankClient {
    async fn rerank(&self, _query: &str, texts: &[String]) -> Result<Vec<RerankScore>, RerankError> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(RerankError::RequestFailed {
                message: "mock failure".to_string(),
            });
        }

        let scores = self.scores.read();
        Ok(texts
            .iter()
            .enumerate()
            .map(|(index, text)| RerankScore {
                index,
                score: scores.get(text).copied().unwrap_or(0.5),
            })
            .collect())
    }
}
