use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::{ChatClient, CompletionOptions, LlmError};

/// Scriptable in-memory chat client.
///
/// Responses are keyed by system prompt, which is how the analyzer
/// distinguishes its four call kinds. Unkeyed calls echo the user prompt so
/// the pipeline stays functional without per-test scripting.
pub struct MockChatClient {
    responses: RwLock<HashMap<String, String>>,
    calls: AtomicUsize,
    calls_by_system: RwLock<HashMap<String, usize>>,
    fail: AtomicBool,
    delay: RwLock<Option<Duration>>,
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            calls_by_system: RwLock::new(HashMap::new()),
            fail: AtomicBool::new(false),
            delay: RwLock::new(None),
        }
    }

    /// Sets the reply for every call made with `system_prompt`.
    pub fn set_response(&self, system_prompt: impl Into<String>, reply: impl Into<String>) {
        self.responses.write().insert(system_prompt.into(), reply.into());
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

    /// Number of calls made with the given system prompt.
    pub fn calls_for(&self, system_prompt: &str) -> usize {
        self.calls_by_system
            .read()
            .get(system_prompt)
            .copied()
            .unwrap_or(0)
    }
}

impl ChatClient for MockChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _opts: CompletionOptions,
    ) -> Result<String, LlmError> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_system
            .write()
            .entry(system_prompt.to_string())
            .or_insert(0) += 1;

        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmError::RequestFailed {
                message: "mock failure".to_string(),
            });
        }

        if let Some(reply) = self.responses.read().get(system_prompt) {
            return Ok(reply.clone());
        }

        Ok(user_prompt.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_response_by_system_prompt() {
        let mock = MockChatClient::new();
        mock.set_response("sys-a", "scripted");

        let a = mock
            .complete("sys-a", "user", CompletionOptions::default())
            .await
            .unwrap();
        let b = mock
            .complete("sys-b", "echoed", CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(a, "scripted");
        assert_eq!(b, "echoed");
        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.calls_for("sys-a"), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mock = MockChatClient::new();
        mock.set_fail(true);
        let result = mock
            .complete("sys", "user", CompletionOptions::default())
            .await;
        assert!(result.is_err());
    }
}
