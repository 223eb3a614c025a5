use thiserror::Error;

#[derive(Debug, Error)]
/// Fatal workflow errors. Degraded paths (cache, probe variants, reranker,
/// analyzer artifacts, parent fetches) never appear here; they surface as
/// warnings inside [`crate::workflow::WorkflowMetrics`].
pub enum WorkflowError {
    /// The request failed shape validation. No side effects occurred.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong.
        reason: String,
    },

    /// The base query embedding could not be produced.
    #[error("query embedding unavailable: {reason}")]
    EmbeddingUnavailable {
        /// Underlying failure.
        reason: String,
    },

    /// The access filter could not be built. Failing closed.
    #[error("access filter could not be built: {reason}")]
    AccessDenied {
        /// Underlying failure.
        reason: String,
    },

    /// Every retrieval probe failed.
    #[error("retrieval failed: {reason}")]
    RetrievalFailed {
        /// Underlying failure.
        reason: String,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The request-wide deadline elapsed.
    #[error("request deadline of {deadline_ms}ms exceeded")]
    DeadlineExceeded {
        /// Configured deadline.
        deadline_ms: u64,
    },
}
