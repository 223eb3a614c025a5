use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the cross-encoder reranker client.
pub enum RerankError {
    /// The client configuration is unusable.
    #[error("invalid reranker config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// The HTTP request failed (connect, send, or read).
    #[error("rerank request failed: {message}")]
    RequestFailed {
        /// Error message.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("reranker returned {status}: {body}")]
    ServiceError {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed rerank response: {reason}")]
    MalformedResponse {
        /// What was missing or wrong.
        reason: String,
    },
}
