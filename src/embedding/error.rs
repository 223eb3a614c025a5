use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the embedding service client.
pub enum EmbeddingError {
    /// The service endpoint configuration is unusable.
    #[error("invalid embedding client config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// The HTTP request failed (connect, send, or read).
    #[error("embedding request failed: {message}")]
    RequestFailed {
        /// Error message.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("embedding service returned {status}: {body}")]
    ServiceError {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed embedding response: {reason}")]
    MalformedResponse {
        /// What was missing or wrong.
        reason: String,
    },
}
