use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the chat-completion client.
pub enum LlmError {
    /// The client configuration is unusable.
    #[error("invalid LLM client config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// The HTTP request failed (connect, send, or read).
    #[error("LLM request failed: {message}")]
    RequestFailed {
        /// Error message.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("LLM service returned {status}: {body}")]
    ServiceError {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed LLM response: {reason}")]
    MalformedResponse {
        /// What was missing or wrong.
        reason: String,
    },
}
