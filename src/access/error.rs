use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the access-control port and filter builder.
pub enum AccessError {
    /// The ACL service call failed.
    #[error("access control lookup failed: {message}")]
    LookupFailed {
        /// Error message.
        message: String,
    },

    /// The ACL service did not answer within its deadline.
    #[error("access control lookup timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured deadline.
        timeout_ms: u64,
    },
}
