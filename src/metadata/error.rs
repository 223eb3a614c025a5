use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the parent-chunk metadata store.
pub enum MetadataError {
    /// The batched lookup failed.
    #[error("parent fetch failed: {message}")]
    FetchFailed {
        /// Error message.
        message: String,
    },
}
