use thiserror::Error;

#[derive(Debug, Error)]
/// Errors surfaced by the hybrid retriever.
pub enum RetrieveError {
    /// Every probe failed; there is nothing to rank.
    #[error("all {attempted} retrieval probes failed")]
    AllProbesFailed {
        /// Number of probes attempted.
        attempted: usize,
    },

    /// The request was cancelled while probes were in flight.
    #[error("retrieval cancelled")]
    Cancelled,
}
