use thiserror::Error;

#[derive(Debug, Error)]
/// Errors raised while loading or validating configuration.
pub enum ConfigError {
    /// An environment variable held a value that does not parse.
    #[error("failed to parse {key}: '{value}' ({reason})")]
    ParseError {
        /// Environment variable name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A parsed value is outside its allowed range.
    #[error("invalid value for {key}: {reason}")]
    OutOfRange {
        /// Environment variable name.
        key: &'static str,
        /// Constraint description.
        reason: String,
    },

    /// A derived subsystem configuration was rejected.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Constraint description.
        reason: String,
    },
}
