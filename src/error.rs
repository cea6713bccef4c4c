//! Error types for the query factory.

use std::fmt;

/// Result type for query-kit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bound fetch/mutate functions and the in-memory registry.
///
/// Every bound function returns `Result<T>`. Which variant surfaces tells the
/// caller where the failure happened:
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The raw call resolved, but its envelope carried an error.
    ///
    /// Produced by the host's [`ErrorMapper`](crate::response::ErrorMapper).
    /// Whether the end user was notified depends on the reporting flag the
    /// mapper was invoked with, not on this variant.
    Response(String),

    /// The envelope carried neither `data` nor `error`.
    EmptyResponse,

    /// The raw call itself failed (network failure, abort, ...).
    ///
    /// Never passed through the error mapper: it propagates unchanged to
    /// whatever awaits the bound function.
    ///
    /// **Recovery:** Retry according to the operation's `retry` option.
    Transport(String),

    /// The cache registry rejected an invalidation request.
    ///
    /// When this surfaces from a mutation's success handler, the
    /// caller-supplied success callback was skipped.
    Invalidation(String),

    /// The operation observed its cancellation token.
    Cancelled,

    /// Converting a value into the registry's storage form failed.
    SerializationError(String),

    /// Cached data could not be read back as the requested type.
    ///
    /// **Recovery:** Remove the entry and refetch.
    DeserializationError(String),

    /// Invalid construction-time configuration.
    ///
    /// Example: building an auto-save coordinator from an action that has no
    /// initial data.
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Response(msg) => write!(f, "Response error: {}", msg),
            Error::EmptyResponse => write!(f, "Response carried neither data nor error"),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::Invalidation(msg) => write!(f, "Invalidation error: {}", msg),
            Error::Cancelled => write!(f, "Cancelled"),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Transport("connection reset".to_string());
        assert_eq!(err.to_string(), "Transport error: connection reset");
        assert_eq!(Error::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_error_from_string() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        assert!(matches!(Error::from(parse), Error::DeserializationError(_)));
    }
}
