//! Error types for the query service.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing caller input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The embedder could not produce a vector.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The vector index query failed.
    #[error("Index query error: {0}")]
    IndexQuery(String),

    /// The record store lookup failed as a whole.
    #[error("Store error: {0}")]
    Store(String),

    /// A retrieved record is missing its description, or it is not text.
    #[error("Malformed record '{id}': {reason}")]
    MalformedRecord { id: String, reason: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation exceeded its deadline.
    #[error("Operation '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// HTTP API error.
    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable, machine-readable error kind.
    ///
    /// This string (never the formatted message) is what crosses the HTTP
    /// boundary for server-side failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Embedding(_) => "embedding_error",
            Error::IndexQuery(_) => "index_query_error",
            Error::Store(_) => "store_error",
            Error::MalformedRecord { .. } => "malformed_record",
            Error::Config(_) => "config_error",
            Error::Timeout { .. } => "timeout",
            Error::Api(_) => "api_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the failure was caused by the caller.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_validation_is_client_error() {
        assert!(Error::Validation("x".into()).is_client_error());
        assert!(!Error::Store("x".into()).is_client_error());
        assert!(!Error::MalformedRecord {
            id: "1".into(),
            reason: "x".into()
        }
        .is_client_error());
    }

    #[test]
    fn test_kind_does_not_carry_message() {
        let err = Error::Store("password=hunter2 connection refused".into());
        assert_eq!(err.kind(), "store_error");
        assert!(!err.kind().contains("hunter2"));
    }
}
