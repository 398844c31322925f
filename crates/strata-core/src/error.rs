//! Shared error type across strata crates.

use thiserror::Error;

/// Stable error codes used in log fields and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing configuration.
    Config,
    /// Datastore unreachable or authentication failed.
    Connection,
    /// Malformed SQL, type mismatch, driver timeout.
    Query,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Connection => "CONNECTION",
            ErrorKind::Query => "QUERY",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("config: {0}")]
    Config(String),
    #[error("connection: {0}")]
    Connection(String),
    #[error("query: {0}")]
    Query(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl StrataError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StrataError::Config(_) => ErrorKind::Config,
            StrataError::Connection(_) => ErrorKind::Connection,
            StrataError::Query(_) => ErrorKind::Query,
            StrataError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the datastore could not be reached at all.
    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}
