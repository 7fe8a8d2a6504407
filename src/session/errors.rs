//! # Session Errors
//!
//! Failures raised by the persistence runtime while creating or
//! executing queries.

use thiserror::Error;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Persistence runtime errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// A single-result fetch matched no rows
    #[error("No result found for query")]
    NoResult,

    /// A single-result fetch matched more than one row
    #[error("Query returned {0} results where one was expected")]
    NonUniqueResult(usize),

    /// A parameter referenced by the query was never bound
    #[error("Parameter {0} is not bound")]
    UnboundParameter(String),

    /// The bound parameter is not part of the query
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// The bound value does not match the parameter's declared type
    #[error("Invalid value for parameter {name}: expected {expected}")]
    InvalidParameterValue { name: String, expected: &'static str },

    /// The query references an entity the session does not manage
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// The query text or structure cannot be executed
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// A result row could not be mapped to the requested type
    #[error("Result mapping failed: {0}")]
    Mapping(String),

    /// Failure injected into the in-memory runtime
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl SessionError {
    /// Get error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoResult => "NO_RESULT",
            Self::NonUniqueResult(_) => "NON_UNIQUE_RESULT",
            Self::UnboundParameter(_) => "UNBOUND_PARAMETER",
            Self::UnknownParameter(_) => "UNKNOWN_PARAMETER",
            Self::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            Self::UnknownEntity(_) => "UNKNOWN_ENTITY",
            Self::MalformedQuery(_) => "MALFORMED_QUERY",
            Self::Mapping(_) => "MAPPING_FAILED",
            Self::Injected(_) => "INJECTED_FAILURE",
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedQuery(msg.into())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Mapping(e.to_string())
    }
}
