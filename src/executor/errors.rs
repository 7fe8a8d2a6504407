//! # Query Errors
//!
//! Failures surfaced by `QueryExecutor`. Session and augmentation
//! failures pass through unchanged; the executor adds only
//! precondition violations.

use thiserror::Error;

use crate::augment::AugmentError;
use crate::session::SessionError;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// A caller or augmentor broke an executor precondition
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Augmentation(#[from] AugmentError),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "PRECONDITION_VIOLATED",
            Self::Session(e) => e.code(),
            Self::Augmentation(e) => e.code(),
        }
    }

    /// True for a single-result fetch that matched nothing
    pub fn is_no_result(&self) -> bool {
        matches!(self, Self::Session(SessionError::NoResult))
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }
}
