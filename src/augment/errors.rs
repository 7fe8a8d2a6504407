//! # Augmentation Errors

use thiserror::Error;

use crate::session::SessionError;

pub type AugmentResult<T> = Result<T, AugmentError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AugmentError {
    /// The provider cannot produce the text of the query being augmented
    #[error("Query text cannot be extracted from this query")]
    QueryTextUnavailable,

    /// No primary alias could be found in the query text
    #[error("No alias detected in query: {0}")]
    AliasNotDetected(String),

    /// An augmentor refused the context
    #[error("Augmentor {augmentor} rejected query: {reason}")]
    Rejected { augmentor: String, reason: String },

    /// The session failed to build or bind the rewritten query
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AugmentError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryTextUnavailable => "QUERY_TEXT_UNAVAILABLE",
            Self::AliasNotDetected(_) => "ALIAS_NOT_DETECTED",
            Self::Rejected { .. } => "AUGMENTATION_REJECTED",
            Self::Session(e) => e.code(),
        }
    }

    pub fn rejected(augmentor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            augmentor: augmentor.into(),
            reason: reason.into(),
        }
    }
}
