//! Query augmentation
//!
//! Extensions (multi-tenancy filters, soft-delete guards, auditing) can
//! rewrite a query before it executes. A query travels through the
//! augmentation engine wrapped in a context:
//!
//! - `CriteriaQueryContext`: a criteria query plus its root
//! - `StringQueryContext`: an executable text query, rewritten textually
//!
//! Contexts are values. An augmentor receives a context and returns a
//! new one; the input is never edited in place.

mod context;
mod engine;
mod errors;
pub mod query_utils;
mod string_context;

use std::fmt;

pub use context::CriteriaQueryContext;
pub use engine::{AugmentationEngine, DefaultAugmentationEngine, QueryAugmentor};
pub use errors::{AugmentError, AugmentResult};
pub use string_context::StringQueryContext;

/// Execution intent of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryMode {
    Find,
    Count,
    /// Count issued to compute page totals
    CountForPaging,
    Exists,
    ForDelete,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Find => "FIND",
            QueryMode::Count => "COUNT",
            QueryMode::CountForPaging => "COUNT_FOR_PAGING",
            QueryMode::Exists => "EXISTS",
            QueryMode::ForDelete => "FOR_DELETE",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of context handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Criteria,
    String,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Criteria => "criteria",
            ContextKind::String => "string",
        }
    }
}
