//! Repository query execution
//!
//! `QueryExecutor` turns a specification plus repository method metadata
//! into executable queries and runs the id lookups and counts that
//! repositories need.
//!
//! # Build order
//!
//! 1. Create the criteria query and its root for the entity type
//! 2. Apply the specification as the restriction
//! 3. Pass query and root through augmentation
//! 4. Project the (possibly replaced) root, or its count
//! 5. Apply ordering
//! 6. Apply lock mode and query hints from the method metadata

mod errors;
mod executor;

pub use errors::{QueryError, QueryResult};
pub use executor::QueryExecutor;
