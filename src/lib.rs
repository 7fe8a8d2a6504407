//! repoquery - specification-driven repository query execution
//!
//! Builds executable queries for an entity type from composable
//! specifications, sort orders and repository method metadata (lock
//! mode, query hints, entity graphs), and lets registered augmentors
//! rewrite those queries before they run.
//!
//! # Modules
//!
//! - `criteria`: structural query model and JPQL rendering
//! - `specification`: composable predicate builders
//! - `entity`, `metadata`: entity and repository method descriptors
//! - `session`: persistence runtime capabilities, plus an in-memory runtime
//! - `augment`: query contexts and the augmentation engine
//! - `executor`: `QueryExecutor`
//! - `config`, `observability`: configuration, logging and counters

pub mod augment;
pub mod config;
pub mod criteria;
pub mod entity;
pub mod executor;
pub mod metadata;
pub mod observability;
pub mod session;
pub mod specification;

pub use augment::{
    AugmentError, AugmentationEngine, ContextKind, CriteriaQueryContext,
    DefaultAugmentationEngine, QueryAugmentor, QueryMode, StringQueryContext,
};
pub use config::{ConfigError, ExecutorConfig};
pub use criteria::{CriteriaBuilder, CriteriaQuery, Root, Sort};
pub use entity::{EntityInformation, EntityMetadata, JsonEntityInformation};
pub use executor::{QueryError, QueryExecutor, QueryResult};
pub use metadata::{CrudMethodMetadata, EntityGraph, EntityGraphType, LockModeType, QueryHints};
pub use session::{CountQuery, PersistenceProvider, Query, Session, SessionError, TypedQuery};
pub use specification::Specification;
