//! Persistence session capabilities
//!
//! The query executor orchestrates calls into a persistence runtime it
//! does not own. This module defines what it consumes from that runtime:
//!
//! - `Session`: creates executable queries from criteria or text
//! - `Query`: an executable query accepting parameters, hints, lock mode
//! - `PersistenceProvider`: runtime-specific query text extraction and
//!   fetch-graph hints
//!
//! `memory` provides an in-process runtime implementing all three.

mod errors;
pub mod memory;

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::criteria::{CriteriaBuilder, CriteriaQuery, ParameterExpression};
use crate::metadata::{LockModeType, QueryHints, ResolvedEntityGraph};

pub use errors::{SessionError, SessionResult};

/// Unit-of-work handle of the persistence runtime
pub trait Session: Send + Sync {
    /// Builder for criteria predicates and selections
    fn criteria_builder(&self) -> CriteriaBuilder {
        CriteriaBuilder::new()
    }

    /// Creates an executable query from a criteria query
    fn create_query(&self, query: CriteriaQuery) -> SessionResult<Box<dyn Query>>;

    /// Creates an executable query from query text
    fn create_text_query(&self, text: &str) -> SessionResult<Box<dyn Query>>;

    /// Attribute paths of a named entity graph declared for `entity_type`
    fn entity_graph(&self, name: &str, entity_type: &str) -> Option<Vec<String>>;

    /// Provider binding of the runtime behind this session
    fn provider(&self) -> Arc<dyn PersistenceProvider>;
}

/// Executable query
pub trait Query: Send {
    /// Binds a value to a parameter handle
    fn bind(&mut self, parameter: &ParameterExpression, value: Value) -> SessionResult<()>;

    /// Binds a value to a named parameter
    fn bind_named(&mut self, name: &str, value: Value) -> SessionResult<()>;

    fn set_lock_mode(&mut self, lock_mode: LockModeType);

    fn lock_mode(&self) -> Option<LockModeType>;

    fn set_hint(&mut self, name: &str, value: Value);

    fn hints(&self) -> &QueryHints;

    /// Executes the query and returns every row
    fn result_list(&self) -> SessionResult<Vec<Value>>;

    /// Executes the query expecting exactly one row
    fn single_result(&self) -> SessionResult<Value> {
        let mut rows = self.result_list()?;
        match rows.len() {
            0 => Err(SessionError::NoResult),
            1 => Ok(rows.remove(0)),
            n => Err(SessionError::NonUniqueResult(n)),
        }
    }

    /// Concrete query, for provider-specific inspection
    fn as_any(&self) -> &dyn Any;
}

/// Runtime-specific capabilities the core calls through
pub trait PersistenceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `extract_query_string` can succeed for this runtime
    fn can_extract_query(&self) -> bool;

    /// Textual form of an executable query
    fn extract_query_string(&self, query: &dyn Query) -> Option<String>;

    /// Hints that make the runtime apply `graph` when loading `entity_type`
    fn fetch_graph_hints(
        &self,
        session: &dyn Session,
        graph: &ResolvedEntityGraph,
        entity_type: &str,
    ) -> QueryHints;
}

/// Executable query whose rows map to `T`
pub struct TypedQuery<T> {
    inner: Box<dyn Query>,
    _result: PhantomData<fn() -> T>,
}

/// Counting query; a row may hold a null count
pub type CountQuery = TypedQuery<Option<i64>>;

impl<T> TypedQuery<T> {
    pub fn new(inner: Box<dyn Query>) -> Self {
        Self {
            inner,
            _result: PhantomData,
        }
    }

    pub fn bind(&mut self, parameter: &ParameterExpression, value: Value) -> SessionResult<&mut Self> {
        self.inner.bind(parameter, value)?;
        Ok(self)
    }

    pub fn bind_named(&mut self, name: &str, value: Value) -> SessionResult<&mut Self> {
        self.inner.bind_named(name, value)?;
        Ok(self)
    }

    pub fn set_lock_mode(&mut self, lock_mode: LockModeType) -> &mut Self {
        self.inner.set_lock_mode(lock_mode);
        self
    }

    pub fn set_hint(&mut self, name: &str, value: Value) -> &mut Self {
        self.inner.set_hint(name, value);
        self
    }

    pub fn lock_mode(&self) -> Option<LockModeType> {
        self.inner.lock_mode()
    }

    pub fn hints(&self) -> &QueryHints {
        self.inner.hints()
    }

    /// The untyped query
    pub fn as_query(&self) -> &dyn Query {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn Query> {
        self.inner
    }
}

impl<T: DeserializeOwned> TypedQuery<T> {
    pub fn result_list(&self) -> SessionResult<Vec<T>> {
        self.inner
            .result_list()?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(SessionError::from))
            .collect()
    }

    pub fn single_result(&self) -> SessionResult<T> {
        let row = self.inner.single_result()?;
        Ok(serde_json::from_value(row)?)
    }
}
