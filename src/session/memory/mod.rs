//! In-process persistence runtime
//!
//! `MemorySession` keeps entity rows as JSON values per entity type and
//! executes criteria queries and the supported query text against them.
//! It backs the executor's tests and any embedding that needs a
//! session without a database.
//!
//! Failures can be injected with `fail_next_with`: the next executed
//! query returns `SessionError::Injected` instead of rows.

mod eval;
mod jpql;
mod provider;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::criteria::{render_jpql, CriteriaQuery, ParameterExpression};
use crate::metadata::{LockModeType, QueryHints};

use super::{PersistenceProvider, Query, Session, SessionError, SessionResult};

use eval::Tables;

pub use provider::MemoryProvider;

#[derive(Default)]
struct MemoryStore {
    tables: RwLock<Tables>,
    graphs: RwLock<BTreeMap<(String, String), Vec<String>>>,
    injected: Mutex<Option<String>>,
}

impl MemoryStore {
    fn tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn tables_mut(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn take_injected(&self) -> Option<String> {
        self.injected.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Session over in-memory tables
#[derive(Clone)]
pub struct MemorySession {
    store: Arc<MemoryStore>,
    provider: Arc<MemoryProvider>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            provider: Arc::new(MemoryProvider::new()),
        }
    }

    /// Declares an entity type with no rows
    pub fn register_entity(&self, entity_type: &str) {
        self.store
            .tables_mut()
            .entry(entity_type.to_string())
            .or_default();
    }

    /// Stores `entity` as a row of `entity_type`, declaring the type if needed
    pub fn insert<E: Serialize>(&self, entity_type: &str, entity: &E) -> SessionResult<()> {
        let row = serde_json::to_value(entity)?;
        self.store
            .tables_mut()
            .entry(entity_type.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    pub fn insert_all<'e, E, I>(&self, entity_type: &str, entities: I) -> SessionResult<()>
    where
        E: Serialize + 'e,
        I: IntoIterator<Item = &'e E>,
    {
        for entity in entities {
            self.insert(entity_type, entity)?;
        }
        Ok(())
    }

    /// Declares a named entity graph for `entity_type`
    pub fn register_entity_graph<I, S>(&self, name: &str, entity_type: &str, attribute_paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store
            .graphs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                (name.to_string(), entity_type.to_string()),
                attribute_paths.into_iter().map(Into::into).collect(),
            );
    }

    /// Makes the next executed query fail with `SessionError::Injected`
    pub fn fail_next_with(&self, message: impl Into<String>) {
        *self.store.injected.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    /// Number of rows stored for `entity_type`
    pub fn row_count(&self, entity_type: &str) -> usize {
        self.store
            .tables()
            .get(entity_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Session for MemorySession {
    fn create_query(&self, query: CriteriaQuery) -> SessionResult<Box<dyn Query>> {
        eval::validate(&self.store.tables(), &query)?;
        Ok(Box::new(MemoryQuery::new(
            Arc::clone(&self.store),
            query,
            None,
            BTreeMap::new(),
        )))
    }

    fn create_text_query(&self, text: &str) -> SessionResult<Box<dyn Query>> {
        let parsed = jpql::parse(text)?;
        eval::validate(&self.store.tables(), &parsed.criteria)?;
        Ok(Box::new(MemoryQuery::new(
            Arc::clone(&self.store),
            parsed.criteria,
            Some(text.to_string()),
            parsed.named,
        )))
    }

    fn entity_graph(&self, name: &str, entity_type: &str) -> Option<Vec<String>> {
        self.store
            .graphs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(name.to_string(), entity_type.to_string()))
            .cloned()
    }

    fn provider(&self) -> Arc<dyn PersistenceProvider> {
        self.provider.clone()
    }
}

/// Query created by a `MemorySession`
pub struct MemoryQuery {
    store: Arc<MemoryStore>,
    criteria: CriteriaQuery,
    text: Option<String>,
    named: BTreeMap<String, ParameterExpression>,
    bindings: HashMap<Uuid, Value>,
    lock_mode: Option<LockModeType>,
    hints: QueryHints,
}

impl MemoryQuery {
    fn new(
        store: Arc<MemoryStore>,
        criteria: CriteriaQuery,
        text: Option<String>,
        named: BTreeMap<String, ParameterExpression>,
    ) -> Self {
        Self {
            store,
            criteria,
            text,
            named,
            bindings: HashMap::new(),
            lock_mode: None,
            hints: QueryHints::new(),
        }
    }

    pub fn criteria(&self) -> &CriteriaQuery {
        &self.criteria
    }

    /// Text the query was created from, if any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Query text: the original text, or the rendering of the criteria
    pub fn query_string(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => render_jpql(&self.criteria),
        }
    }
}

fn parameter_label(parameter: &ParameterExpression) -> String {
    match parameter.name() {
        Some(name) => name.to_string(),
        None => parameter.id().to_string(),
    }
}

impl Query for MemoryQuery {
    fn bind(&mut self, parameter: &ParameterExpression, value: Value) -> SessionResult<()> {
        let declared = self
            .criteria
            .parameters()
            .into_iter()
            .find(|p| p.id() == parameter.id())
            .cloned()
            .ok_or_else(|| SessionError::UnknownParameter(parameter_label(parameter)))?;

        if !declared.value_type().accepts(&value) {
            return Err(SessionError::InvalidParameterValue {
                name: parameter_label(&declared),
                expected: declared.value_type().as_str(),
            });
        }
        self.bindings.insert(declared.id(), value);
        Ok(())
    }

    fn bind_named(&mut self, name: &str, value: Value) -> SessionResult<()> {
        let parameter = self
            .named
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownParameter(name.to_string()))?;
        self.bind(&parameter, value)
    }

    fn set_lock_mode(&mut self, lock_mode: LockModeType) {
        self.lock_mode = Some(lock_mode);
    }

    fn lock_mode(&self) -> Option<LockModeType> {
        self.lock_mode
    }

    fn set_hint(&mut self, name: &str, value: Value) {
        self.hints.insert(name.to_string(), value);
    }

    fn hints(&self) -> &QueryHints {
        &self.hints
    }

    fn result_list(&self) -> SessionResult<Vec<Value>> {
        if let Some(message) = self.store.take_injected() {
            return Err(SessionError::Injected(message));
        }
        eval::execute(&self.store.tables(), &self.criteria, &self.bindings)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
