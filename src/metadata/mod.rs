//! Repository method metadata
//!
//! Describes the repository method a query is built for: its lock mode,
//! static query hints and requested entity graph.

use std::collections::BTreeMap;

use serde_json::Value;

/// Provider-specific query directives, keyed by hint name
pub type QueryHints = BTreeMap<String, Value>;

/// Lock mode requested for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockModeType {
    Read,
    Write,
    Optimistic,
    OptimisticForceIncrement,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
    None,
}

impl LockModeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockModeType::Read => "READ",
            LockModeType::Write => "WRITE",
            LockModeType::Optimistic => "OPTIMISTIC",
            LockModeType::OptimisticForceIncrement => "OPTIMISTIC_FORCE_INCREMENT",
            LockModeType::PessimisticRead => "PESSIMISTIC_READ",
            LockModeType::PessimisticWrite => "PESSIMISTIC_WRITE",
            LockModeType::PessimisticForceIncrement => "PESSIMISTIC_FORCE_INCREMENT",
            LockModeType::None => "NONE",
        }
    }
}

/// How an entity graph's attributes are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityGraphType {
    /// Listed attributes are eager, everything else lazy
    Fetch,
    /// Listed attributes are eager, everything else keeps its mapping
    Load,
}

impl EntityGraphType {
    /// Hint key under which a graph of this type is passed to the provider
    pub fn hint_key(&self) -> &'static str {
        match self {
            EntityGraphType::Fetch => "javax.persistence.fetchgraph",
            EntityGraphType::Load => "javax.persistence.loadgraph",
        }
    }
}

/// Entity graph requested on a repository method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityGraph {
    /// Explicit graph name; empty or absent selects the fallback name
    pub name: Option<String>,
    pub graph_type: EntityGraphType,
    /// Attribute paths for an ad-hoc graph
    pub attribute_paths: Vec<String>,
}

impl EntityGraph {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            graph_type: EntityGraphType::Fetch,
            attribute_paths: Vec::new(),
        }
    }

    /// Graph without an explicit name, resolved through the fallback rule
    pub fn unnamed() -> Self {
        Self {
            name: None,
            graph_type: EntityGraphType::Fetch,
            attribute_paths: Vec::new(),
        }
    }

    pub fn with_type(mut self, graph_type: EntityGraphType) -> Self {
        self.graph_type = graph_type;
        self
    }

    pub fn with_attribute_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Resolves the effective graph name against `fallback_name`
    pub fn resolve(&self, fallback_name: impl Into<String>) -> ResolvedEntityGraph {
        let name = match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => fallback_name.into(),
        };
        ResolvedEntityGraph {
            name,
            graph_type: self.graph_type,
            attribute_paths: self.attribute_paths.clone(),
        }
    }
}

/// Entity graph with its effective name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntityGraph {
    pub name: String,
    pub graph_type: EntityGraphType,
    pub attribute_paths: Vec<String>,
}

impl ResolvedEntityGraph {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Metadata of the repository method being executed
#[derive(Debug, Clone, PartialEq)]
pub struct CrudMethodMetadata {
    method_name: String,
    lock_mode: Option<LockModeType>,
    query_hints: QueryHints,
    entity_graph: Option<EntityGraph>,
}

impl CrudMethodMetadata {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            lock_mode: None,
            query_hints: QueryHints::new(),
            entity_graph: None,
        }
    }

    pub fn with_lock_mode(mut self, lock_mode: LockModeType) -> Self {
        self.lock_mode = Some(lock_mode);
        self
    }

    /// Adds a static hint; a repeated key keeps the last value
    pub fn with_hint(mut self, name: impl Into<String>, value: Value) -> Self {
        self.query_hints.insert(name.into(), value);
        self
    }

    pub fn with_entity_graph(mut self, graph: EntityGraph) -> Self {
        self.entity_graph = Some(graph);
        self
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn lock_mode(&self) -> Option<LockModeType> {
        self.lock_mode
    }

    pub fn query_hints(&self) -> &QueryHints {
        &self.query_hints
    }

    pub fn entity_graph(&self) -> Option<&EntityGraph> {
        self.entity_graph.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graph_resolution_prefers_explicit_name() {
        let graph = EntityGraph::named("User.detail").resolve("User.findAll");
        assert_eq!(graph.name(), "User.detail");
    }

    #[test]
    fn test_graph_resolution_falls_back() {
        assert_eq!(EntityGraph::unnamed().resolve("User.findAll").name(), "User.findAll");
        assert_eq!(EntityGraph::named("  ").resolve("User.findAll").name(), "User.findAll");
    }

    #[test]
    fn test_hint_keys() {
        assert_eq!(EntityGraphType::Fetch.hint_key(), "javax.persistence.fetchgraph");
        assert_eq!(EntityGraphType::Load.hint_key(), "javax.persistence.loadgraph");
    }

    #[test]
    fn test_repeated_hint_keeps_last() {
        let metadata = CrudMethodMetadata::new("findAll")
            .with_hint("timeout", json!(10))
            .with_hint("timeout", json!(20));
        assert_eq!(metadata.query_hints().len(), 1);
        assert_eq!(metadata.query_hints()["timeout"], json!(20));
    }
}
