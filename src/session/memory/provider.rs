//! Provider binding for the in-memory runtime

use serde_json::json;

use crate::metadata::{QueryHints, ResolvedEntityGraph};
use crate::session::{PersistenceProvider, Query, Session};

use super::MemoryQuery;

/// Provider of `MemorySession`
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryProvider;

impl MemoryProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PersistenceProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn can_extract_query(&self) -> bool {
        true
    }

    fn extract_query_string(&self, query: &dyn Query) -> Option<String> {
        query
            .as_any()
            .downcast_ref::<MemoryQuery>()
            .map(MemoryQuery::query_string)
    }

    /// A graph declared on the session wins; otherwise the graph's own
    /// attribute paths form an ad-hoc graph. A graph with neither
    /// yields no hints.
    fn fetch_graph_hints(
        &self,
        session: &dyn Session,
        graph: &ResolvedEntityGraph,
        entity_type: &str,
    ) -> QueryHints {
        let attributes = match session.entity_graph(graph.name(), entity_type) {
            Some(declared) => declared,
            None if !graph.attribute_paths.is_empty() => graph.attribute_paths.clone(),
            None => return QueryHints::new(),
        };

        let mut hints = QueryHints::new();
        hints.insert(
            graph.graph_type.hint_key().to_string(),
            json!({
                "name": graph.name(),
                "entity": entity_type,
                "attributes": attributes,
            }),
        );
        hints
    }
}
