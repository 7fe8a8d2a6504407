//! Criteria query context

use std::fmt;
use std::sync::Arc;

use crate::criteria::{CriteriaBuilder, CriteriaQuery, Root};
use crate::entity::EntityMetadata;
use crate::session::Session;

use super::QueryMode;

/// A criteria query and its root, in flight through augmentation.
///
/// The root may be absent; augmentors that drop it leave the executor
/// unable to project and it fails with a precondition error.
#[derive(Clone)]
pub struct CriteriaQueryContext {
    mode: QueryMode,
    session: Arc<dyn Session>,
    query: CriteriaQuery,
    entity_information: Arc<dyn EntityMetadata>,
    root: Option<Root>,
}

impl CriteriaQueryContext {
    pub fn new(
        query: CriteriaQuery,
        root: Option<Root>,
        mode: QueryMode,
        session: Arc<dyn Session>,
        entity_information: Arc<dyn EntityMetadata>,
    ) -> Self {
        Self {
            mode,
            session,
            query,
            entity_information,
            root,
        }
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn query(&self) -> &CriteriaQuery {
        &self.query
    }

    pub fn root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    pub fn entity_information(&self) -> &Arc<dyn EntityMetadata> {
        &self.entity_information
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Builder of the owning session
    pub fn criteria_builder(&self) -> CriteriaBuilder {
        self.session.criteria_builder()
    }

    /// New context carrying `query` in place of the current one
    pub fn with_query(&self, query: CriteriaQuery) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    /// New context carrying `root` in place of the current one
    pub fn with_root(&self, root: Option<Root>) -> Self {
        Self {
            root,
            ..self.clone()
        }
    }

    /// Consumes the context, returning the query and root
    pub fn into_parts(self) -> (CriteriaQuery, Option<Root>) {
        (self.query, self.root)
    }
}

impl fmt::Debug for CriteriaQueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriteriaQueryContext")
            .field("mode", &self.mode)
            .field("query", &self.query)
            .field("root", &self.root)
            .field("entity", &self.entity_information.entity_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{ResultType, ValueType};
    use crate::entity::JsonEntityInformation;
    use crate::session::memory::MemorySession;
    use serde_json::Value;

    fn context() -> CriteriaQueryContext {
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from("User");
        let info: Arc<dyn EntityMetadata> =
            Arc::new(JsonEntityInformation::<Value>::new("User", "id", ValueType::Integer));
        CriteriaQueryContext::new(
            query,
            Some(root),
            QueryMode::Find,
            Arc::new(MemorySession::new()),
            info,
        )
    }

    #[test]
    fn test_with_query_leaves_original_intact() {
        let original = context();
        let mut replaced = original.query().clone();
        replaced.distinct(true);

        let augmented = original.with_query(replaced);
        assert!(augmented.query().is_distinct());
        assert!(!original.query().is_distinct());
        assert_eq!(augmented.root(), original.root());
        assert_eq!(augmented.mode(), QueryMode::Find);
    }

    #[test]
    fn test_root_may_be_absent() {
        let ctx = context().with_root(None);
        assert!(ctx.root().is_none());
        let (query, root) = ctx.into_parts();
        assert_eq!(query.roots().len(), 1);
        assert!(root.is_none());
    }
}
