//! Augmentation engine
//!
//! Augmentors are kept in registration order. For a given context the
//! engine threads it through every augmentor that supports the
//! (context kind, mode, entity) triple; each receives the previous
//! augmentor's output. The first failure aborts the chain.

use std::sync::Arc;

use crate::entity::EntityMetadata;
use crate::observability::{Event, Logger, MetricsRegistry};

use super::{AugmentResult, ContextKind, CriteriaQueryContext, QueryMode, StringQueryContext};

/// An extension that rewrites queries before they execute
pub trait QueryAugmentor: Send + Sync {
    /// Name used in logs and rejection errors
    fn name(&self) -> &str;

    /// Whether this augmentor wants contexts of `kind` in `mode` for `entity`
    fn supports(&self, kind: ContextKind, mode: QueryMode, entity: &dyn EntityMetadata) -> bool;

    fn augment_criteria(&self, context: CriteriaQueryContext) -> AugmentResult<CriteriaQueryContext> {
        Ok(context)
    }

    fn augment_string(&self, context: StringQueryContext) -> AugmentResult<StringQueryContext> {
        Ok(context)
    }
}

/// Decides whether augmentation applies and runs it
pub trait AugmentationEngine: Send + Sync {
    fn augmentation_needed(&self, kind: ContextKind, mode: QueryMode, entity: &dyn EntityMetadata) -> bool;

    fn invoke_criteria(&self, context: CriteriaQueryContext) -> AugmentResult<CriteriaQueryContext>;

    fn invoke_string(&self, context: StringQueryContext) -> AugmentResult<StringQueryContext>;
}

/// Engine over an ordered list of augmentors.
///
/// With no augmentors registered it never requests augmentation.
#[derive(Default)]
pub struct DefaultAugmentationEngine {
    augmentors: Vec<Arc<dyn QueryAugmentor>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl DefaultAugmentationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an augmentor after the ones already present
    pub fn with_augmentor(mut self, augmentor: impl QueryAugmentor + 'static) -> Self {
        self.augmentors.push(Arc::new(augmentor));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn augmentor_count(&self) -> usize {
        self.augmentors.len()
    }

    fn supporting<'a>(
        &'a self,
        kind: ContextKind,
        mode: QueryMode,
        entity: Option<&'a dyn EntityMetadata>,
    ) -> impl Iterator<Item = &'a Arc<dyn QueryAugmentor>> + 'a {
        self.augmentors
            .iter()
            .filter(move |a| entity.is_some_and(|e| a.supports(kind, mode, e)))
    }

    fn applied(&self, augmentor: &dyn QueryAugmentor, kind: ContextKind, mode: QueryMode) {
        Logger::trace(
            Event::AugmentationApplied.as_str(),
            &[
                ("augmentor", augmentor.name()),
                ("context", kind.as_str()),
                ("mode", mode.as_str()),
            ],
        );
        if let Some(metrics) = &self.metrics {
            metrics.increment_augmentations_applied();
        }
    }
}

impl AugmentationEngine for DefaultAugmentationEngine {
    fn augmentation_needed(&self, kind: ContextKind, mode: QueryMode, entity: &dyn EntityMetadata) -> bool {
        self.supporting(kind, mode, Some(entity)).next().is_some()
    }

    fn invoke_criteria(&self, context: CriteriaQueryContext) -> AugmentResult<CriteriaQueryContext> {
        let mode = context.mode();
        let entity = Arc::clone(context.entity_information());
        let mut context = context;
        for augmentor in self.supporting(ContextKind::Criteria, mode, Some(entity.as_ref())) {
            context = augmentor.augment_criteria(context)?;
            self.applied(augmentor.as_ref(), ContextKind::Criteria, mode);
        }
        Ok(context)
    }

    /// A context without entity metadata is returned unchanged
    fn invoke_string(&self, context: StringQueryContext) -> AugmentResult<StringQueryContext> {
        let mode = context.mode();
        let entity = context.entity_information().cloned();
        let mut context = context;
        for augmentor in self.supporting(ContextKind::String, mode, entity.as_deref()) {
            context = augmentor.augment_string(context)?;
            self.applied(augmentor.as_ref(), ContextKind::String, mode);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::AugmentError;
    use crate::criteria::{CriteriaQuery, ResultType, ValueType};
    use crate::entity::JsonEntityInformation;
    use crate::session::memory::MemorySession;
    use crate::session::Session;
    use serde_json::Value;
    use std::collections::BTreeMap;

    /// Marks every non-find criteria query distinct
    struct Distinct;

    impl QueryAugmentor for Distinct {
        fn name(&self) -> &str {
            "distinct"
        }

        fn supports(&self, kind: ContextKind, mode: QueryMode, _entity: &dyn EntityMetadata) -> bool {
            kind == ContextKind::Criteria && mode != QueryMode::Find
        }

        fn augment_criteria(&self, context: CriteriaQueryContext) -> AugmentResult<CriteriaQueryContext> {
            let mut query = context.query().clone();
            query.distinct(true);
            Ok(context.with_query(query))
        }
    }

    struct Reject;

    impl QueryAugmentor for Reject {
        fn name(&self) -> &str {
            "reject"
        }

        fn supports(&self, _kind: ContextKind, _mode: QueryMode, entity: &dyn EntityMetadata) -> bool {
            entity.entity_name() == "User"
        }

        fn augment_criteria(&self, _context: CriteriaQueryContext) -> AugmentResult<CriteriaQueryContext> {
            Err(AugmentError::rejected("reject", "always"))
        }
    }

    struct ActiveOnly;

    impl QueryAugmentor for ActiveOnly {
        fn name(&self) -> &str {
            "active-only"
        }

        fn supports(&self, kind: ContextKind, _mode: QueryMode, _entity: &dyn EntityMetadata) -> bool {
            kind == ContextKind::String
        }

        fn augment_string(&self, context: StringQueryContext) -> AugmentResult<StringQueryContext> {
            context.augment("", "{alias}.active = true", &BTreeMap::new())
        }
    }

    fn info(name: &str) -> Arc<dyn EntityMetadata> {
        Arc::new(JsonEntityInformation::<Value>::new(name, "id", ValueType::Integer))
    }

    fn criteria_context(mode: QueryMode, entity: &str) -> CriteriaQueryContext {
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from(entity);
        CriteriaQueryContext::new(query, Some(root), mode, Arc::new(MemorySession::new()), info(entity))
    }

    #[test]
    fn test_empty_engine_never_needs_augmentation() {
        let engine = DefaultAugmentationEngine::default();
        let user = info("User");
        assert!(!engine.augmentation_needed(ContextKind::Criteria, QueryMode::Find, user.as_ref()));
        assert!(!engine.augmentation_needed(ContextKind::String, QueryMode::Count, user.as_ref()));
    }

    #[test]
    fn test_needed_follows_supports() {
        let engine = DefaultAugmentationEngine::new().with_augmentor(Distinct);
        let user = info("User");
        assert!(engine.augmentation_needed(ContextKind::Criteria, QueryMode::Count, user.as_ref()));
        assert!(!engine.augmentation_needed(ContextKind::Criteria, QueryMode::Find, user.as_ref()));
        assert!(!engine.augmentation_needed(ContextKind::String, QueryMode::Count, user.as_ref()));
    }

    #[test]
    fn test_invoke_applies_supporting_augmentors_and_counts() {
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = DefaultAugmentationEngine::new()
            .with_augmentor(Distinct)
            .with_metrics(Arc::clone(&metrics));

        let result = engine
            .invoke_criteria(criteria_context(QueryMode::Count, "User"))
            .unwrap();
        assert!(result.query().is_distinct());
        assert_eq!(metrics.snapshot().augmentations_applied, 1);

        let untouched = engine
            .invoke_criteria(criteria_context(QueryMode::Find, "User"))
            .unwrap();
        assert!(!untouched.query().is_distinct());
        assert_eq!(metrics.snapshot().augmentations_applied, 1);
    }

    #[test]
    fn test_first_failure_aborts() {
        let engine = DefaultAugmentationEngine::new()
            .with_augmentor(Reject)
            .with_augmentor(Distinct);
        let err = engine
            .invoke_criteria(criteria_context(QueryMode::Count, "User"))
            .unwrap_err();
        assert_eq!(err, AugmentError::rejected("reject", "always"));

        // Reject only supports User
        let ok = engine
            .invoke_criteria(criteria_context(QueryMode::Count, "Order"))
            .unwrap();
        assert!(ok.query().is_distinct());
    }

    #[test]
    fn test_string_context_without_metadata_is_untouched() {
        let session = Arc::new(MemorySession::new());
        session
            .insert("Task", &serde_json::json!({"id": 1, "active": false}))
            .unwrap();
        let engine = DefaultAugmentationEngine::new().with_augmentor(ActiveOnly);

        let query = session.create_text_query("select t from Task t").unwrap();
        let ctx = StringQueryContext::new(query, QueryMode::Find, session.clone(), None);
        let ctx = engine.invoke_string(ctx).unwrap();
        assert_eq!(ctx.query_string().unwrap(), "select t from Task t");

        let query = session.create_text_query("select t from Task t").unwrap();
        let ctx = StringQueryContext::new(query, QueryMode::Find, session.clone(), Some(info("Task")));
        let ctx = engine.invoke_string(ctx).unwrap();
        assert_eq!(ctx.query_string().unwrap(), "select t from Task t where t.active = true");
        assert!(ctx.query().result_list().unwrap().is_empty());
    }
}
