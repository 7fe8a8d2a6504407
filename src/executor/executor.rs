//! Query executor
//!
//! Builds find and count queries for one entity type and executes the
//! id lookups and counts built on them.
//!
//! Only an empty single-result fetch is recovered (as `None`). Every
//! other session or augmentation failure propagates unchanged.

use std::cell::OnceCell;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::augment::{AugmentationEngine, ContextKind, CriteriaQueryContext, QueryMode};
use crate::config::ExecutorConfig;
use crate::criteria::{
    render_jpql, to_orders, CriteriaBuilder, CriteriaQuery, ParameterExpression, Predicate,
    ResultType, Root, Selection, Sort, ValueType,
};
use crate::entity::{EntityInformation, EntityMetadata};
use crate::metadata::{CrudMethodMetadata, QueryHints, ResolvedEntityGraph};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::session::{CountQuery, Session, SessionError, TypedQuery};
use crate::specification::Specification;

use super::errors::{QueryError, QueryResult};

/// Builds and runs repository queries for entity `T`
pub struct QueryExecutor<T> {
    entity_information: Arc<dyn EntityInformation<T>>,
    entity_metadata: Arc<dyn EntityMetadata>,
    session: Arc<dyn Session>,
    engine: Arc<dyn AugmentationEngine>,
    metadata: Option<CrudMethodMetadata>,
    config: ExecutorConfig,
    metrics: Arc<MetricsRegistry>,
}

impl<T> QueryExecutor<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    pub fn new<I>(
        entity_information: Arc<I>,
        session: Arc<dyn Session>,
        engine: Arc<dyn AugmentationEngine>,
        metadata: Option<CrudMethodMetadata>,
    ) -> Self
    where
        I: EntityInformation<T> + 'static,
    {
        Self {
            entity_information: entity_information.clone(),
            entity_metadata: entity_information,
            session,
            engine,
            metadata,
            config: ExecutorConfig::default(),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares `metrics` instead of a private registry
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Query selecting the entities matching `spec`, ordered by `sort`.
    ///
    /// No spec means no filtering; no sort leaves ordering to the
    /// augmented query.
    pub fn get_query(
        &self,
        spec: Option<&dyn Specification<T>>,
        sort: Option<&Sort>,
    ) -> QueryResult<TypedQuery<T>> {
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = self.apply_specification_to_criteria(spec, &mut query);

        let (mut query, root) = self
            .potentially_augment(query, root, QueryMode::Find)?
            .into_parts();
        let root = root.ok_or_else(|| QueryError::precondition("context has no root"))?;

        query.select(Selection::Root(root.alias().to_string()));
        if let Some(sort) = sort {
            query.order_by(to_orders(sort, &root));
        }

        self.built(Event::QueryBuilt, &query);
        self.metrics.increment_queries_built();

        let typed = TypedQuery::new(self.session.create_query(query)?);
        Ok(self.apply_repository_method_metadata(typed))
    }

    /// Entity with identifier `id`, or `None` if no row matches
    pub fn execute_find_one_for(&self, id: Value) -> QueryResult<Option<T>> {
        let spec = ByIdSpecification::new(self.entity_metadata.as_ref());
        let mut query = self.get_query(Some(&spec as &dyn Specification<T>), None)?;
        query.bind(spec.parameter()?, id)?;

        match query.single_result() {
            Ok(entity) => Ok(Some(entity)),
            Err(SessionError::NoResult) => {
                Logger::trace(
                    Event::FindOneEmpty.as_str(),
                    &[("entity", self.entity_metadata.entity_name())],
                );
                self.metrics.increment_find_one_misses();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of rows with identifier `id`, counted in `mode`
    pub fn execute_count_by_id_for(&self, id: Value, mode: QueryMode) -> QueryResult<i64> {
        let spec = ByIdSpecification::new(self.entity_metadata.as_ref());
        let mut query = self.get_count_query(Some(&spec as &dyn Specification<T>), mode)?;
        query.bind(spec.parameter()?, id)?;
        self.execute_count_query(&query)
    }

    /// Same as counting by the identifier of `entity`; an entity
    /// without one counts as identifier null, which matches nothing.
    pub fn execute_count_by_entity_for(&self, entity: &T, mode: QueryMode) -> QueryResult<i64> {
        let id = self.entity_information.get_id(entity).unwrap_or(Value::Null);
        self.execute_count_by_id_for(id, mode)
    }

    pub fn execute_count_query_for(
        &self,
        spec: Option<&dyn Specification<T>>,
        mode: QueryMode,
    ) -> QueryResult<i64> {
        let query = self.get_count_query(spec, mode)?;
        self.execute_count_query(&query)
    }

    /// Query counting the entities matching `spec` in `mode`.
    ///
    /// Distinctness is read after augmentation: an augmentor that marks
    /// the query distinct turns the projection into a distinct count.
    pub fn get_count_query(
        &self,
        spec: Option<&dyn Specification<T>>,
        mode: QueryMode,
    ) -> QueryResult<CountQuery> {
        let mut query = CriteriaQuery::new(ResultType::Long);
        let root = self.apply_specification_to_criteria(spec, &mut query);

        let (mut query, root) = self.potentially_augment(query, root, mode)?.into_parts();
        let root = root.ok_or_else(|| QueryError::precondition("context has no root"))?;

        let builder = self.session.criteria_builder();
        let selection = if query.is_distinct() {
            builder.count_distinct(&root)
        } else {
            builder.count(&root)
        };
        query.select(selection);

        self.built(Event::CountQueryBuilt, &query);
        self.metrics.increment_count_queries_built();

        let typed = TypedQuery::new(self.session.create_query(query)?);
        Ok(self.apply_repository_method_metadata(typed))
    }

    /// Static method hints, overlaid with fetch-graph hints when the
    /// method requests an entity graph. Graph hints win on key collision.
    pub fn get_query_hints(&self) -> QueryHints {
        let Some(metadata) = &self.metadata else {
            return QueryHints::new();
        };
        let Some(graph) = self.entity_graph() else {
            return metadata.query_hints().clone();
        };

        let mut hints = metadata.query_hints().clone();
        hints.extend(self.session.provider().fetch_graph_hints(
            self.session.as_ref(),
            &graph,
            self.entity_metadata.entity_type(),
        ));
        hints
    }

    /// Entity graph requested by the method, named `<entity>.<method>`
    /// unless the graph carries its own name
    pub fn entity_graph(&self) -> Option<ResolvedEntityGraph> {
        let metadata = self.metadata.as_ref()?;
        let graph = metadata.entity_graph()?;
        let fallback = format!(
            "{}.{}",
            self.entity_metadata.entity_name(),
            metadata.method_name()
        );
        Some(graph.resolve(fallback))
    }

    fn apply_specification_to_criteria(
        &self,
        spec: Option<&dyn Specification<T>>,
        query: &mut CriteriaQuery,
    ) -> Root {
        let root = query.from(self.entity_metadata.entity_type());
        let Some(spec) = spec else {
            return root;
        };

        let builder = self.session.criteria_builder();
        if let Some(predicate) = spec.to_predicate(&root, query, &builder) {
            query.where_(predicate);
        }
        root
    }

    /// Sums every row of a count query; null rows count as zero
    fn execute_count_query(&self, query: &CountQuery) -> QueryResult<i64> {
        let totals = query.result_list()?;
        let total: i64 = totals.iter().map(|t| t.unwrap_or(0)).sum();

        self.metrics.add_count_rows(totals.len() as u64);
        Logger::trace(
            Event::CountExecuted.as_str(),
            &[
                ("entity", self.entity_metadata.entity_name()),
                ("rows", &totals.len().to_string()),
                ("total", &total.to_string()),
            ],
        );
        Ok(total)
    }

    fn apply_repository_method_metadata<Q>(&self, mut query: TypedQuery<Q>) -> TypedQuery<Q> {
        let Some(metadata) = &self.metadata else {
            return query;
        };
        if let Some(lock_mode) = metadata.lock_mode() {
            query.set_lock_mode(lock_mode);
        }
        for (name, value) in self.get_query_hints() {
            query.set_hint(&name, value);
        }
        query
    }

    fn potentially_augment(
        &self,
        query: CriteriaQuery,
        root: Root,
        mode: QueryMode,
    ) -> QueryResult<CriteriaQueryContext> {
        let context = CriteriaQueryContext::new(
            query,
            Some(root),
            mode,
            Arc::clone(&self.session),
            Arc::clone(&self.entity_metadata),
        );

        if !self.config.augmentation_enabled {
            Logger::trace(
                Event::AugmentationSkipped.as_str(),
                &[("mode", mode.as_str())],
            );
            return Ok(context);
        }
        if !self
            .engine
            .augmentation_needed(ContextKind::Criteria, mode, self.entity_metadata.as_ref())
        {
            return Ok(context);
        }
        Ok(self.engine.invoke_criteria(context)?)
    }

    fn built(&self, event: Event, query: &CriteriaQuery) {
        if !self.config.log_queries {
            return;
        }
        Logger::trace(
            event.as_str(),
            &[
                ("entity", self.entity_metadata.entity_name()),
                ("query", &render_jpql(query)),
            ],
        );
    }
}

/// `<id attribute> = :param`, with the parameter created on first use
struct ByIdSpecification {
    id_attribute: String,
    id_type: ValueType,
    parameter: OnceCell<ParameterExpression>,
}

impl ByIdSpecification {
    fn new(entity: &dyn EntityMetadata) -> Self {
        Self {
            id_attribute: entity.id_attribute().to_string(),
            id_type: entity.id_type(),
            parameter: OnceCell::new(),
        }
    }

    fn parameter(&self) -> QueryResult<&ParameterExpression> {
        self.parameter
            .get()
            .ok_or_else(|| QueryError::precondition("identifier parameter was never created"))
    }
}

impl<T> Specification<T> for ByIdSpecification {
    fn to_predicate(
        &self,
        root: &Root,
        _query: &mut CriteriaQuery,
        builder: &CriteriaBuilder,
    ) -> Option<Predicate> {
        let parameter = self
            .parameter
            .get_or_init(|| builder.parameter(self.id_type));
        Some(builder.equal(root.get(&self.id_attribute), parameter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::DefaultAugmentationEngine;
    use crate::entity::JsonEntityInformation;
    use crate::metadata::LockModeType;
    use crate::session::memory::MemorySession;
    use crate::session::{Query, SessionResult};
    use serde::Deserialize;
    use serde_json::json;
    use std::any::Any;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: i64,
        name: String,
    }

    fn executor() -> QueryExecutor<User> {
        let session = MemorySession::new();
        session
            .insert_all(
                "User",
                &[
                    User { id: 1, name: "alice".into() },
                    User { id: 2, name: "bob".into() },
                ],
            )
            .unwrap();
        QueryExecutor::new(
            Arc::new(JsonEntityInformation::<User>::new("User", "id", ValueType::Integer)),
            Arc::new(session),
            Arc::new(DefaultAugmentationEngine::new()),
            None,
        )
    }

    /// Query returning fixed count rows
    struct FixedRows {
        rows: Vec<Value>,
        hints: QueryHints,
    }

    impl FixedRows {
        fn count_query(rows: Vec<Value>) -> CountQuery {
            TypedQuery::new(Box::new(FixedRows {
                rows,
                hints: QueryHints::new(),
            }))
        }
    }

    impl Query for FixedRows {
        fn bind(&mut self, _parameter: &ParameterExpression, _value: Value) -> SessionResult<()> {
            Ok(())
        }

        fn bind_named(&mut self, _name: &str, _value: Value) -> SessionResult<()> {
            Ok(())
        }

        fn set_lock_mode(&mut self, _lock_mode: LockModeType) {}

        fn lock_mode(&self) -> Option<LockModeType> {
            None
        }

        fn set_hint(&mut self, _name: &str, _value: Value) {}

        fn hints(&self) -> &QueryHints {
            &self.hints
        }

        fn result_list(&self) -> SessionResult<Vec<Value>> {
            Ok(self.rows.clone())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_count_rows_are_summed_with_null_as_zero() {
        let executor = executor();
        let query = FixedRows::count_query(vec![json!(3), Value::Null, json!(5)]);
        assert_eq!(executor.execute_count_query(&query).unwrap(), 8);
        assert_eq!(executor.metrics().snapshot().count_rows_summed, 3);
    }

    #[test]
    fn test_count_of_no_rows_is_zero() {
        let executor = executor();
        let query = FixedRows::count_query(Vec::new());
        assert_eq!(executor.execute_count_query(&query).unwrap(), 0);
    }

    #[test]
    fn test_by_id_specification_creates_parameter_once() {
        let spec = ByIdSpecification::new(&JsonEntityInformation::<User>::new("User", "id", ValueType::Integer));
        assert!(spec.parameter().is_err());

        let builder = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from("User");
        let first = Specification::<User>::to_predicate(&spec, &root, &mut query, &builder).unwrap();
        let id = spec.parameter().unwrap().id();
        let second = Specification::<User>::to_predicate(&spec, &root, &mut query, &builder).unwrap();

        assert_eq!(first, second);
        assert_eq!(spec.parameter().unwrap().id(), id);
        assert_eq!(spec.parameter().unwrap().value_type(), ValueType::Integer);
    }

    #[test]
    fn test_find_one() {
        let executor = executor();
        assert_eq!(
            executor.execute_find_one_for(json!(2)).unwrap(),
            Some(User { id: 2, name: "bob".into() })
        );
        assert_eq!(executor.execute_find_one_for(json!(9)).unwrap(), None);
        assert_eq!(executor.metrics().snapshot().find_one_misses, 1);
    }

    #[test]
    fn test_hints_without_metadata_are_empty() {
        assert!(executor().get_query_hints().is_empty());
        assert!(executor().entity_graph().is_none());
    }
}
