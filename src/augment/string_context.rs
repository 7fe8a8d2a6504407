//! Text query context

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::entity::EntityMetadata;
use crate::session::{PersistenceProvider, Query, Session};

use super::query_utils::{add_from_and_where, detect_alias};
use super::{AugmentError, AugmentResult, QueryMode};

/// Placeholder in WHERE fragments replaced by the query's primary alias
pub const ALIAS_PLACEHOLDER: &str = "{alias}";

/// An executable text query in flight through augmentation
pub struct StringQueryContext {
    mode: QueryMode,
    session: Arc<dyn Session>,
    provider: Arc<dyn PersistenceProvider>,
    query: Box<dyn Query>,
    entity_information: Option<Arc<dyn EntityMetadata>>,
}

impl StringQueryContext {
    pub fn new(
        query: Box<dyn Query>,
        mode: QueryMode,
        session: Arc<dyn Session>,
        entity_information: Option<Arc<dyn EntityMetadata>>,
    ) -> Self {
        let provider = session.provider();
        Self {
            mode,
            session,
            provider,
            query,
            entity_information,
        }
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn query(&self) -> &dyn Query {
        self.query.as_ref()
    }

    pub fn into_query(self) -> Box<dyn Query> {
        self.query
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    pub fn entity_information(&self) -> Option<&Arc<dyn EntityMetadata>> {
        self.entity_information.as_ref()
    }

    /// Text of the wrapped query, as extracted by the provider
    pub fn query_string(&self) -> AugmentResult<String> {
        if !self.provider.can_extract_query() {
            return Err(AugmentError::QueryTextUnavailable);
        }
        self.provider
            .extract_query_string(self.query.as_ref())
            .ok_or(AugmentError::QueryTextUnavailable)
    }

    /// New context whose query is the current text plus an extra FROM
    /// source and WHERE condition.
    ///
    /// `{alias}` in `where_` is replaced by the primary alias of the
    /// current query. Every entry of `parameters` is bound by name on
    /// the new query; bindings of the current query are not carried over.
    pub fn augment(
        &self,
        from: &str,
        where_: &str,
        parameters: &BTreeMap<String, Value>,
    ) -> AugmentResult<Self> {
        let text = self.query_string()?;
        let alias = detect_alias(&text).ok_or_else(|| AugmentError::AliasNotDetected(text.clone()))?;
        let condition = where_.replace(ALIAS_PLACEHOLDER, &alias);

        let mut query = self
            .session
            .create_text_query(&add_from_and_where(&text, from, &condition))?;
        for (name, value) in parameters {
            query.bind_named(name, value.clone())?;
        }

        Ok(Self {
            mode: self.mode,
            session: Arc::clone(&self.session),
            provider: Arc::clone(&self.provider),
            query,
            entity_information: self.entity_information.clone(),
        })
    }
}

impl fmt::Debug for StringQueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringQueryContext")
            .field("mode", &self.mode)
            .field("provider", &self.provider.name())
            .field("query", &self.query_string().ok())
            .finish()
    }
}
