//! Criteria query structure
//!
//! A `CriteriaQuery` is built incrementally: sources are added with
//! `from`, a restriction with `where_`, then projection and ordering.
//! Every setter replaces the previous value, matching how the
//! persistence runtime treats repeated calls.

use super::ast::{Expression, Order, ParameterExpression, Path, Predicate, Selection};

/// Words that cannot serve as a source alias in query text
const KEYWORDS: &[&str] = &[
    "all", "and", "any", "as", "asc", "between", "by", "case", "count", "delete", "desc",
    "distinct", "else", "empty", "end", "escape", "exists", "false", "fetch", "from", "group",
    "having", "in", "inner", "is", "join", "left", "like", "member", "new", "not", "null", "of",
    "on", "or", "order", "outer", "right", "select", "set", "some", "then", "true", "union",
    "update", "when", "where",
];

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Kind of value a query produces per row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// Entity rows
    Entity,
    /// Integer rows (counts)
    Long,
}

/// A query source: an entity type bound to an alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    entity: String,
    alias: String,
}

impl Root {
    pub(crate) fn new(entity: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            alias: alias.into(),
        }
    }

    /// Entity type name of this source
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Path to an attribute of this source
    pub fn get(&self, attribute: &str) -> Path {
        Path::new(self.alias.clone(), Some(attribute.to_string()))
    }

    /// Path denoting the source entity itself
    pub fn path(&self) -> Path {
        Path::new(self.alias.clone(), None)
    }
}

impl From<&Root> for Expression {
    fn from(root: &Root) -> Self {
        Expression::Path(root.path())
    }
}

/// Structural query over one or more sources
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaQuery {
    result: ResultType,
    roots: Vec<Root>,
    selection: Option<Selection>,
    restriction: Option<Predicate>,
    group_by: Vec<Expression>,
    orders: Vec<Order>,
    distinct: bool,
}

impl CriteriaQuery {
    pub fn new(result: ResultType) -> Self {
        Self {
            result,
            roots: Vec::new(),
            selection: None,
            restriction: None,
            group_by: Vec::new(),
            orders: Vec::new(),
            distinct: false,
        }
    }

    pub fn result_type(&self) -> ResultType {
        self.result
    }

    /// Adds a source for `entity` and returns it.
    ///
    /// The alias is the lower-cased entity name, suffixed with the source
    /// index when that alias is already taken or is a query keyword
    /// (`Order` becomes `order0`).
    pub fn from(&mut self, entity: &str) -> Root {
        let base = entity.to_lowercase();
        let alias = if self.has_alias(&base) || is_keyword(&base) {
            let mut index = self.roots.len();
            while self.has_alias(&format!("{}{}", base, index)) {
                index += 1;
            }
            format!("{}{}", base, index)
        } else {
            base
        };
        self.from_with_alias(entity, &alias)
    }

    /// Adds a source under an explicit alias
    pub fn from_with_alias(&mut self, entity: &str, alias: &str) -> Root {
        let root = Root::new(entity, alias);
        self.roots.push(root.clone());
        root
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.roots.iter().any(|r| r.alias == alias)
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn select(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some(selection);
        self
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Sets the restriction, replacing any previous one
    pub fn where_(&mut self, predicate: Predicate) -> &mut Self {
        self.restriction = Some(predicate);
        self
    }

    /// Conjoins `predicate` with the current restriction
    pub fn and_where(&mut self, predicate: Predicate) -> &mut Self {
        self.restriction = Some(match self.restriction.take() {
            None => predicate,
            Some(Predicate::And(mut items)) => {
                items.push(predicate);
                Predicate::And(items)
            }
            Some(existing) => Predicate::And(vec![existing, predicate]),
        });
        self
    }

    pub fn restriction(&self) -> Option<&Predicate> {
        self.restriction.as_ref()
    }

    pub fn group_by(&mut self, expressions: Vec<Expression>) -> &mut Self {
        self.group_by = expressions;
        self
    }

    pub fn grouping(&self) -> &[Expression] {
        &self.group_by
    }

    pub fn order_by(&mut self, orders: Vec<Order>) -> &mut Self {
        self.orders = orders;
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Parameters referenced by the query, in order of first appearance
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        let mut expressions: Vec<&Expression> = Vec::new();
        if let Some(restriction) = &self.restriction {
            restriction.for_each_expression(&mut |e| expressions.push(e));
        }
        expressions.extend(self.group_by.iter());
        expressions.extend(self.orders.iter().map(|o| &o.expression));

        let mut found: Vec<&ParameterExpression> = Vec::new();
        for expression in expressions {
            if let Expression::Parameter(p) = expression {
                if !found.iter().any(|seen| seen.id() == p.id()) {
                    found.push(p);
                }
            }
        }
        found
    }
}
