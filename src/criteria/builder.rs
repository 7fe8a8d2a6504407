//! Criteria builder
//!
//! Factory for predicates, parameters, aggregations and orderings.
//! Stateless; obtained from a session.

use serde_json::Value;

use super::ast::{ComparisonOp, Expression, Order, ParameterExpression, Predicate, Selection, ValueType};
use super::query::Root;

#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaBuilder;

impl CriteriaBuilder {
    pub fn new() -> Self {
        Self
    }

    fn compare(
        &self,
        op: ComparisonOp,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> Predicate {
        Predicate::Comparison {
            op,
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn equal(&self, left: impl Into<Expression>, right: impl Into<Expression>) -> Predicate {
        self.compare(ComparisonOp::Eq, left, right)
    }

    pub fn not_equal(&self, left: impl Into<Expression>, right: impl Into<Expression>) -> Predicate {
        self.compare(ComparisonOp::Ne, left, right)
    }

    pub fn greater_than(
        &self,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> Predicate {
        self.compare(ComparisonOp::Gt, left, right)
    }

    pub fn greater_than_or_equal(
        &self,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> Predicate {
        self.compare(ComparisonOp::Ge, left, right)
    }

    pub fn less_than(&self, left: impl Into<Expression>, right: impl Into<Expression>) -> Predicate {
        self.compare(ComparisonOp::Lt, left, right)
    }

    pub fn less_than_or_equal(
        &self,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> Predicate {
        self.compare(ComparisonOp::Le, left, right)
    }

    pub fn like(&self, expression: impl Into<Expression>, pattern: impl Into<Expression>) -> Predicate {
        Predicate::Like {
            expression: expression.into(),
            pattern: pattern.into(),
        }
    }

    pub fn is_null(&self, expression: impl Into<Expression>) -> Predicate {
        Predicate::IsNull(expression.into())
    }

    pub fn is_not_null(&self, expression: impl Into<Expression>) -> Predicate {
        Predicate::IsNotNull(expression.into())
    }

    /// Conjunction of the given predicates; flattens nested conjunctions
    pub fn and(&self, predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut items = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::And(nested) => items.extend(nested),
                other => items.push(other),
            }
        }
        Predicate::And(items)
    }

    /// Disjunction of the given predicates; flattens nested disjunctions
    pub fn or(&self, predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut items = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::Or(nested) => items.extend(nested),
                other => items.push(other),
            }
        }
        Predicate::Or(items)
    }

    pub fn not(&self, predicate: Predicate) -> Predicate {
        Predicate::Not(Box::new(predicate))
    }

    /// Always-true predicate
    pub fn conjunction(&self) -> Predicate {
        Predicate::And(Vec::new())
    }

    /// Always-false predicate
    pub fn disjunction(&self) -> Predicate {
        Predicate::Or(Vec::new())
    }

    /// Creates a new, unbound parameter
    pub fn parameter(&self, value_type: ValueType) -> ParameterExpression {
        ParameterExpression::new(value_type)
    }

    pub fn literal(&self, value: Value) -> Expression {
        Expression::Literal(value)
    }

    pub fn count(&self, root: &Root) -> Selection {
        Selection::Count {
            alias: root.alias().to_string(),
            distinct: false,
        }
    }

    pub fn count_distinct(&self, root: &Root) -> Selection {
        Selection::Count {
            alias: root.alias().to_string(),
            distinct: true,
        }
    }

    pub fn asc(&self, expression: impl Into<Expression>) -> Order {
        Order::asc(expression)
    }

    pub fn desc(&self, expression: impl Into<Expression>) -> Order {
        Order::desc(expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::query::{CriteriaQuery, ResultType};
    use serde_json::json;

    #[test]
    fn test_and_flattens() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from("User");

        let inner = cb.and([
            cb.equal(root.get("a"), json!(1)),
            cb.equal(root.get("b"), json!(2)),
        ]);
        let outer = cb.and([inner, cb.is_null(root.get("c"))]);

        match outer {
            Predicate::And(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected predicate {:?}", other),
        }
    }

    #[test]
    fn test_count_selections() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Long);
        let root = query.from("User");

        assert_eq!(
            cb.count(&root),
            Selection::Count {
                alias: "user".into(),
                distinct: false
            }
        );
        assert_eq!(
            cb.count_distinct(&root),
            Selection::Count {
                alias: "user".into(),
                distinct: true
            }
        );
    }

    #[test]
    fn test_parameters_are_fresh() {
        let cb = CriteriaBuilder::new();
        assert_ne!(cb.parameter(ValueType::Any), cb.parameter(ValueType::Any));
    }
}
