//! Criteria expression tree
//!
//! Structural (non-textual) building blocks of a criteria query:
//! paths, parameters, literals, predicates and orderings.

use serde_json::Value;
use uuid::Uuid;

use super::sort::Direction;

/// Declared type of a parameter or identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Accepts any JSON value
    Any,
    Bool,
    /// Whole numbers only
    Integer,
    Number,
    String,
}

impl ValueType {
    /// Returns true if `value` may be bound to a parameter of this type.
    ///
    /// Null is accepted for every type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueType::Any, _) => true,
            (ValueType::Bool, Value::Bool(_)) => true,
            (ValueType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (ValueType::Number, Value::Number(_)) => true,
            (ValueType::String, Value::String(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::String => "string",
        }
    }
}

/// Attribute path rooted at a query source alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Alias of the source the path starts from
    pub alias: String,
    /// Dotted attribute path; `None` denotes the source itself
    pub attribute: Option<String>,
}

impl Path {
    pub fn new(alias: impl Into<String>, attribute: Option<String>) -> Self {
        Self {
            alias: alias.into(),
            attribute,
        }
    }

    /// Navigates one more attribute down from this path
    pub fn get(&self, attribute: &str) -> Path {
        let attribute = match &self.attribute {
            Some(existing) => format!("{}.{}", existing, attribute),
            None => attribute.to_string(),
        };
        Path::new(self.alias.clone(), Some(attribute))
    }
}

/// Handle to a query parameter.
///
/// Identity is the handle id, not the declared type: two handles created
/// separately never bind to each other's slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterExpression {
    id: Uuid,
    value_type: ValueType,
    name: Option<String>,
}

impl ParameterExpression {
    /// Creates an anonymous parameter with a fresh identity
    pub fn new(value_type: ValueType) -> Self {
        Self {
            id: Uuid::new_v4(),
            value_type,
            name: None,
        }
    }

    /// Creates a named parameter (text queries bind by name)
    pub fn named(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: Uuid::new_v4(),
            value_type,
            name: Some(name.into()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Scalar expression usable on either side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(Path),
    Literal(Value),
    Parameter(ParameterExpression),
}

impl From<Path> for Expression {
    fn from(path: Path) -> Self {
        Expression::Path(path)
    }
}

impl From<ParameterExpression> for Expression {
    fn from(parameter: ParameterExpression) -> Self {
        Expression::Parameter(parameter)
    }
}

impl From<&ParameterExpression> for Expression {
    fn from(parameter: &ParameterExpression) -> Self {
        Expression::Parameter(parameter.clone())
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(value)
    }
}

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    /// JPQL symbol for this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
        }
    }
}

/// Boolean filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        op: ComparisonOp,
        left: Expression,
        right: Expression,
    },
    /// SQL `like` with `%` and `_` wildcards
    Like {
        expression: Expression,
        pattern: Expression,
    },
    IsNull(Expression),
    IsNotNull(Expression),
    /// Conjunction; empty means always true
    And(Vec<Predicate>),
    /// Disjunction; empty means always false
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Visits every expression in this predicate, depth first, left to right
    pub fn for_each_expression<'a>(&'a self, visit: &mut dyn FnMut(&'a Expression)) {
        match self {
            Predicate::Comparison { left, right, .. } => {
                visit(left);
                visit(right);
            }
            Predicate::Like {
                expression,
                pattern,
            } => {
                visit(expression);
                visit(pattern);
            }
            Predicate::IsNull(e) | Predicate::IsNotNull(e) => visit(e),
            Predicate::And(items) | Predicate::Or(items) => {
                for item in items {
                    item.for_each_expression(visit);
                }
            }
            Predicate::Not(inner) => inner.for_each_expression(visit),
        }
    }
}

/// Ordering over an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub expression: Expression,
    pub direction: Direction,
}

impl Order {
    pub fn asc(expression: impl Into<Expression>) -> Self {
        Self {
            expression: expression.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(expression: impl Into<Expression>) -> Self {
        Self {
            expression: expression.into(),
            direction: Direction::Desc,
        }
    }
}

/// What a query projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The entity bound to a source alias
    Root(String),
    /// Row count of a source alias, optionally over distinct entities
    Count { alias: String, distinct: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_accepts() {
        assert!(ValueType::Integer.accepts(&json!(42)));
        assert!(!ValueType::Integer.accepts(&json!(4.2)));
        assert!(!ValueType::Integer.accepts(&json!("42")));
        assert!(ValueType::String.accepts(&Value::Null));
        assert!(ValueType::Any.accepts(&json!({"a": 1})));
    }

    #[test]
    fn test_parameter_identity() {
        let a = ParameterExpression::new(ValueType::Integer);
        let b = ParameterExpression::new(ValueType::Integer);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_path_navigation() {
        let path = Path::new("user", None).get("address").get("city");
        assert_eq!(path.attribute.as_deref(), Some("address.city"));
        assert_eq!(path.alias, "user");
    }

    #[test]
    fn test_predicate_expression_walk() {
        let p = ParameterExpression::new(ValueType::Any);
        let pred = Predicate::And(vec![
            Predicate::IsNull(Expression::Path(Path::new("u", Some("a".into())))),
            Predicate::Not(Box::new(Predicate::Comparison {
                op: ComparisonOp::Eq,
                left: Expression::Path(Path::new("u", Some("b".into()))),
                right: Expression::Parameter(p.clone()),
            })),
        ]);

        let mut seen = Vec::new();
        pred.for_each_expression(&mut |e| seen.push(e.clone()));
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], Expression::Parameter(p));
    }
}
