//! Criteria evaluation over in-memory rows
//!
//! Execution order:
//! 1. Verify every parameter is bound
//! 2. Build the cross product of all sources
//! 3. Filter tuples by the restriction
//! 4. Sort tuples (stable)
//! 5. Project: entity rows, or counts per group
//!
//! Comparison rules: null never matches, no type coercion, ordering
//! comparisons only between two numbers or two strings.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::criteria::{
    ComparisonOp, CriteriaQuery, Direction, Expression, Predicate, Root, Selection,
};
use crate::session::{SessionError, SessionResult};

/// Rows per entity type
pub(crate) type Tables = BTreeMap<String, Vec<Value>>;

/// One combination of source rows, aligned with the query's roots
type Tuple<'a> = Vec<&'a Value>;

/// Checks that `query` only references known entities and declared aliases
pub(crate) fn validate(tables: &Tables, query: &CriteriaQuery) -> SessionResult<()> {
    if query.roots().is_empty() {
        return Err(SessionError::malformed("query has no source"));
    }
    for root in query.roots() {
        if !tables.contains_key(root.entity()) {
            return Err(SessionError::UnknownEntity(root.entity().to_string()));
        }
    }

    let mut aliases: Vec<&str> = Vec::new();
    if let Some(restriction) = query.restriction() {
        restriction.for_each_expression(&mut |e| {
            if let Expression::Path(p) = e {
                aliases.push(&p.alias);
            }
        });
    }
    for expression in query
        .grouping()
        .iter()
        .chain(query.orders().iter().map(|o| &o.expression))
    {
        if let Expression::Path(p) = expression {
            aliases.push(&p.alias);
        }
    }
    match query.selection() {
        Some(Selection::Root(alias)) | Some(Selection::Count { alias, .. }) => aliases.push(alias),
        None => {}
    }

    for alias in aliases {
        if !query.has_alias(alias) {
            return Err(SessionError::malformed(format!("unknown alias '{}'", alias)));
        }
    }
    Ok(())
}

/// Executes `query` against `tables` with the given parameter bindings
pub(crate) fn execute(
    tables: &Tables,
    query: &CriteriaQuery,
    bindings: &HashMap<Uuid, Value>,
) -> SessionResult<Vec<Value>> {
    validate(tables, query)?;

    // Step 1: parameters
    for parameter in query.parameters() {
        if !bindings.contains_key(&parameter.id()) {
            let name = parameter
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| parameter.id().to_string());
            return Err(SessionError::UnboundParameter(name));
        }
    }

    let scope = Scope::new(query.roots(), bindings);

    // Step 2: cross product
    let mut tuples: Vec<Tuple<'_>> = vec![Vec::new()];
    for root in query.roots() {
        let rows = tables
            .get(root.entity())
            .ok_or_else(|| SessionError::UnknownEntity(root.entity().to_string()))?;
        let mut next = Vec::with_capacity(tuples.len() * rows.len());
        for tuple in &tuples {
            for row in rows {
                let mut extended = tuple.clone();
                extended.push(row);
                next.push(extended);
            }
        }
        tuples = next;
    }

    // Step 3: restriction
    if let Some(restriction) = query.restriction() {
        let mut kept = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            if scope.matches(restriction, &tuple)? {
                kept.push(tuple);
            }
        }
        tuples = kept;
    }

    // Step 4: ordering
    if !query.orders().is_empty() {
        let mut keyed = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            let mut keys = Vec::with_capacity(query.orders().len());
            for order in query.orders() {
                keys.push(scope.resolve(&order.expression, &tuple)?);
            }
            keyed.push((keys, tuple));
        }
        keyed.sort_by(|(a, _), (b, _)| {
            for (index, order) in query.orders().iter().enumerate() {
                let ordering = compare_values(&a[index], &b[index]);
                let ordering = match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        tuples = keyed.into_iter().map(|(_, tuple)| tuple).collect();
    }

    // Step 5: projection
    match query.selection() {
        Some(Selection::Count { alias, distinct }) => {
            let index = scope.position(alias)?;
            let mut groups: Vec<(Vec<Value>, Vec<Tuple<'_>>)> = Vec::new();
            if query.grouping().is_empty() {
                groups.push((Vec::new(), tuples));
            } else {
                for tuple in tuples {
                    let mut key = Vec::with_capacity(query.grouping().len());
                    for expression in query.grouping() {
                        key.push(scope.resolve(expression, &tuple)?);
                    }
                    match groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, members)) => members.push(tuple),
                        None => groups.push((key, vec![tuple])),
                    }
                }
            }

            Ok(groups
                .into_iter()
                .map(|(_, members)| {
                    let count = if *distinct {
                        let mut seen: Vec<&Value> = Vec::new();
                        for tuple in &members {
                            if !seen.contains(&tuple[index]) {
                                seen.push(tuple[index]);
                            }
                        }
                        seen.len()
                    } else {
                        members.len()
                    };
                    Value::from(count as i64)
                })
                .collect())
        }
        selection => {
            let index = match selection {
                Some(Selection::Root(alias)) => scope.position(alias)?,
                _ => 0,
            };
            let mut rows: Vec<Value> = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                let row = tuple[index];
                if query.is_distinct() && rows.contains(row) {
                    continue;
                }
                rows.push(row.clone());
            }
            Ok(rows)
        }
    }
}

struct Scope<'q> {
    roots: &'q [Root],
    bindings: &'q HashMap<Uuid, Value>,
    /// `like` patterns compiled so far, by pattern text
    patterns: RefCell<HashMap<String, Regex>>,
}

impl<'q> Scope<'q> {
    fn new(roots: &'q [Root], bindings: &'q HashMap<Uuid, Value>) -> Self {
        Self {
            roots,
            bindings,
            patterns: RefCell::new(HashMap::new()),
        }
    }

    fn like(&self, value: &str, pattern: &str) -> SessionResult<bool> {
        if let Some(regex) = self.patterns.borrow().get(pattern) {
            return Ok(regex.is_match(value));
        }
        let regex = like_regex(pattern)?;
        let matched = regex.is_match(value);
        self.patterns.borrow_mut().insert(pattern.to_string(), regex);
        Ok(matched)
    }

    fn position(&self, alias: &str) -> SessionResult<usize> {
        self.roots
            .iter()
            .position(|r| r.alias() == alias)
            .ok_or_else(|| SessionError::malformed(format!("unknown alias '{}'", alias)))
    }

    fn resolve(&self, expression: &Expression, tuple: &Tuple<'_>) -> SessionResult<Value> {
        match expression {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Parameter(p) => self
                .bindings
                .get(&p.id())
                .cloned()
                .ok_or_else(|| SessionError::UnboundParameter(p.id().to_string())),
            Expression::Path(path) => {
                let mut current = tuple[self.position(&path.alias)?];
                if let Some(attribute) = &path.attribute {
                    for segment in attribute.split('.') {
                        match current.get(segment) {
                            Some(v) => current = v,
                            None => return Ok(Value::Null),
                        }
                    }
                }
                Ok(current.clone())
            }
        }
    }

    fn matches(&self, predicate: &Predicate, tuple: &Tuple<'_>) -> SessionResult<bool> {
        match predicate {
            Predicate::Comparison { op, left, right } => {
                let left = self.resolve(left, tuple)?;
                let right = self.resolve(right, tuple)?;
                Ok(compare_match(*op, &left, &right))
            }
            Predicate::Like {
                expression,
                pattern,
            } => {
                let value = self.resolve(expression, tuple)?;
                let pattern = self.resolve(pattern, tuple)?;
                match (value, pattern) {
                    (Value::String(v), Value::String(p)) => self.like(&v, &p),
                    _ => Ok(false),
                }
            }
            Predicate::IsNull(e) => Ok(self.resolve(e, tuple)?.is_null()),
            Predicate::IsNotNull(e) => Ok(!self.resolve(e, tuple)?.is_null()),
            Predicate::And(items) => {
                for item in items {
                    if !self.matches(item, tuple)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(items) => {
                for item in items {
                    if self.matches(item, tuple)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!self.matches(inner, tuple)?),
        }
    }
}

/// Evaluates a comparison. Null operands never match.
fn compare_match(op: ComparisonOp, left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }

    match op {
        ComparisonOp::Eq => left == right,
        ComparisonOp::Ne => left != right,
        ComparisonOp::Gt => ordered(left, right) == Some(Ordering::Greater),
        ComparisonOp::Ge => matches!(
            ordered(left, right),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        ComparisonOp::Lt => ordered(left, right) == Some(Ordering::Less),
        ComparisonOp::Le => matches!(
            ordered(left, right),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
    }
}

/// Natural ordering between two numbers or two strings
fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total ordering for sorting.
///
/// Ordering rules:
/// - null < bool < number < string < array < object
/// - For same types, natural ordering
fn compare_values(a: &Value, b: &Value) -> Ordering {
    let type_order = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    let a_type = type_order(a);
    let b_type = type_order(b);
    if a_type != b_type {
        return a_type.cmp(&b_type);
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
            ordered(a, b).unwrap_or(Ordering::Equal)
        }
        _ => Ordering::Equal, // Arrays and objects not compared
    }
}

/// Translates a SQL `like` pattern into an anchored regex
fn like_regex(pattern: &str) -> SessionResult<Regex> {
    let mut expression = String::with_capacity(pattern.len() + 8);
    expression.push_str("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression).map_err(|e| SessionError::malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{CriteriaBuilder, ResultType, ValueType};
    use serde_json::json;

    fn tables() -> Tables {
        let mut tables = Tables::new();
        tables.insert(
            "User".into(),
            vec![
                json!({"id": 1, "name": "Alice", "age": 30, "team": "red"}),
                json!({"id": 2, "name": "Bob", "age": 25, "team": "blue"}),
                json!({"id": 3, "name": "Carol", "age": 35, "team": "red"}),
                json!({"id": 4, "name": "Dave", "age": null, "team": "blue"}),
            ],
        );
        tables.insert(
            "Membership".into(),
            vec![
                json!({"user": 1, "group": "a"}),
                json!({"user": 1, "group": "b"}),
                json!({"user": 3, "group": "a"}),
            ],
        );
        tables
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn test_filter_and_sort() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let user = query.from("User");
        query.where_(cb.greater_than_or_equal(user.get("age"), json!(30)));
        query.order_by(vec![cb.desc(user.get("age"))]);

        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(ids(&rows), vec![3, 1]);
    }

    #[test]
    fn test_null_never_matches() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let user = query.from("User");
        query.where_(cb.not_equal(user.get("age"), json!(30)));

        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(ids(&rows), vec![2, 3]);
    }

    #[test]
    fn test_unbound_parameter_fails() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let user = query.from("User");
        query.where_(cb.equal(user.get("id"), cb.parameter(ValueType::Integer)));

        let result = execute(&tables(), &query, &HashMap::new());
        assert!(matches!(result, Err(SessionError::UnboundParameter(_))));
    }

    #[test]
    fn test_like() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let user = query.from("User");
        query.where_(cb.like(user.get("name"), json!("%a%")));

        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(ids(&rows), vec![3, 4]);
    }

    #[test]
    fn test_like_pattern_compiled_once() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let user = query.from("User");
        let predicate = cb.like(user.get("name"), json!("_a%"));

        let tables = tables();
        let bindings = HashMap::new();
        let scope = Scope::new(query.roots(), &bindings);
        let mut matched = Vec::new();
        for row in &tables["User"] {
            if scope.matches(&predicate, &vec![row]).unwrap() {
                matched.push(row["id"].as_i64().unwrap());
            }
        }

        assert_eq!(matched, vec![3, 4]);
        assert_eq!(scope.patterns.borrow().len(), 1);
    }

    #[test]
    fn test_count_and_count_distinct_over_join() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Long);
        let user = query.from("User");
        let membership = query.from("Membership");
        query.where_(cb.equal(membership.get("user"), user.get("id")));
        query.select(cb.count(&user));

        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(rows, vec![json!(3)]);

        query.select(cb.count_distinct(&user));
        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(rows, vec![json!(2)]);
    }

    #[test]
    fn test_grouped_count() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Long);
        let user = query.from("User");
        query.group_by(vec![user.get("team").into()]);
        query.select(cb.count(&user));

        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(rows, vec![json!(2), json!(2)]);
    }

    #[test]
    fn test_count_of_empty_result_is_zero() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Long);
        let user = query.from("User");
        query.where_(cb.disjunction());
        query.select(cb.count(&user));

        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(rows, vec![json!(0)]);
    }

    #[test]
    fn test_distinct_entities() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let user = query.from("User");
        let membership = query.from("Membership");
        query.where_(cb.equal(membership.get("user"), user.get("id")));
        query.select(Selection::Root(user.alias().to_string()));

        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(ids(&rows), vec![1, 1, 3]);

        query.distinct(true);
        let rows = execute(&tables(), &query, &HashMap::new()).unwrap();
        assert_eq!(ids(&rows), vec![1, 3]);
    }

    #[test]
    fn test_unknown_entity() {
        let mut query = CriteriaQuery::new(ResultType::Entity);
        query.from("Nope");
        let result = execute(&tables(), &query, &HashMap::new());
        assert_eq!(result, Err(SessionError::UnknownEntity("Nope".into())));
    }

    #[test]
    fn test_compare_values_type_order() {
        assert_eq!(compare_values(&Value::Null, &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!("a"), &json!(1)), Ordering::Greater);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
    }
}
