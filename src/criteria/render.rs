//! JPQL rendering of criteria queries
//!
//! Produces the textual form a provider reports for a criteria query.
//! Anonymous parameters render as `:param<N>` in order of first
//! appearance; named parameters keep their name.

use serde_json::Value;

use super::ast::{Expression, Order, Predicate, Selection};
use super::query::CriteriaQuery;

/// Renders `query` as JPQL text
pub fn render_jpql(query: &CriteriaQuery) -> String {
    let renderer = Renderer::new(query);
    renderer.render()
}

struct Renderer<'a> {
    query: &'a CriteriaQuery,
    parameter_names: Vec<(uuid::Uuid, String)>,
}

impl<'a> Renderer<'a> {
    fn new(query: &'a CriteriaQuery) -> Self {
        let parameter_names = query
            .parameters()
            .into_iter()
            .enumerate()
            .map(|(index, p)| {
                let name = match p.name() {
                    Some(name) => name.to_string(),
                    None => format!("param{}", index),
                };
                (p.id(), name)
            })
            .collect();
        Self {
            query,
            parameter_names,
        }
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(128);

        out.push_str("select ");
        out.push_str(&self.selection());

        out.push_str(" from ");
        let sources: Vec<String> = self
            .query
            .roots()
            .iter()
            .map(|r| format!("{} {}", r.entity(), r.alias()))
            .collect();
        out.push_str(&sources.join(", "));

        if let Some(restriction) = self.query.restriction() {
            out.push_str(" where ");
            out.push_str(&self.predicate(restriction, false));
        }

        if !self.query.grouping().is_empty() {
            let groups: Vec<String> = self
                .query
                .grouping()
                .iter()
                .map(|e| self.expression(e))
                .collect();
            out.push_str(" group by ");
            out.push_str(&groups.join(", "));
        }

        if !self.query.orders().is_empty() {
            let orders: Vec<String> = self.query.orders().iter().map(|o| self.order(o)).collect();
            out.push_str(" order by ");
            out.push_str(&orders.join(", "));
        }

        out
    }

    fn selection(&self) -> String {
        let distinct = if self.query.is_distinct() {
            "distinct "
        } else {
            ""
        };
        match self.query.selection() {
            Some(Selection::Root(alias)) => format!("{}{}", distinct, alias),
            Some(Selection::Count { alias, distinct }) => {
                if *distinct {
                    format!("count(distinct {})", alias)
                } else {
                    format!("count({})", alias)
                }
            }
            None => match self.query.roots().first() {
                Some(root) => format!("{}{}", distinct, root.alias()),
                None => "*".to_string(),
            },
        }
    }

    fn order(&self, order: &Order) -> String {
        format!(
            "{} {}",
            self.expression(&order.expression),
            order.direction.as_str()
        )
    }

    fn predicate(&self, predicate: &Predicate, nested: bool) -> String {
        match predicate {
            Predicate::Comparison { op, left, right } => format!(
                "{} {} {}",
                self.expression(left),
                op.symbol(),
                self.expression(right)
            ),
            Predicate::Like {
                expression,
                pattern,
            } => format!(
                "{} like {}",
                self.expression(expression),
                self.expression(pattern)
            ),
            Predicate::IsNull(e) => format!("{} is null", self.expression(e)),
            Predicate::IsNotNull(e) => format!("{} is not null", self.expression(e)),
            Predicate::And(items) if items.is_empty() => "1 = 1".to_string(),
            Predicate::Or(items) if items.is_empty() => "1 = 0".to_string(),
            Predicate::And(items) => self.junction(items, " and ", nested),
            Predicate::Or(items) => self.junction(items, " or ", nested),
            Predicate::Not(inner) => format!("not ({})", self.predicate(inner, false)),
        }
    }

    fn junction(&self, items: &[Predicate], separator: &str, nested: bool) -> String {
        if items.len() == 1 {
            return self.predicate(&items[0], nested);
        }
        let parts: Vec<String> = items.iter().map(|p| self.predicate(p, true)).collect();
        let joined = parts.join(separator);
        if nested {
            format!("({})", joined)
        } else {
            joined
        }
    }

    fn expression(&self, expression: &Expression) -> String {
        match expression {
            Expression::Path(path) => match &path.attribute {
                Some(attribute) => format!("{}.{}", path.alias, attribute),
                None => path.alias.clone(),
            },
            Expression::Literal(value) => literal(value),
            Expression::Parameter(p) => {
                let name = self
                    .parameter_names
                    .iter()
                    .find(|(id, _)| *id == p.id())
                    .map(|(_, name)| name.as_str())
                    .unwrap_or("param");
                format!(":{}", name)
            }
        }
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::builder::CriteriaBuilder;
    use crate::criteria::query::ResultType;
    use crate::criteria::ValueType;
    use serde_json::json;

    #[test]
    fn test_render_simple_select() {
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from("User");
        query.select(Selection::Root(root.alias().to_string()));

        assert_eq!(render_jpql(&query), "select user from User user");
    }

    #[test]
    fn test_render_where_and_order() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from("User");
        query.where_(cb.and([
            cb.equal(root.get("active"), json!(true)),
            cb.or([
                cb.like(root.get("name"), json!("A%")),
                cb.greater_than(root.get("age"), json!(30)),
            ]),
        ]));
        query.order_by(vec![cb.desc(root.get("age"))]);

        assert_eq!(
            render_jpql(&query),
            "select user from User user where user.active = true and \
             (user.name like 'A%' or user.age > 30) order by user.age desc"
        );
    }

    #[test]
    fn test_render_count_distinct_with_parameter() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Long);
        let root = query.from("User");
        let id = cb.parameter(ValueType::Integer);
        query.where_(cb.equal(root.get("id"), &id));
        query.select(cb.count_distinct(&root));

        assert_eq!(
            render_jpql(&query),
            "select count(distinct user) from User user where user.id = :param0"
        );
    }

    #[test]
    fn test_render_escapes_string_literals() {
        let cb = CriteriaBuilder::new();
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from("User");
        query.where_(cb.equal(root.get("name"), json!("O'Brien")));

        assert!(render_jpql(&query).ends_with("user.name = 'O''Brien'"));
    }
}
