//! Criteria query model
//!
//! Structural query representation manipulated through roots, paths,
//! predicates and orderings rather than query text.
//!
//! # Building
//!
//! ```ignore
//! let cb = CriteriaBuilder::new();
//! let mut query = CriteriaQuery::new(ResultType::Entity);
//! let user = query.from("User");
//! query.where_(cb.equal(user.get("active"), json!(true)));
//! query.order_by(to_orders(&Sort::by(["name"]), &user));
//! ```

mod ast;
mod builder;
mod query;
mod render;
mod sort;

pub use ast::{
    ComparisonOp, Expression, Order, ParameterExpression, Path, Predicate, Selection, ValueType,
};
pub use builder::CriteriaBuilder;
pub use query::{CriteriaQuery, ResultType, Root};
pub use render::render_jpql;
pub use sort::{to_orders, Direction, Sort, SortOrder};
