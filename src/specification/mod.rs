//! Specifications
//!
//! A specification turns a query root into an optional filter condition.
//! Closures with the `to_predicate` signature are specifications, and the
//! free functions here compose them.

use std::marker::PhantomData;

use crate::criteria::{CriteriaBuilder, CriteriaQuery, Predicate, Root};

/// Reusable predicate builder over an entity `T`
pub trait Specification<T> {
    /// Builds the filter for `root`, or `None` for no filtering
    fn to_predicate(
        &self,
        root: &Root,
        query: &mut CriteriaQuery,
        builder: &CriteriaBuilder,
    ) -> Option<Predicate>;
}

impl<T, F> Specification<T> for F
where
    F: Fn(&Root, &mut CriteriaQuery, &CriteriaBuilder) -> Option<Predicate>,
{
    fn to_predicate(
        &self,
        root: &Root,
        query: &mut CriteriaQuery,
        builder: &CriteriaBuilder,
    ) -> Option<Predicate> {
        self(root, query, builder)
    }
}

/// Type-erased specification, the result type of the combinators
pub struct BoxedSpecification<'a, T> {
    inner: Box<dyn Specification<T> + 'a>,
}

impl<'a, T> BoxedSpecification<'a, T> {
    pub fn new(spec: impl Specification<T> + 'a) -> Self {
        Self {
            inner: Box::new(spec),
        }
    }
}

impl<'a, T> Specification<T> for BoxedSpecification<'a, T> {
    fn to_predicate(
        &self,
        root: &Root,
        query: &mut CriteriaQuery,
        builder: &CriteriaBuilder,
    ) -> Option<Predicate> {
        self.inner.to_predicate(root, query, builder)
    }
}

enum Junction {
    And,
    Or,
}

struct Composite<'a, T> {
    junction: Junction,
    left: BoxedSpecification<'a, T>,
    right: BoxedSpecification<'a, T>,
}

impl<'a, T> Specification<T> for Composite<'a, T> {
    fn to_predicate(
        &self,
        root: &Root,
        query: &mut CriteriaQuery,
        builder: &CriteriaBuilder,
    ) -> Option<Predicate> {
        let left = self.left.to_predicate(root, query, builder);
        let right = self.right.to_predicate(root, query, builder);

        match (left, right) {
            (None, None) => None,
            (Some(p), None) | (None, Some(p)) => Some(p),
            (Some(l), Some(r)) => Some(match self.junction {
                Junction::And => builder.and([l, r]),
                Junction::Or => builder.or([l, r]),
            }),
        }
    }
}

struct Negated<'a, T> {
    inner: BoxedSpecification<'a, T>,
}

impl<'a, T> Specification<T> for Negated<'a, T> {
    fn to_predicate(
        &self,
        root: &Root,
        query: &mut CriteriaQuery,
        builder: &CriteriaBuilder,
    ) -> Option<Predicate> {
        self.inner
            .to_predicate(root, query, builder)
            .map(|p| builder.not(p))
    }
}

struct Unrestricted<T>(PhantomData<fn() -> T>);

impl<T> Specification<T> for Unrestricted<T> {
    fn to_predicate(&self, _: &Root, _: &mut CriteriaQuery, _: &CriteriaBuilder) -> Option<Predicate> {
        None
    }
}

/// Wraps `spec`; an absent spec yields no predicate
pub fn where_<'a, T: 'a>(spec: Option<BoxedSpecification<'a, T>>) -> BoxedSpecification<'a, T> {
    match spec {
        Some(spec) => spec,
        None => BoxedSpecification::new(Unrestricted(PhantomData)),
    }
}

/// Both specifications must hold
pub fn and<'a, T: 'a>(
    left: impl Specification<T> + 'a,
    right: impl Specification<T> + 'a,
) -> BoxedSpecification<'a, T> {
    BoxedSpecification::new(Composite {
        junction: Junction::And,
        left: BoxedSpecification::new(left),
        right: BoxedSpecification::new(right),
    })
}

/// Either specification must hold
pub fn or<'a, T: 'a>(
    left: impl Specification<T> + 'a,
    right: impl Specification<T> + 'a,
) -> BoxedSpecification<'a, T> {
    BoxedSpecification::new(Composite {
        junction: Junction::Or,
        left: BoxedSpecification::new(left),
        right: BoxedSpecification::new(right),
    })
}

/// Negates `spec`
pub fn not<'a, T: 'a>(spec: impl Specification<T> + 'a) -> BoxedSpecification<'a, T> {
    BoxedSpecification::new(Negated {
        inner: BoxedSpecification::new(spec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::ResultType;
    use serde_json::json;

    struct User;

    fn active(root: &Root, _: &mut CriteriaQuery, cb: &CriteriaBuilder) -> Option<Predicate> {
        Some(cb.equal(root.get("active"), json!(true)))
    }

    fn adult(root: &Root, _: &mut CriteriaQuery, cb: &CriteriaBuilder) -> Option<Predicate> {
        Some(cb.greater_than_or_equal(root.get("age"), json!(18)))
    }

    fn nothing(_: &Root, _: &mut CriteriaQuery, _: &CriteriaBuilder) -> Option<Predicate> {
        None
    }

    fn build(spec: &dyn Specification<User>) -> Option<Predicate> {
        let mut query = CriteriaQuery::new(ResultType::Entity);
        let root = query.from("User");
        spec.to_predicate(&root, &mut query, &CriteriaBuilder::new())
    }

    #[test]
    fn test_and_combines_both() {
        let spec = and::<User>(active, adult);
        match build(&spec) {
            Some(Predicate::And(items)) => assert_eq!(items.len(), 2),
            other => panic!("unexpected predicate {:?}", other),
        }
    }

    #[test]
    fn test_or_with_empty_side_returns_other() {
        let spec = or::<User>(nothing, adult);
        let expected = build(&adult);
        assert_eq!(build(&spec), expected);
    }

    #[test]
    fn test_not_of_nothing_is_nothing() {
        assert!(build(&not::<User>(nothing)).is_none());
        assert!(matches!(build(&not::<User>(active)), Some(Predicate::Not(_))));
    }

    #[test]
    fn test_where_of_none_is_unrestricted() {
        assert!(build(&where_::<User>(None)).is_none());
        assert!(build(&where_::<User>(Some(BoxedSpecification::new(active)))).is_some());
    }
}
