//! Sort specifications
//!
//! A `Sort` is an ordered list of property/direction pairs. It is
//! independent of any query and is converted to criteria orders against a
//! concrete root when a query is built.

use super::ast::Order;
use super::query::Root;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// A single property ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    /// Dotted property path relative to the root
    pub property: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

/// Ordered sort specification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<SortOrder>,
}

impl Sort {
    /// A sort with no orders
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Ascending sort over the given properties
    pub fn by<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            orders: properties.into_iter().map(SortOrder::asc).collect(),
        }
    }

    /// Sort built from explicit orders
    pub fn from_orders(orders: Vec<SortOrder>) -> Self {
        Self { orders }
    }

    /// Appends the orders of `other` after this sort's orders
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    /// Flips every order's direction
    pub fn descending(mut self) -> Self {
        for order in &mut self.orders {
            order.direction = Direction::Desc;
        }
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SortOrder> {
        self.orders.iter()
    }
}

/// Converts a sort into criteria orders on `root`
pub fn to_orders(sort: &Sort, root: &Root) -> Vec<Order> {
    sort.iter()
        .map(|order| {
            let path = root.get(&order.property);
            match order.direction {
                Direction::Asc => Order::asc(path),
                Direction::Desc => Order::desc(path),
            }
        })
        .collect()
}
