//! Shared fixtures for integration tests
//!
//! Employees:
//!
//! | id | name  | dept | age | active | tenant |
//! |----|-------|------|-----|--------|--------|
//! | 1  | alice | eng  | 34  | yes    | acme   |
//! | 2  | bob   | eng  | 28  | no     | acme   |
//! | 3  | carol | ops  | 41  | yes    | globex |
//! | 4  | dave  | eng  | 45  | yes    | globex |
//! | 5  | erin  | ops  | 23  | no     | acme   |
//!
//! Tags: employee 1 has `x` and `y`, employee 3 has `x`.

#![allow(dead_code)]

use std::sync::Arc;

use repoquery::criteria::{CriteriaBuilder, CriteriaQuery, Root};
use repoquery::session::memory::MemorySession;
use repoquery::{
    AugmentationEngine, CrudMethodMetadata, DefaultAugmentationEngine, JsonEntityInformation,
    QueryExecutor, Specification,
};
use repoquery::criteria::ValueType;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub dept: String,
    pub age: i64,
    pub active: bool,
    pub tenant: String,
}

fn employee(id: i64, name: &str, dept: &str, age: i64, active: bool, tenant: &str) -> Employee {
    Employee {
        id,
        name: name.to_string(),
        dept: dept.to_string(),
        age,
        active,
        tenant: tenant.to_string(),
    }
}

pub fn employees() -> Vec<Employee> {
    vec![
        employee(1, "alice", "eng", 34, true, "acme"),
        employee(2, "bob", "eng", 28, false, "acme"),
        employee(3, "carol", "ops", 41, true, "globex"),
        employee(4, "dave", "eng", 45, true, "globex"),
        employee(5, "erin", "ops", 23, false, "acme"),
    ]
}

pub fn session() -> Arc<MemorySession> {
    let session = MemorySession::new();
    session.insert_all("Employee", &employees()).unwrap();
    for tag in [
        json!({"employee": 1, "tag": "x"}),
        json!({"employee": 1, "tag": "y"}),
        json!({"employee": 3, "tag": "x"}),
    ] {
        session.insert("Tag", &tag).unwrap();
    }
    Arc::new(session)
}

pub fn info() -> Arc<JsonEntityInformation<Employee>> {
    Arc::new(JsonEntityInformation::new("Employee", "id", ValueType::Integer))
}

pub fn executor_with(
    session: &Arc<MemorySession>,
    engine: impl AugmentationEngine + 'static,
    metadata: Option<CrudMethodMetadata>,
) -> QueryExecutor<Employee> {
    QueryExecutor::new(info(), session.clone(), Arc::new(engine), metadata)
}

pub fn executor(session: &Arc<MemorySession>) -> QueryExecutor<Employee> {
    executor_with(session, DefaultAugmentationEngine::new(), None)
}

pub fn ids(rows: &[Employee]) -> Vec<i64> {
    rows.iter().map(|e| e.id).collect()
}

pub fn in_dept(dept: &'static str) -> impl Specification<Employee> {
    move |root: &Root, _query: &mut CriteriaQuery, cb: &CriteriaBuilder| {
        Some(cb.equal(root.get("dept"), json!(dept)))
    }
}

pub fn active() -> impl Specification<Employee> {
    |root: &Root, _query: &mut CriteriaQuery, cb: &CriteriaBuilder| {
        Some(cb.equal(root.get("active"), json!(true)))
    }
}

pub fn older_than(age: i64) -> impl Specification<Employee> {
    move |root: &Root, _query: &mut CriteriaQuery, cb: &CriteriaBuilder| {
        Some(cb.greater_than(root.get("age"), json!(age)))
    }
}
