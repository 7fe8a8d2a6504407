//! Query execution counters
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters shared by executors and engines
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_built: AtomicU64,
    count_queries_built: AtomicU64,
    augmentations_applied: AtomicU64,
    find_one_misses: AtomicU64,
    count_rows_summed: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_built(&self) {
        self.queries_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_count_queries_built(&self) {
        self.count_queries_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_augmentations_applied(&self) {
        self.augmentations_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_find_one_misses(&self) {
        self.find_one_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds the number of rows a count query returned
    pub fn add_count_rows(&self, rows: u64) {
        self.count_rows_summed.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_built: self.queries_built.load(Ordering::Relaxed),
            count_queries_built: self.count_queries_built.load(Ordering::Relaxed),
            augmentations_applied: self.augmentations_applied.load(Ordering::Relaxed),
            find_one_misses: self.find_one_misses.load(Ordering::Relaxed),
            count_rows_summed: self.count_rows_summed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_built: u64,
    pub count_queries_built: u64,
    pub augmentations_applied: u64,
    pub find_one_misses: u64,
    pub count_rows_summed: u64,
}
