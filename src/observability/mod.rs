//! Observability for query construction and execution
//!
//! - Structured logging (JSON lines)
//! - Monotonic counters
//! - Typed events
//!
//! Observability is read-only: nothing here changes query behavior.
//!
//! ```ignore
//! use repoquery::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::CountExecuted, &[("rows", "3")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_count_queries_built();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Logs an event at INFO
pub fn log_event(event: Event) {
    Logger::info(event.as_str(), &[]);
}

/// Logs an event with fields at INFO
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::info(event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigLoaded);
        log_event_with_fields(Event::QueryBuilt, &[("entity", "User")]);
    }
}
