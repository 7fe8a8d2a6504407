//! Observable events of query construction and execution

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Find query built and ready to execute
    QueryBuilt,
    /// Count query built and ready to execute
    CountQueryBuilt,
    /// An augmentor rewrote a query context
    AugmentationApplied,
    /// Augmentation was disabled by configuration
    AugmentationSkipped,
    /// Find-one lookup matched nothing
    FindOneEmpty,
    /// Count query executed and its rows summed
    CountExecuted,
    ConfigLoaded,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryBuilt => "QUERY_BUILT",
            Event::CountQueryBuilt => "COUNT_QUERY_BUILT",
            Event::AugmentationApplied => "AUGMENTATION_APPLIED",
            Event::AugmentationSkipped => "AUGMENTATION_SKIPPED",
            Event::FindOneEmpty => "FIND_ONE_EMPTY",
            Event::CountExecuted => "COUNT_EXECUTED",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_upper_snake() {
        for event in [
            Event::QueryBuilt,
            Event::CountQueryBuilt,
            Event::AugmentationApplied,
            Event::AugmentationSkipped,
            Event::FindOneEmpty,
            Event::CountExecuted,
            Event::ConfigLoaded,
        ] {
            assert!(event.as_str().chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Event::CountExecuted.to_string(), "COUNT_EXECUTED");
    }
}
