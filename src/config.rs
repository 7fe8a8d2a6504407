//! Executor configuration
//!
//! Loaded from a JSON file. Every field is optional:
//!
//! ```json
//! { "augmentation_enabled": true, "log_queries": false, "log_level": "info" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ_FAILED",
            Self::Parse(_) => "CONFIG_PARSE_FAILED",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

/// Behavior switches of a `QueryExecutor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Consult the augmentation engine (default: true)
    #[serde(default = "default_augmentation_enabled")]
    pub augmentation_enabled: bool,

    /// Log generated query text at TRACE (default: false)
    #[serde(default)]
    pub log_queries: bool,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_augmentation_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            augmentation_enabled: default_augmentation_enabled(),
            log_queries: false,
            log_level: default_log_level(),
        }
    }
}

impl ExecutorConfig {
    /// Reads and validates a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&content)?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("log_level", &config.log_level),
            ],
        );
        Ok(config)
    }

    /// Parses and validates a configuration document
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: ExecutorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of trace, info, warn, error, fatal (got '{}')",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Parsed minimum severity; `validate` guarantees it is known
    pub fn severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }

    /// Applies `log_level` as the process-wide minimum severity
    pub fn init_logging(&self) {
        Logger::set_min_severity(self.severity());
    }
}
