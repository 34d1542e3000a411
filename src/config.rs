//! Column configuration - TOML file or environment

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Cells reserved up front.
    #[serde(default)]
    pub initial_capacity: usize,

    /// Emit a trace event for every bridge call.
    #[serde(default = "default_false")]
    pub trace_events: bool,

    /// Teardown failures at which a summary warning is logged.
    #[serde(default = "default_one")]
    pub teardown_warn_threshold: usize,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            trace_events: false,
            teardown_warn_threshold: 1,
        }
    }
}

fn default_false() -> bool { false }
fn default_one() -> usize { 1 }

impl ColumnConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults overridden by `OBJREF_INITIAL_CAPACITY` and
    /// `OBJREF_TRACE_EVENTS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("OBJREF_INITIAL_CAPACITY") {
            config.initial_capacity = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "OBJREF_INITIAL_CAPACITY",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("OBJREF_TRACE_EVENTS") {
            config.trace_events = match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "OBJREF_TRACE_EVENTS",
                        value,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_trace_events(mut self, enabled: bool) -> Self {
        self.trace_events = enabled;
        self
    }
}
