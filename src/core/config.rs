// src/core/config.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_CLI_SENTINEL;

/// Errors raised while loading dispatcher configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse dispatcher configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Process-level dispatcher settings.
///
/// Built once at startup (from defaults or a TOML document) and passed by
/// reference to the hosting wrapper; effectively immutable once dispatch
/// begins. There is deliberately no globally reachable configuration
/// object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// The leading process argument that selects command dispatch over the
    /// normal service entry point.
    pub cli_sentinel: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            cli_sentinel: DEFAULT_CLI_SENTINEL.to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Loads settings from a TOML document; absent keys keep their
    /// defaults, unknown keys are rejected.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Replaces the CLI sentinel keyword, for hosts that reserve the
    /// default one for something else.
    pub fn with_sentinel(mut self, keyword: impl Into<String>) -> Self {
        self.cli_sentinel = keyword.into();
        self
    }
}
