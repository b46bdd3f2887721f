//! Logging configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "luna_core=debug". `LUNA_LOG` overrides it.
    pub level: Option<String>,
    /// "pretty", "compact" or "json". Default: "pretty".
    pub format: Option<String>,
}

impl LoggingConfig {
    pub fn effective_level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn effective_format(&self) -> &str {
        self.format.as_deref().unwrap_or("pretty")
    }
}
