//! Storage configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database. Default: "luna.db".
    pub db_path: Option<String>,
    /// Keep everything in memory (tests, demos).
    pub in_memory: bool,
}

impl StorageConfig {
    pub fn effective_db_path(&self) -> &str {
        self.db_path.as_deref().unwrap_or("luna.db")
    }
}
