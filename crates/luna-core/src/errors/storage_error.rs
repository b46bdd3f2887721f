//! Storage-layer errors shared by every backend.

use super::error_code::{self, LunaErrorCode};

/// Errors that can occur in an option store or user directory.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("License {license_key} is already bound to user {holder}")]
    Conflict { license_key: String, holder: u64 },

    #[error("Not found: {entity}")]
    NotFound { entity: String },

    #[error("Operation not supported: {operation}: {reason}")]
    NotSupported { operation: String, reason: String },

    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl LunaErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => error_code::CONFLICT,
            Self::NotFound { .. } => error_code::NOT_FOUND,
            Self::NotSupported { .. } => error_code::NOT_SUPPORTED,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
