//! # luna-storage
//!
//! SQLite persistence for the Luna license gate.
//! One write-serialized connection (WAL mode) shared by the option store
//! that holds the license registry document and the user directory that
//! holds accounts, roles, metadata and the license index.

pub mod database;
pub mod migrations;
pub mod option_store;
pub mod password;
pub mod pragmas;
pub mod user_directory;

pub use database::Database;
pub use option_store::SqliteOptionStore;
pub use user_directory::SqliteUserDirectory;

use luna_core::errors::StorageError;

/// Convert any displayable SQLite failure into `StorageError::SqliteError`.
pub(crate) fn sqe(e: impl std::fmt::Display) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}
