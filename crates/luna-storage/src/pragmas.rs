//! SQLite PRAGMA configuration. Applied to every connection right after
//! opening.

use rusqlite::Connection;

use luna_core::errors::StorageError;

use crate::sqe;

pub fn configure_connection(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA cache_size = -8000;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(sqe)
}
