//! Database — the single owner of the SQLite connection.
//!
//! Every store goes through `with_conn` or `with_tx`; nothing else touches
//! a raw `Connection`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use luna_core::errors::StorageError;

use crate::{migrations, pragmas, sqe};

pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) a file-backed database, apply PRAGMAs and run
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::SqliteError {
                message: format!("create {}: {e}", parent.display()),
            })?;
        }
        let conn = Connection::open(path).map_err(sqe)?;
        let db = Self::init(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Private in-memory database. Used by tests and the `in_memory` config flag.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory().map_err(sqe)?, None)
    }

    fn init(mut conn: Connection, path: Option<PathBuf>) -> Result<Self, StorageError> {
        pragmas::configure_connection(&conn)?;
        migrations::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Poisoned(format!("connection: {e}")))?;
        f(&conn)
    }

    /// Run `f` inside an immediate transaction; commit on `Ok`, roll back on `Err`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Poisoned(format!("connection: {e}")))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqe)?;
        let out = f(&tx)?;
        tx.commit().map_err(sqe)?;
        Ok(out)
    }

    pub fn schema_version(&self) -> Result<u32, StorageError> {
        self.with_conn(migrations::current_version)
    }
}
