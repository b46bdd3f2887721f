//! Schema steps. Each step is plain SQL applied in its own immediate
//! transaction together with its `schema_version` row, so a failed step
//! leaves the previous version intact.

mod v001_initial_schema;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use luna_core::errors::StorageError;

use crate::sqe;

pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: v001_initial_schema::SQL,
}];

pub const LATEST_VERSION: u32 = 1;

const VERSION_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version    INTEGER PRIMARY KEY,
        name       TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now'))
    );
";

/// Highest applied step; 0 for a database that was never migrated.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    let tracked: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqe)?;
    if tracked.is_none() {
        return Ok(0);
    }
    conn.query_row("SELECT IFNULL(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .map_err(sqe)
}

/// Bring the schema up to [`LATEST_VERSION`]. Returns the versions applied.
pub fn migrate(conn: &mut Connection) -> Result<Vec<u32>, StorageError> {
    conn.execute_batch(VERSION_TABLE).map_err(sqe)?;
    let from = current_version(conn)?;

    let mut applied = Vec::new();
    for step in MIGRATIONS.iter().filter(|m| m.version > from) {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqe)?;
        tx.execute_batch(step.sql)
            .map_err(|e| sqe(format!("v{:03} {}: {e}", step.version, step.name)))?;
        tx.execute(
            "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
            rusqlite::params![step.version, step.name],
        )
        .map_err(sqe)?;
        tx.commit().map_err(sqe)?;
        info!(version = step.version, name = step.name, "schema step applied");
        applied.push(step.version);
    }

    if applied.is_empty() {
        debug!(version = from, "schema up to date");
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_ordered_and_end_at_latest() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(LATEST_VERSION));
    }

    #[test]
    fn fresh_database_migrates_to_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);
        assert_eq!(migrate(&mut conn).unwrap(), vec![1]);
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
        let name: String = conn
            .query_row("SELECT name FROM schema_version WHERE version = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "initial_schema");
    }

    #[test]
    fn second_run_is_a_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert!(migrate(&mut conn).unwrap().is_empty());
    }
}
