//! `SqliteOptionStore` — named JSON documents in the `options` table.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use luna_core::errors::StorageError;
use luna_core::traits::IOptionStore;

use crate::{sqe, Database};

pub struct SqliteOptionStore {
    db: Arc<Database>,
}

impl SqliteOptionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl IOptionStore for SqliteOptionStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM options WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqe)
        })?;
        raw.map(|text| serde_json::from_str(&text).map_err(StorageError::from))
            .transpose()
    }

    fn set_option(&self, name: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO options (name, value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%d %H:%M:%S', 'now'))
                 ON CONFLICT(name) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![name, text],
            )
            .map(|_| ())
            .map_err(sqe)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteOptionStore {
        SqliteOptionStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn missing_option_is_none() {
        assert_eq!(store().get_option("vl_licenses_registry").unwrap(), None);
    }

    #[test]
    fn set_replaces_whole_document() {
        let store = store();
        store.set_option("doc", &json!({"a": 1, "b": 2})).unwrap();
        store.set_option("doc", &json!({"c": 3})).unwrap();
        assert_eq!(store.get_option("doc").unwrap(), Some(json!({"c": 3})));
    }

    #[test]
    fn corrupt_document_is_a_serialization_error() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute("INSERT INTO options (name, value) VALUES ('doc', '{not json')", [])
                .map_err(sqe)
        })
        .unwrap();
        let err = SqliteOptionStore::new(db).get_option("doc").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
