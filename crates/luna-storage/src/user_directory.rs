//! `SqliteUserDirectory` — accounts, roles, metadata and the license index.
//!
//! The two license metadata fields and the `license_index` row are written
//! together in one transaction; the index's primary key makes a license
//! bindable to one account at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use luna_core::constants::LICENSE_META_KEYS;
use luna_core::errors::StorageError;
use luna_core::traits::IUserDirectory;
use luna_core::types::{NewUser, UserAccount, UserId};

use crate::password::{hash_password, verify_password};
use crate::{sqe, Database};

pub struct SqliteUserDirectory {
    db: Arc<Database>,
}

impl SqliteUserDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Credential check for the login endpoint. `identifier` is a login or
    /// an email address.
    pub fn authenticate(&self, identifier: &str, password: &str) -> Result<Option<UserAccount>, StorageError> {
        let found: Option<(i64, String)> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, password_hash FROM users WHERE login = ?1 OR email = ?1",
                [identifier],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(sqe)
        })?;
        match found {
            Some((id, hash)) if verify_password(password, &hash) => self.get(to_user_id(id)),
            _ => Ok(None),
        }
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(sqe)
        })
    }
}

impl IUserDirectory for SqliteUserDirectory {
    fn get(&self, id: UserId) -> Result<Option<UserAccount>, StorageError> {
        self.db.with_conn(|conn| load_user(conn, id))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError> {
        self.db.with_conn(|conn| {
            let id: Option<i64> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", [email], |row| row.get(0))
                .optional()
                .map_err(sqe)?;
            match id {
                Some(id) => load_user(conn, to_user_id(id)),
                None => Ok(None),
            }
        })
    }

    fn login_exists(&self, login: &str) -> Result<bool, StorageError> {
        self.db.with_conn(|conn| {
            conn.prepare("SELECT 1 FROM users WHERE login = ?1")
                .and_then(|mut stmt| stmt.exists([login]))
                .map_err(sqe)
        })
    }

    fn create(&self, user: &NewUser) -> Result<UserId, StorageError> {
        let hash = hash_password(&user.password);
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (login, email, password_hash, display_name, first_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user.login, user.email, hash, user.display_name, user.first_name],
            )
            .map_err(sqe)?;
            let id = to_user_id(conn.last_insert_rowid());
            debug!(user_id = %id, login = %user.login, "user created");
            Ok(id)
        })
    }

    fn update_profile(&self, id: UserId, display_name: &str, first_name: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET display_name = ?2, first_name = ?3 WHERE id = ?1",
                    params![id.0 as i64, display_name, first_name],
                )
                .map_err(sqe)?;
            require_row(changed, id)
        })
    }

    fn add_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            ensure_user(conn, id)?;
            conn.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
                params![id.0 as i64, role],
            )
            .map(|_| ())
            .map_err(sqe)
        })
    }

    fn set_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        self.db.with_tx(|tx| {
            ensure_user(tx, id)?;
            tx.execute("DELETE FROM user_roles WHERE user_id = ?1", [id.0 as i64])
                .map_err(sqe)?;
            tx.execute(
                "INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)",
                params![id.0 as i64, role],
            )
            .map(|_| ())
            .map_err(sqe)
        })
    }

    fn set_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StorageError> {
        guard_license_field("set_meta", key)?;
        self.db.with_conn(|conn| {
            ensure_user(conn, id)?;
            upsert_meta(conn, id, key, value)
        })
    }

    fn delete_meta(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        guard_license_field("delete_meta", key)?;
        self.db.with_conn(|conn| {
            ensure_user(conn, id)?;
            conn.execute(
                "DELETE FROM user_meta WHERE user_id = ?1 AND meta_key = ?2",
                params![id.0 as i64, key],
            )
            .map(|_| ())
            .map_err(sqe)
        })
    }

    fn bind_license(&self, id: UserId, license: &str) -> Result<(), StorageError> {
        self.db.with_tx(|tx| {
            let holder: Option<i64> = tx
                .query_row(
                    "SELECT user_id FROM license_index WHERE license_key = ?1",
                    [license],
                    |row| row.get(0),
                )
                .optional()
                .map_err(sqe)?;
            if let Some(holder) = holder.filter(|h| *h != id.0 as i64) {
                return Err(StorageError::Conflict {
                    license_key: license.to_string(),
                    holder: holder as u64,
                });
            }
            ensure_user(tx, id)?;
            for field in LICENSE_META_KEYS {
                upsert_meta(tx, id, field, license)?;
            }
            tx.execute("DELETE FROM license_index WHERE user_id = ?1", [id.0 as i64])
                .map_err(sqe)?;
            tx.execute(
                "INSERT INTO license_index (license_key, user_id) VALUES (?1, ?2)",
                params![license, id.0 as i64],
            )
            .map_err(sqe)?;
            Ok(())
        })
    }

    fn unbind_license(&self, id: UserId) -> Result<(), StorageError> {
        self.db.with_tx(|tx| {
            ensure_user(tx, id)?;
            for field in LICENSE_META_KEYS {
                tx.execute(
                    "DELETE FROM user_meta WHERE user_id = ?1 AND meta_key = ?2",
                    params![id.0 as i64, field],
                )
                .map_err(sqe)?;
            }
            tx.execute("DELETE FROM license_index WHERE user_id = ?1", [id.0 as i64])
                .map(|_| ())
                .map_err(sqe)
        })
    }

    fn user_for_license(&self, license: &str) -> Result<Option<UserId>, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id FROM license_index WHERE license_key = ?1",
                [license],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|id| id.map(to_user_id))
            .map_err(sqe)
        })
    }

    fn set_activation_key(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET activation_key = ?2 WHERE id = ?1",
                    params![id.0 as i64, key],
                )
                .map_err(sqe)?;
            require_row(changed, id)
        })
    }

    fn delete(&self, id: UserId) -> Result<bool, StorageError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [id.0 as i64])
                .map(|n| n > 0)
                .map_err(sqe)
        })
    }
}

// ─── Row helpers ────────────────────────────────────────────────────

fn to_user_id(raw: i64) -> UserId {
    UserId(raw as u64)
}

fn load_user(conn: &Connection, id: UserId) -> Result<Option<UserAccount>, StorageError> {
    let row = conn
        .query_row(
            "SELECT login, email, display_name, first_name, activation_key
             FROM users WHERE id = ?1",
            [id.0 as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()
        .map_err(sqe)?;
    let Some((login, email, display_name, first_name, activation_key)) = row else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare("SELECT role FROM user_roles WHERE user_id = ?1")
        .map_err(sqe)?;
    let roles = stmt
        .query_map([id.0 as i64], |row| row.get::<_, String>(0))
        .map_err(sqe)?
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(sqe)?;

    let mut stmt = conn
        .prepare("SELECT meta_key, meta_value FROM user_meta WHERE user_id = ?1")
        .map_err(sqe)?;
    let meta = stmt
        .query_map([id.0 as i64], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(sqe)?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map_err(sqe)?;

    Ok(Some(UserAccount {
        id,
        login,
        email,
        display_name,
        first_name,
        roles,
        meta,
        activation_key,
    }))
}

fn ensure_user(conn: &Connection, id: UserId) -> Result<(), StorageError> {
    let exists = conn
        .prepare("SELECT 1 FROM users WHERE id = ?1")
        .and_then(|mut stmt| stmt.exists([id.0 as i64]))
        .map_err(sqe)?;
    require_row(usize::from(exists), id)
}

fn require_row(changed: usize, id: UserId) -> Result<(), StorageError> {
    if changed == 0 {
        return Err(StorageError::NotFound {
            entity: format!("user {id}"),
        });
    }
    Ok(())
}

fn upsert_meta(conn: &Connection, id: UserId, key: &str, value: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO user_meta (user_id, meta_key, meta_value) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
        params![id.0 as i64, key, value],
    )
    .map(|_| ())
    .map_err(sqe)
}

fn guard_license_field(operation: &str, key: &str) -> Result<(), StorageError> {
    if LICENSE_META_KEYS.contains(&key) {
        return Err(StorageError::NotSupported {
            operation: operation.to_string(),
            reason: format!("{key} is written through bind_license/unbind_license"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use luna_core::constants::{CLIENT_ROLE, META_LEGACY_LICENSE_KEY, META_LICENSE_KEY};

    fn directory() -> SqliteUserDirectory {
        SqliteUserDirectory::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn new_user(login: &str) -> NewUser {
        NewUser {
            login: login.into(),
            email: format!("{login}@example.com"),
            password: "correct horse".into(),
            display_name: login.into(),
            first_name: login.into(),
        }
    }

    #[test]
    fn create_and_load_round_trip() {
        let dir = directory();
        let id = dir.create(&new_user("client")).unwrap();
        dir.set_role(id, CLIENT_ROLE).unwrap();
        dir.set_meta(id, "vl_client_site", "https://example.com").unwrap();
        let user = dir.get(id).unwrap().unwrap();
        assert_eq!(user.login, "client");
        assert!(user.is_client());
        assert_eq!(user.meta("vl_client_site"), Some("https://example.com"));
        assert_eq!(user.activation_key, None);
    }

    #[test]
    fn email_lookup_ignores_case() {
        let dir = directory();
        let id = dir.create(&new_user("client")).unwrap();
        assert_eq!(dir.find_by_email("CLIENT@Example.com").unwrap().map(|u| u.id), Some(id));
        assert!(dir.login_exists("Client").unwrap());
        assert!(!dir.login_exists("client1").unwrap());
    }

    #[test]
    fn duplicate_login_is_rejected() {
        let dir = directory();
        dir.create(&new_user("client")).unwrap();
        let mut dup = new_user("client");
        dup.email = "other@example.com".into();
        assert!(matches!(dir.create(&dup).unwrap_err(), StorageError::SqliteError { .. }));
    }

    #[test]
    fn bind_writes_both_fields_and_index() {
        let dir = directory();
        let id = dir.create(&new_user("client")).unwrap();
        dir.bind_license(id, "VL-AWJJ-8J6S-GD6R").unwrap();
        let user = dir.get(id).unwrap().unwrap();
        assert_eq!(user.meta(META_LICENSE_KEY), Some("VL-AWJJ-8J6S-GD6R"));
        assert_eq!(user.meta(META_LEGACY_LICENSE_KEY), Some("VL-AWJJ-8J6S-GD6R"));
        assert_eq!(dir.user_for_license("VL-AWJJ-8J6S-GD6R").unwrap(), Some(id));
    }

    #[test]
    fn rebinding_moves_the_index_entry() {
        let dir = directory();
        let id = dir.create(&new_user("client")).unwrap();
        dir.bind_license(id, "VL-AWJJ-8J6S-GD6R").unwrap();
        dir.bind_license(id, "VL-H2K3-ZFQK-DKDC").unwrap();
        assert_eq!(dir.user_for_license("VL-AWJJ-8J6S-GD6R").unwrap(), None);
        assert_eq!(dir.user_for_license("VL-H2K3-ZFQK-DKDC").unwrap(), Some(id));
    }

    #[test]
    fn second_holder_conflicts_and_nothing_changes() {
        let dir = directory();
        let first = dir.create(&new_user("first")).unwrap();
        let second = dir.create(&new_user("second")).unwrap();
        dir.bind_license(first, "VL-AWJJ-8J6S-GD6R").unwrap();
        let err = dir.bind_license(second, "VL-AWJJ-8J6S-GD6R").unwrap_err();
        assert!(matches!(err, StorageError::Conflict { holder, .. } if holder == first.0));
        assert_eq!(dir.get(second).unwrap().unwrap().stored_license(), None);
    }

    #[test]
    fn unbind_and_delete_clear_the_index() {
        let dir = directory();
        let id = dir.create(&new_user("client")).unwrap();
        dir.bind_license(id, "VL-AWJJ-8J6S-GD6R").unwrap();
        dir.unbind_license(id).unwrap();
        assert_eq!(dir.get(id).unwrap().unwrap().stored_license(), None);
        assert_eq!(dir.user_for_license("VL-AWJJ-8J6S-GD6R").unwrap(), None);

        dir.bind_license(id, "VL-AWJJ-8J6S-GD6R").unwrap();
        assert!(dir.delete(id).unwrap());
        assert!(!dir.delete(id).unwrap());
        assert_eq!(dir.user_for_license("VL-AWJJ-8J6S-GD6R").unwrap(), None);
    }

    #[test]
    fn license_fields_are_guarded() {
        let dir = directory();
        let id = dir.create(&new_user("client")).unwrap();
        for key in LICENSE_META_KEYS {
            assert!(matches!(
                dir.set_meta(id, key, "VL-AWJJ-8J6S-GD6R").unwrap_err(),
                StorageError::NotSupported { .. }
            ));
        }
    }

    #[test]
    fn mutations_on_unknown_user_are_not_found() {
        let dir = directory();
        let ghost = UserId(42);
        assert!(matches!(dir.add_role(ghost, CLIENT_ROLE).unwrap_err(), StorageError::NotFound { .. }));
        assert!(matches!(dir.bind_license(ghost, "VL-AWJJ-8J6S-GD6R").unwrap_err(), StorageError::NotFound { .. }));
        assert!(matches!(dir.set_activation_key(ghost, "k").unwrap_err(), StorageError::NotFound { .. }));
    }

    #[test]
    fn authenticate_by_login_or_email() {
        let dir = directory();
        let id = dir.create(&new_user("client")).unwrap();
        assert_eq!(dir.authenticate("client", "correct horse").unwrap().map(|u| u.id), Some(id));
        assert_eq!(
            dir.authenticate("client@example.com", "correct horse").unwrap().map(|u| u.id),
            Some(id)
        );
        assert!(dir.authenticate("client", "wrong").unwrap().is_none());
        assert!(dir.authenticate("nobody", "correct horse").unwrap().is_none());
    }
}
