//! In-memory test doubles for the storage, clock and session seams.
//!
//! Used by unit tests, integration tests and the server's in-memory mode.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::constants::LICENSE_META_KEYS;
use crate::errors::StorageError;
use crate::traits::clock::Clock;
use crate::traits::session::SessionSink;
use crate::types::{NewUser, SessionGrant, UserAccount, UserId};

use super::option_store::IOptionStore;
use super::user_directory::IUserDirectory;

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, StorageError> {
    mutex
        .lock()
        .map_err(|_| StorageError::Poisoned(what.to_string()))
}

// ─── Option store ───────────────────────────────────────────────────

/// `IOptionStore` over a `HashMap`, counting writes.
#[derive(Default)]
pub struct InMemoryOptionStore {
    options: Mutex<HashMap<String, Value>>,
    writes: AtomicUsize,
}

impl InMemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a raw document without counting a write.
    pub fn preload(&self, name: &str, value: Value) {
        if let Ok(mut options) = self.options.lock() {
            options.insert(name.to_string(), value);
        }
    }

    /// Number of `set_option` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, name: &str) -> Option<Value> {
        self.options.lock().ok()?.get(name).cloned()
    }
}

impl IOptionStore for InMemoryOptionStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StorageError> {
        Ok(lock(&self.options, "options")?.get(name).cloned())
    }

    fn set_option(&self, name: &str, value: &Value) -> Result<(), StorageError> {
        lock(&self.options, "options")?.insert(name.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─── User directory ─────────────────────────────────────────────────

#[derive(Default)]
struct DirectoryState {
    users: BTreeMap<UserId, UserAccount>,
    license_index: HashMap<String, UserId>,
    next_id: u64,
}

impl DirectoryState {
    fn user_mut(&mut self, id: UserId) -> Result<&mut UserAccount, StorageError> {
        self.users.get_mut(&id).ok_or_else(|| StorageError::NotFound {
            entity: format!("user {id}"),
        })
    }

    fn drop_index_for(&mut self, id: UserId) {
        self.license_index.retain(|_, holder| *holder != id);
    }
}

/// `IUserDirectory` over a `BTreeMap`, with the same license index rules as
/// the SQLite directory.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account as-is, bypassing the license field guard. Any
    /// license metadata it carries is indexed. Returns the assigned id.
    pub fn insert(&self, mut account: UserAccount) -> Result<UserId, StorageError> {
        let mut state = lock(&self.state, "users")?;
        state.next_id += 1;
        let id = UserId(state.next_id);
        account.id = id;
        if let Some(license) = account.stored_license().map(str::to_string) {
            state.license_index.insert(license, id);
        }
        state.users.insert(id, account);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<UserAccount> {
        self.state
            .lock()
            .map(|s| s.users.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl IUserDirectory for InMemoryUserDirectory {
    fn get(&self, id: UserId) -> Result<Option<UserAccount>, StorageError> {
        Ok(lock(&self.state, "users")?.users.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError> {
        let state = lock(&self.state, "users")?;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn login_exists(&self, login: &str) -> Result<bool, StorageError> {
        let state = lock(&self.state, "users")?;
        Ok(state.users.values().any(|u| u.login.eq_ignore_ascii_case(login)))
    }

    fn create(&self, user: &NewUser) -> Result<UserId, StorageError> {
        let mut state = lock(&self.state, "users")?;
        if state
            .users
            .values()
            .any(|u| u.login.eq_ignore_ascii_case(&user.login) || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StorageError::SqliteError {
                message: format!("login or email already registered: {}", user.login),
            });
        }
        state.next_id += 1;
        let id = UserId(state.next_id);
        state.users.insert(
            id,
            UserAccount {
                id,
                login: user.login.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
                first_name: user.first_name.clone(),
                roles: BTreeSet::new(),
                meta: BTreeMap::new(),
                activation_key: None,
            },
        );
        Ok(id)
    }

    fn update_profile(&self, id: UserId, display_name: &str, first_name: &str) -> Result<(), StorageError> {
        let mut state = lock(&self.state, "users")?;
        let user = state.user_mut(id)?;
        user.display_name = display_name.to_string();
        user.first_name = first_name.to_string();
        Ok(())
    }

    fn add_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        let mut state = lock(&self.state, "users")?;
        state.user_mut(id)?.roles.insert(role.to_string());
        Ok(())
    }

    fn set_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        let mut state = lock(&self.state, "users")?;
        let user = state.user_mut(id)?;
        user.roles.clear();
        user.roles.insert(role.to_string());
        Ok(())
    }

    fn set_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StorageError> {
        guard_license_field("set_meta", key)?;
        let mut state = lock(&self.state, "users")?;
        state.user_mut(id)?.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_meta(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        guard_license_field("delete_meta", key)?;
        let mut state = lock(&self.state, "users")?;
        state.user_mut(id)?.meta.remove(key);
        Ok(())
    }

    fn bind_license(&self, id: UserId, license: &str) -> Result<(), StorageError> {
        let mut state = lock(&self.state, "users")?;
        if let Some(holder) = state.license_index.get(license).copied() {
            if holder != id && state.users.contains_key(&holder) {
                return Err(StorageError::Conflict {
                    license_key: license.to_string(),
                    holder: holder.0,
                });
            }
        }
        let user = state.user_mut(id)?;
        for field in LICENSE_META_KEYS {
            user.meta.insert(field.to_string(), license.to_string());
        }
        state.drop_index_for(id);
        state.license_index.insert(license.to_string(), id);
        Ok(())
    }

    fn unbind_license(&self, id: UserId) -> Result<(), StorageError> {
        let mut state = lock(&self.state, "users")?;
        let user = state.user_mut(id)?;
        for field in LICENSE_META_KEYS {
            user.meta.remove(field);
        }
        state.drop_index_for(id);
        Ok(())
    }

    fn user_for_license(&self, license: &str) -> Result<Option<UserId>, StorageError> {
        Ok(lock(&self.state, "users")?.license_index.get(license).copied())
    }

    fn set_activation_key(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        let mut state = lock(&self.state, "users")?;
        state.user_mut(id)?.activation_key = Some(key.to_string());
        Ok(())
    }

    fn delete(&self, id: UserId) -> Result<bool, StorageError> {
        let mut state = lock(&self.state, "users")?;
        let removed = state.users.remove(&id).is_some();
        state.drop_index_for(id);
        Ok(removed)
    }
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

// ─── Clock ──────────────────────────────────────────────────────────

/// Clock frozen at a settable instant.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|n| *n).unwrap_or_else(|_| Utc::now())
    }
}

// ─── Session sink ───────────────────────────────────────────────────

/// Records every grant it is asked to establish. Can be told to fail.
#[derive(Default)]
pub struct RecordingSessionSink {
    grants: Mutex<Vec<SessionGrant>>,
    fail: Mutex<bool>,
}

impl RecordingSessionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        if let Ok(mut f) = self.fail.lock() {
            *f = fail;
        }
    }

    pub fn grants(&self) -> Vec<SessionGrant> {
        self.grants.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl SessionSink for RecordingSessionSink {
    fn establish(&self, grant: &SessionGrant) -> Result<(), StorageError> {
        if *lock(&self.fail, "session sink")? {
            return Err(StorageError::NotSupported {
                operation: "establish".to_string(),
                reason: "session sink configured to fail".to_string(),
            });
        }
        lock(&self.grants, "session sink")?.push(grant.clone());
        Ok(())
    }
}
