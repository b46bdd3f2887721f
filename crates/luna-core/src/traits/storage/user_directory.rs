//! `IUserDirectory` — the host's account store, seen through the license gate.

use std::sync::Arc;

use crate::errors::StorageError;
use crate::types::{NewUser, UserAccount, UserId};

/// Account operations the license gate needs.
///
/// License metadata is written only through [`bind_license`] and
/// [`unbind_license`], which keep both metadata fields and the
/// license → user index in step. `set_meta`/`delete_meta` refuse the
/// license fields with `StorageError::NotSupported`.
///
/// Mutations on an unknown id fail with `StorageError::NotFound`.
///
/// [`bind_license`]: IUserDirectory::bind_license
/// [`unbind_license`]: IUserDirectory::unbind_license
pub trait IUserDirectory: Send + Sync {
    fn get(&self, id: UserId) -> Result<Option<UserAccount>, StorageError>;

    /// Case-insensitive email lookup.
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError>;

    fn login_exists(&self, login: &str) -> Result<bool, StorageError>;

    fn create(&self, user: &NewUser) -> Result<UserId, StorageError>;

    fn update_profile(
        &self,
        id: UserId,
        display_name: &str,
        first_name: &str,
    ) -> Result<(), StorageError>;

    /// Add a role, keeping existing ones.
    fn add_role(&self, id: UserId, role: &str) -> Result<(), StorageError>;

    /// Replace every role with `role`.
    fn set_role(&self, id: UserId, role: &str) -> Result<(), StorageError>;

    fn set_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StorageError>;

    fn delete_meta(&self, id: UserId, key: &str) -> Result<(), StorageError>;

    /// Write `license` into both license fields and the index.
    /// Fails with `StorageError::Conflict` if another account holds it.
    fn bind_license(&self, id: UserId, license: &str) -> Result<(), StorageError>;

    /// Clear both license fields and drop the account's index entry.
    fn unbind_license(&self, id: UserId) -> Result<(), StorageError>;

    /// Index lookup; exact match.
    fn user_for_license(&self, license: &str) -> Result<Option<UserId>, StorageError>;

    /// Side-channel credential column on the account row.
    fn set_activation_key(&self, id: UserId, key: &str) -> Result<(), StorageError>;

    /// Remove the account and its index entries. `false` when absent.
    fn delete(&self, id: UserId) -> Result<bool, StorageError>;
}

// ─── Arc blanket impl ───────────────────────────────────────────────

impl<T: IUserDirectory + ?Sized> IUserDirectory for Arc<T> {
    fn get(&self, id: UserId) -> Result<Option<UserAccount>, StorageError> {
        (**self).get(id)
    }
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError> {
        (**self).find_by_email(email)
    }
    fn login_exists(&self, login: &str) -> Result<bool, StorageError> {
        (**self).login_exists(login)
    }
    fn create(&self, user: &NewUser) -> Result<UserId, StorageError> {
        (**self).create(user)
    }
    fn update_profile(&self, id: UserId, dn: &str, first: &str) -> Result<(), StorageError> {
        (**self).update_profile(id, dn, first)
    }
    fn add_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        (**self).add_role(id, role)
    }
    fn set_role(&self, id: UserId, role: &str) -> Result<(), StorageError> {
        (**self).set_role(id, role)
    }
    fn set_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_meta(id, key, value)
    }
    fn delete_meta(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        (**self).delete_meta(id, key)
    }
    fn bind_license(&self, id: UserId, license: &str) -> Result<(), StorageError> {
        (**self).bind_license(id, license)
    }
    fn unbind_license(&self, id: UserId) -> Result<(), StorageError> {
        (**self).unbind_license(id)
    }
    fn user_for_license(&self, license: &str) -> Result<Option<UserId>, StorageError> {
        (**self).user_for_license(license)
    }
    fn set_activation_key(&self, id: UserId, key: &str) -> Result<(), StorageError> {
        (**self).set_activation_key(id, key)
    }
    fn delete(&self, id: UserId) -> Result<bool, StorageError> {
        (**self).delete(id)
    }
}
