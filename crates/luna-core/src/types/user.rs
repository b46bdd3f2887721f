//! Host accounts as seen by the license gate.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CLIENT_ROLE, META_LEGACY_LICENSE_KEY, META_LICENSE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of an account. The host owns it; the gate only reads and
/// updates the fields below through the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub login: String,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub roles: BTreeSet<String>,
    pub meta: BTreeMap<String, String>,
    /// Side-channel credential column; holds the bound license key.
    pub activation_key: Option<String>,
}

impl UserAccount {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_client(&self) -> bool {
        self.has_role(CLIENT_ROLE)
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The stored license: current field first, then the legacy one.
    pub fn stored_license(&self) -> Option<&str> {
        self.meta(META_LICENSE_KEY)
            .or_else(|| self.meta(META_LEGACY_LICENSE_KEY))
    }
}

/// Input for account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub first_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> UserAccount {
        UserAccount {
            id: UserId(7),
            login: "acme".into(),
            email: "ops@acme.test".into(),
            display_name: "Acme".into(),
            first_name: "Acme".into(),
            roles: BTreeSet::new(),
            meta: BTreeMap::new(),
            activation_key: None,
        }
    }

    #[test]
    fn stored_license_prefers_current_field() {
        let mut user = account();
        user.meta.insert(META_LEGACY_LICENSE_KEY.into(), "VL-OLD0-OLD0-OLD0".into());
        assert_eq!(user.stored_license(), Some("VL-OLD0-OLD0-OLD0"));
        user.meta.insert(META_LICENSE_KEY.into(), "VL-NEW2-NEW2-NEW2".into());
        assert_eq!(user.stored_license(), Some("VL-NEW2-NEW2-NEW2"));
    }

    #[test]
    fn empty_meta_counts_as_absent() {
        let mut user = account();
        user.meta.insert(META_LICENSE_KEY.into(), String::new());
        assert_eq!(user.stored_license(), None);
    }
}
