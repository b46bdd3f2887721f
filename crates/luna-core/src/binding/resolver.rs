//! BindingResolver — maps a license to the one account entitled to it and
//! provisions that account when it does not exist.
//!
//! Lookups go through the directory's license index, so a key resolves to at
//! most one account and the answer never depends on store iteration order.

use std::sync::Arc;

use tracing::{info, warn};

use crate::constants::{CLIENT_ROLE, META_CLIENT_SITE};
use crate::errors::{BindingError, StorageError};
use crate::licensing::key_codec::redact;
use crate::licensing::sanitize::{is_email, sanitize_email, sanitize_text_field};
use crate::traits::IUserDirectory;
use crate::types::{NewUser, UserAccount, UserId};

use super::username::{generate_password, unique_username, username_base};

/// Input for [`BindingResolver::ensure_user`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsureUserRequest {
    pub client_name: String,
    pub email: String,
    pub license_key: String,
    pub site: String,
    /// Used only when a new account is created. Blank means generate one.
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureUserOutcome {
    pub user: UserAccount,
    pub created: bool,
}

pub struct BindingResolver {
    directory: Arc<dyn IUserDirectory>,
}

impl BindingResolver {
    pub fn new(directory: Arc<dyn IUserDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<dyn IUserDirectory> {
        &self.directory
    }

    /// The client-role account bound to `license`, if any.
    pub fn find_user_by_license(&self, license: &str) -> Result<Option<UserAccount>, StorageError> {
        if license.is_empty() {
            return Ok(None);
        }
        let Some(id) = self.directory.user_for_license(license)? else {
            return Ok(None);
        };
        let user = self.directory.get(id)?;
        Ok(user.filter(UserAccount::is_client))
    }

    /// Find or create the client account for a license.
    pub fn ensure_user(&self, request: &EnsureUserRequest) -> Result<EnsureUserOutcome, BindingError> {
        let email = sanitize_email(&request.email);
        if email.is_empty() || !is_email(&email) {
            return Err(BindingError::InvalidEmail);
        }
        let site = sanitize_text_field(&request.site);
        let license = request.license_key.as_str();

        if let Some(existing) = self.directory.find_by_email(&email)? {
            return self.update_existing(existing.id, &email, &request.client_name, license, &site);
        }

        let base = username_base(&request.client_name, &email);
        let login = unique_username(self.directory.as_ref(), &base)?;
        let password = match request.password.as_deref() {
            Some(p) if !p.trim().is_empty() => p.to_string(),
            _ => generate_password(),
        };

        let id = self
            .directory
            .create(&NewUser {
                login: login.clone(),
                email: email.clone(),
                password,
                display_name: request.client_name.clone(),
                first_name: request.client_name.clone(),
            })
            .map_err(|e| BindingError::CreateFailed {
                email: email.clone(),
                reason: e.to_string(),
            })?;

        if let Err(err) = self.provision(id, license, &site) {
            warn!(user_id = %id, error = %err, "provisioning failed; removing new account");
            if let Err(cleanup) = self.directory.delete(id) {
                warn!(user_id = %id, error = %cleanup, "failed to remove half-provisioned account");
            }
            return Err(err.into());
        }

        info!(user_id = %id, login = %login, license = %redact(license), "client account created");
        Ok(EnsureUserOutcome {
            user: self.load(id, &email)?,
            created: true,
        })
    }

    fn update_existing(
        &self,
        id: UserId,
        email: &str,
        client_name: &str,
        license: &str,
        site: &str,
    ) -> Result<EnsureUserOutcome, BindingError> {
        let user = self.load(id, email)?;
        // Binding is the step that can conflict; nothing is written before it.
        self.directory.bind_license(id, license)?;
        self.directory.add_role(id, CLIENT_ROLE)?;
        if !site.is_empty() {
            self.directory.set_meta(id, META_CLIENT_SITE, site)?;
        }
        if !client_name.is_empty() && user.display_name != client_name {
            self.directory.update_profile(id, client_name, &user.first_name)?;
        }
        self.directory.set_activation_key(id, license)?;
        info!(user_id = %id, license = %redact(license), "existing account bound to license");
        Ok(EnsureUserOutcome {
            user: self.load(id, email)?,
            created: false,
        })
    }

    fn provision(&self, id: UserId, license: &str, site: &str) -> Result<(), StorageError> {
        self.directory.set_role(id, CLIENT_ROLE)?;
        self.directory.bind_license(id, license)?;
        if !site.is_empty() {
            self.directory.set_meta(id, META_CLIENT_SITE, site)?;
        }
        self.directory.set_activation_key(id, license)
    }

    fn load(&self, id: UserId, email: &str) -> Result<UserAccount, BindingError> {
        self.directory
            .get(id)?
            .ok_or_else(|| BindingError::ExistingUserMissing {
                email: email.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{META_LEGACY_LICENSE_KEY, META_LICENSE_KEY};
    use crate::traits::storage::test_helpers::InMemoryUserDirectory;

    fn request(email: &str, license: &str) -> EnsureUserRequest {
        EnsureUserRequest {
            client_name: "Client".into(),
            email: email.into(),
            license_key: license.into(),
            site: "https://example.com".into(),
            password: None,
        }
    }

    fn resolver() -> (Arc<InMemoryUserDirectory>, BindingResolver) {
        let dir = Arc::new(InMemoryUserDirectory::new());
        (dir.clone(), BindingResolver::new(dir))
    }

    #[test]
    fn creates_client_account() {
        let (dir, resolver) = resolver();
        let outcome = resolver
            .ensure_user(&request("client@example.com", "VL-AWJJ-8J6S-GD6R"))
            .unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.user.login, "client");
        assert!(outcome.user.is_client());
        assert_eq!(outcome.user.meta(META_LICENSE_KEY), Some("VL-AWJJ-8J6S-GD6R"));
        assert_eq!(outcome.user.meta(META_LEGACY_LICENSE_KEY), Some("VL-AWJJ-8J6S-GD6R"));
        assert_eq!(outcome.user.meta(META_CLIENT_SITE), Some("https://example.com"));
        assert_eq!(outcome.user.activation_key.as_deref(), Some("VL-AWJJ-8J6S-GD6R"));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn invalid_email_mutates_nothing() {
        let (dir, resolver) = resolver();
        for email in ["", "nope", "a@b"] {
            let err = resolver.ensure_user(&request(email, "VL-AWJJ-8J6S-GD6R")).unwrap_err();
            assert!(matches!(err, BindingError::InvalidEmail));
        }
        assert!(dir.is_empty());
    }

    #[test]
    fn second_call_is_idempotent() {
        let (dir, resolver) = resolver();
        let req = request("client@example.com", "VL-AWJJ-8J6S-GD6R");
        assert!(resolver.ensure_user(&req).unwrap().created);
        let second = resolver.ensure_user(&req).unwrap();
        assert!(!second.created);
        assert_eq!(dir.len(), 1);
        assert_eq!(
            resolver.find_user_by_license("VL-AWJJ-8J6S-GD6R").unwrap().map(|u| u.id),
            Some(second.user.id)
        );
    }

    #[test]
    fn existing_account_gains_role_and_license() {
        let (dir, resolver) = resolver();
        let id = dir
            .create(&NewUser {
                login: "someone".into(),
                email: "client@example.com".into(),
                password: "pw".into(),
                display_name: "Someone".into(),
                first_name: "Some".into(),
            })
            .unwrap();
        dir.add_role(id, "subscriber").unwrap();
        let outcome = resolver.ensure_user(&request("CLIENT@example.com", "VL-H2K3-ZFQK-DKDC")).unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.user.id, id);
        assert!(outcome.user.has_role("subscriber"));
        assert!(outcome.user.is_client());
        assert_eq!(outcome.user.display_name, "Client");
        assert_eq!(outcome.user.first_name, "Some");
    }

    #[test]
    fn license_held_elsewhere_is_already_bound() {
        let (dir, resolver) = resolver();
        resolver.ensure_user(&request("a@example.com", "VL-AWJJ-8J6S-GD6R")).unwrap();
        let err = resolver
            .ensure_user(&request("b@example.com", "VL-AWJJ-8J6S-GD6R"))
            .unwrap_err();
        assert!(matches!(err, BindingError::AlreadyBound { .. }));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn conflicting_license_leaves_existing_account_untouched() {
        let (dir, resolver) = resolver();
        let holder = resolver.ensure_user(&request("a@example.com", "VL-AWJJ-8J6S-GD6R")).unwrap();
        let bob = dir
            .create(&NewUser {
                login: "bob".into(),
                email: "bob@example.com".into(),
                password: "pw".into(),
                display_name: "Bob".into(),
                first_name: "Bob".into(),
            })
            .unwrap();
        dir.add_role(bob, "subscriber").unwrap();
        let before = dir.get(bob).unwrap().unwrap();

        let err = resolver
            .ensure_user(&request("bob@example.com", "VL-AWJJ-8J6S-GD6R"))
            .unwrap_err();
        assert!(matches!(err, BindingError::AlreadyBound { .. }));

        let after = dir.get(bob).unwrap().unwrap();
        assert_eq!(after, before);
        assert!(!after.is_client());
        assert_eq!(
            resolver.find_user_by_license("VL-AWJJ-8J6S-GD6R").unwrap().map(|u| u.id),
            Some(holder.user.id)
        );
    }

    #[test]
    fn non_client_holder_is_not_found() {
        let (dir, resolver) = resolver();
        let outcome = resolver.ensure_user(&request("a@example.com", "VL-AWJJ-8J6S-GD6R")).unwrap();
        dir.set_role(outcome.user.id, "subscriber").unwrap();
        assert!(resolver.find_user_by_license("VL-AWJJ-8J6S-GD6R").unwrap().is_none());
    }
}
