//! Admin operations: the boundary the license management screens call.

use std::sync::Arc;

use tracing::{info, warn};

use crate::binding::{BindingResolver, EnsureUserOutcome, EnsureUserRequest};
use crate::errors::AdminError;
use crate::licensing::key_codec::redact;
use crate::licensing::sanitize::{is_email, sanitize_email, sanitize_text_field};
use crate::licensing::LicenseRegistry;
use crate::types::{LicenseRecord, LicenseStatus, UserAccount};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateLicenseRequest {
    pub client_name: String,
    pub site: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedLicense {
    pub license: LicenseRecord,
    pub user: UserAccount,
    /// A new account was provisioned rather than an existing one linked.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedLicense {
    pub license: LicenseRecord,
    /// The bound client account that was removed with it.
    pub removed_user: Option<UserAccount>,
}

pub struct AdminService {
    registry: Arc<LicenseRegistry>,
    binding: Arc<BindingResolver>,
}

impl AdminService {
    pub fn new(registry: Arc<LicenseRegistry>, binding: Arc<BindingResolver>) -> Self {
        Self { registry, binding }
    }

    /// Issue a license and provision its account. When provisioning fails
    /// the license is removed again.
    pub fn create_license(&self, request: &CreateLicenseRequest) -> Result<CreatedLicense, AdminError> {
        let client_name = sanitize_text_field(&request.client_name);
        let site = sanitize_text_field(&request.site);
        let email = sanitize_email(&request.email);
        let password = request.password.trim();

        for (field, value) in [
            ("client_name", client_name.as_str()),
            ("site", site.as_str()),
            ("email", email.as_str()),
            ("password", password),
        ] {
            if value.is_empty() {
                return Err(if field == "email" && !request.email.trim().is_empty() {
                    AdminError::InvalidEmail
                } else {
                    AdminError::MissingField { field }
                });
            }
        }
        if !is_email(&email) {
            return Err(AdminError::InvalidEmail);
        }

        let license = self.registry.create(&client_name, &site, &email)?;
        let ensured = self.binding.ensure_user(&EnsureUserRequest {
            client_name: client_name.clone(),
            email,
            license_key: license.key.clone(),
            site,
            password: Some(password.to_string()),
        });

        match ensured {
            Ok(EnsureUserOutcome { user, created }) => {
                info!(license = %redact(&license.key), login = %user.login, created, "license issued");
                Ok(CreatedLicense {
                    license,
                    user,
                    created,
                })
            }
            Err(err) => {
                warn!(license = %redact(&license.key), error = %err, "provisioning failed; rolling back license");
                self.registry.remove(&license.key)?;
                Err(err.into())
            }
        }
    }

    /// Re-run provisioning from the stored license record.
    pub fn sync_client_user(&self, key: &str) -> Result<EnsureUserOutcome, AdminError> {
        let key = sanitize_text_field(key);
        if key.is_empty() {
            return Err(AdminError::MissingField { field: "license_key" });
        }
        let record = self
            .registry
            .lookup(&key)?
            .ok_or(AdminError::LicenseNotFound)?;
        if record.contact_email.is_empty() {
            let client = if record.client_name.is_empty() {
                "client".to_string()
            } else {
                record.client_name.clone()
            };
            return Err(AdminError::MissingContactEmail { client });
        }
        let outcome = self.binding.ensure_user(&EnsureUserRequest {
            client_name: record.client_name,
            email: record.contact_email,
            license_key: key.clone(),
            site: record.site,
            password: None,
        })?;
        info!(license = %redact(&key), login = %outcome.user.login, created = outcome.created, "client synced");
        Ok(outcome)
    }

    /// Delete a license and the client account bound to it.
    pub fn delete_license(&self, key: &str) -> Result<DeletedLicense, AdminError> {
        let key = sanitize_text_field(key);
        if key.is_empty() {
            return Err(AdminError::MissingField { field: "license_key" });
        }
        let linked = self.binding.find_user_by_license(&key)?;
        let license = self
            .registry
            .remove(&key)?
            .ok_or(AdminError::LicenseNotFound)?;

        let removed_user = match linked {
            Some(user) => {
                if self.binding.directory().delete(user.id)? {
                    info!(user_id = %user.id, login = %user.login, "deleted account linked to license");
                    Some(user)
                } else {
                    warn!(user_id = %user.id, "linked account vanished before deletion");
                    None
                }
            }
            None => None,
        };
        Ok(DeletedLicense {
            license,
            removed_user,
        })
    }

    pub fn set_license_status(&self, key: &str, status: LicenseStatus) -> Result<LicenseRecord, AdminError> {
        self.registry
            .set_status(key, status)?
            .ok_or(AdminError::LicenseNotFound)
    }
}
