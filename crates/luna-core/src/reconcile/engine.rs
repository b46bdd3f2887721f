use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::binding::BindingResolver;
use crate::config::RoutingConfig;
use crate::errors::{LunaResult, StorageError};
use crate::extraction::LicenseExtractor;
use crate::licensing::key_codec::{dashboard_url, is_legacy, redact};
use crate::licensing::LicenseRegistry;
use crate::types::{LicenseRecord, SessionGrant, UserAccount, UserId};

pub struct ReconciliationEngine {
    pub(super) registry: Arc<LicenseRegistry>,
    pub(super) binding: Arc<BindingResolver>,
    pub(super) extractor: Arc<LicenseExtractor>,
    pub(super) routing: RoutingConfig,
}

impl ReconciliationEngine {
    pub fn new(
        registry: Arc<LicenseRegistry>,
        binding: Arc<BindingResolver>,
        extractor: Arc<LicenseExtractor>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            registry,
            binding,
            extractor,
            routing,
        }
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn extractor(&self) -> &LicenseExtractor {
        &self.extractor
    }

    pub fn registry(&self) -> &LicenseRegistry {
        &self.registry
    }

    pub fn binding(&self) -> &BindingResolver {
        &self.binding
    }

    /// Rule 1. Clears both license fields when the stored key is legacy.
    /// Returns the stored key that survives, if any.
    pub fn scrub_legacy(&self, user: &UserAccount) -> LunaResult<Option<String>> {
        match user.stored_license() {
            Some(key) if is_legacy(key) => {
                self.binding.directory().unbind_license(user.id)?;
                info!(user_id = %user.id, login = %user.login, "removed legacy license key");
                Ok(None)
            }
            Some(key) => Ok(Some(key.to_string())),
            None => Ok(None),
        }
    }

    /// Active registry record for `license`. Unknown and inactive keys are
    /// logged and reported as absent.
    pub fn active_record(&self, license: &str) -> LunaResult<Option<LicenseRecord>> {
        if license.is_empty() || is_legacy(license) {
            return Ok(None);
        }
        match self.registry.lookup(license)? {
            Some(record) if record.is_active() => Ok(Some(record)),
            Some(_) => {
                warn!(license = %redact(license), "license present but inactive");
                Ok(None)
            }
            None => {
                warn!(license = %redact(license), "license not found in registry");
                Ok(None)
            }
        }
    }

    /// The silent bind shared by rules 2 and 3: an active license bound to a
    /// client-role account yields a long-lived session grant.
    pub fn silent_bind(&self, license: &str) -> LunaResult<Option<SessionGrant>> {
        if self.active_record(license)?.is_none() {
            return Ok(None);
        }
        match self.binding.find_user_by_license(license)? {
            Some(user) => {
                debug!(user_id = %user.id, license = %redact(license), "silent bind");
                Ok(Some(SessionGrant {
                    user_id: user.id,
                    login: user.login,
                    remember: true,
                }))
            }
            None => {
                warn!(license = %redact(license), "no client account bound to license");
                Ok(None)
            }
        }
    }

    pub(super) fn load_user(&self, id: UserId) -> LunaResult<Option<UserAccount>> {
        Ok(self.binding.directory().get(id)?)
    }

    /// Persist `license` on the account. A key held by another account is a
    /// soft failure: logged, not stored, reported as `false`.
    pub(super) fn persist_license(&self, user: &UserAccount, license: &str) -> LunaResult<bool> {
        match self.binding.directory().bind_license(user.id, license) {
            Ok(()) => {
                info!(user_id = %user.id, license = %redact(license), "stored license on account");
                Ok(true)
            }
            Err(StorageError::Conflict { holder, .. }) => {
                warn!(
                    user_id = %user.id,
                    holder,
                    license = %redact(license),
                    "license already bound to another account; not stored"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Dashboard for an active license, else the marketing fallback.
    pub(super) fn landing_url(&self, license: Option<&str>) -> LunaResult<String> {
        if let Some(key) = license {
            if let Some(record) = self.active_record(key)? {
                return Ok(dashboard_url(&self.routing.dashboard_base_url, &record.key));
            }
        }
        Ok(self.routing.marketing_fallback_url.clone())
    }
}
