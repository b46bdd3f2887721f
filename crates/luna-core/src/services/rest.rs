//! REST operations: activation, heartbeat, session info and the client roster.
//!
//! Unknown keys and malformed keys are indistinguishable to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RoutingConfig;
use crate::constants::{ADMIN_ROLE, CLIENT_ROLE};
use crate::errors::RestError;
use crate::licensing::key_codec::{dashboard_url, redact};
use crate::licensing::sanitize::{esc_url_raw, sanitize_text_field};
use crate::licensing::LicenseRegistry;
use crate::traits::IUserDirectory;
use crate::types::{format_timestamp, ActivationDetails, LicenseRecord, UserId};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivateRequest {
    pub license: String,
    pub site_url: String,
    pub site_name: String,
    pub wp_version: String,
    pub plugin_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateResponse {
    pub ok: bool,
    pub license: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeartbeatRequest {
    pub license: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatResponse {
    pub ok: bool,
}

/// License fields safe to show the license's own holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseSummary {
    pub key: String,
    pub client_name: String,
    pub status: String,
    pub dashboard_url: String,
    pub last_seen: Option<String>,
    pub contact_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub display_name: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPermissions {
    pub can_manage_clients: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedSession {
    pub authenticated: bool,
    pub user: SessionUser,
    pub permissions: SessionPermissions,
    pub dashboard_url: String,
    pub license: Option<LicenseSummary>,
    pub is_vl_client: bool,
    pub license_key: String,
    pub wp_activation_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SessionInfo {
    Anonymous { authenticated: bool, login_url: String },
    Authenticated(Box<AuthenticatedSession>),
}

impl SessionInfo {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientEntry {
    pub license_key: String,
    pub client_name: String,
    pub status: String,
    pub dashboard_url: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientsResponse {
    pub clients: Vec<ClientEntry>,
}

pub struct RestService {
    registry: Arc<LicenseRegistry>,
    directory: Arc<dyn IUserDirectory>,
    routing: RoutingConfig,
}

impl RestService {
    pub fn new(
        registry: Arc<LicenseRegistry>,
        directory: Arc<dyn IUserDirectory>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            registry,
            directory,
            routing,
        }
    }

    /// Client site activation: marks the license active and records the site.
    pub fn activate(&self, request: &ActivateRequest) -> Result<ActivateResponse, RestError> {
        let license = request.license.trim();
        let site = esc_url_raw(&request.site_url);
        if license.is_empty() || site.is_empty() {
            return Err(RestError::MissingParams);
        }
        let details = ActivationDetails {
            site,
            site_name: Some(sanitize_text_field(&request.site_name)),
            wp_version: Some(sanitize_text_field(&request.wp_version)),
            plugin_version: Some(sanitize_text_field(&request.plugin_version)),
        };
        match self.registry.record_activation(license, &details)? {
            Some(record) => {
                info!(license = %redact(&record.key), site = %record.site, "license activated");
                Ok(ActivateResponse {
                    ok: true,
                    license: record.key,
                })
            }
            None => {
                warn!(license = %redact(license), "activation for unknown license");
                Err(RestError::LicenseNotFound)
            }
        }
    }

    /// Client site heartbeat: stamps last-seen and forces the license active.
    pub fn heartbeat(&self, request: &HeartbeatRequest) -> Result<HeartbeatResponse, RestError> {
        let license = request.license.trim();
        if license.is_empty() {
            return Err(RestError::MissingLicense);
        }
        match self.registry.record_heartbeat(license)? {
            Some(_) => Ok(HeartbeatResponse { ok: true }),
            None => {
                warn!(license = %redact(license), "heartbeat for unknown license");
                Err(RestError::LicenseNotFound)
            }
        }
    }

    /// Who the viewer is and where their dashboard lives.
    pub fn session_info(&self, viewer: Option<UserId>) -> Result<SessionInfo, RestError> {
        let user = match viewer {
            Some(id) => self.directory.get(id)?,
            None => None,
        };
        let Some(user) = user else {
            return Ok(SessionInfo::Anonymous {
                authenticated: false,
                login_url: self.routing.login_url(&self.routing.marketing_fallback_url),
            });
        };

        let license_key = user.stored_license().unwrap_or_default().to_string();
        let license = if license_key.is_empty() {
            None
        } else {
            self.registry.lookup(&license_key)?
        };
        let summary = license.as_ref().map(|record| self.summarize(record));

        Ok(SessionInfo::Authenticated(Box::new(AuthenticatedSession {
            authenticated: true,
            dashboard_url: summary
                .as_ref()
                .map(|s| s.dashboard_url.clone())
                .unwrap_or_else(|| self.routing.marketing_fallback_url.clone()),
            license: summary,
            is_vl_client: user.has_role(CLIENT_ROLE),
            permissions: SessionPermissions {
                can_manage_clients: user.has_role(ADMIN_ROLE),
            },
            license_key,
            wp_activation_key: user.activation_key.clone().unwrap_or_default(),
            user: SessionUser {
                id: user.id,
                display_name: user.display_name.clone(),
                roles: user.roles.iter().cloned().collect(),
            },
        })))
    }

    /// Roster of every license. Requires the administrator role.
    pub fn clients(&self, viewer: Option<UserId>) -> Result<ClientsResponse, RestError> {
        let allowed = match viewer {
            Some(id) => self
                .directory
                .get(id)?
                .is_some_and(|u| u.has_role(ADMIN_ROLE)),
            None => false,
        };
        if !allowed {
            return Err(RestError::Forbidden);
        }
        let clients = self
            .registry
            .all()?
            .into_values()
            .map(|record| ClientEntry {
                dashboard_url: dashboard_url(&self.routing.dashboard_base_url, &record.key),
                license_key: record.key,
                client_name: record.client_name,
                status: record.status.to_string(),
                contact_email: record.contact_email,
            })
            .collect();
        Ok(ClientsResponse { clients })
    }

    fn summarize(&self, record: &LicenseRecord) -> LicenseSummary {
        LicenseSummary {
            key: record.key.clone(),
            client_name: record.client_name.clone(),
            status: record.status.to_string(),
            dashboard_url: dashboard_url(&self.routing.dashboard_base_url, &record.key),
            last_seen: record.last_seen_at.as_ref().map(format_timestamp),
            contact_email: record.contact_email.clone(),
        }
    }
}
