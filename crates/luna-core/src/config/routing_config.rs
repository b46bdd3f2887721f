//! Console paths and redirect targets.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Where console traffic lives and where rejected traffic goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Console base path families. The first entry is the primary console path.
    pub console_base_paths: Vec<String>,
    /// Page slugs the host resolves to a console page.
    pub console_page_slugs: Vec<String>,
    /// Third path family that may carry a `license=<token>` segment.
    pub supercluster_path: String,
    /// Base of the per-license dashboard URL.
    pub dashboard_base_url: String,
    /// Public marketing page for anonymous or rejected traffic.
    pub marketing_fallback_url: String,
    /// Dedicated login page for license holders whose silent sign-on failed.
    pub login_page_url: String,
    /// Page slug of the dedicated login page.
    pub login_page_slug: String,
    /// The host's credential login endpoint.
    pub login_endpoint: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            console_base_paths: vec![
                "/ai-constellation-dashboard/".to_string(),
                "/ai-constellation-console/".to_string(),
            ],
            console_page_slugs: vec![
                "ai-constellation-dashboard".to_string(),
                "ai-constellation-console".to_string(),
            ],
            supercluster_path: "/supercluster-constellation/".to_string(),
            dashboard_base_url: "https://supercluster.visiblelight.ai/".to_string(),
            marketing_fallback_url: "https://supercluster.visiblelight.ai/".to_string(),
            login_page_url: "/supercluster-login/".to_string(),
            login_page_slug: "supercluster-login".to_string(),
            login_endpoint: "/wp-login.php".to_string(),
        }
    }
}

impl RoutingConfig {
    /// The primary console path, used when a redirect needs a console target.
    pub fn console_primary_path(&self) -> &str {
        self.console_base_paths
            .first()
            .map(String::as_str)
            .unwrap_or("/ai-constellation-dashboard/")
    }

    /// Login endpoint that returns to `redirect_to` afterwards.
    pub fn login_url(&self, redirect_to: &str) -> String {
        if redirect_to.is_empty() {
            return self.login_endpoint.clone();
        }
        let encoded: String = url::form_urlencoded::byte_serialize(redirect_to.as_bytes()).collect();
        let sep = if self.login_endpoint.contains('?') { '&' } else { '?' };
        format!("{}{sep}redirect_to={encoded}", self.login_endpoint)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self
            .console_base_paths
            .iter()
            .all(|p| p.trim_matches('/').is_empty())
        {
            return Err(invalid("routing.console_base_paths", "at least one non-root path is required"));
        }
        for (field, value) in [
            ("routing.dashboard_base_url", &self.dashboard_base_url),
            ("routing.marketing_fallback_url", &self.marketing_fallback_url),
        ] {
            if !is_http_url(value) {
                return Err(invalid(field, "must be an absolute http(s) URL"));
            }
        }
        if self.login_page_url.trim().is_empty() {
            return Err(invalid("routing.login_page_url", "must not be empty"));
        }
        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
