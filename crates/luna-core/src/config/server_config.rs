//! HTTP binding configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on. Default: 127.0.0.1:8080.
    /// `LUNA_HTTP_BIND` overrides it at startup.
    pub bind: Option<String>,
    /// Session cookie name. Default: "luna_session".
    pub session_cookie: Option<String>,
    /// Origin allowed to call the REST routes cross-site.
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    pub fn effective_bind(&self) -> &str {
        self.bind.as_deref().unwrap_or("127.0.0.1:8080")
    }

    pub fn effective_session_cookie(&self) -> &str {
        self.session_cookie.as_deref().unwrap_or("luna_session")
    }

    pub fn effective_cors_origin(&self) -> &str {
        self.cors_origin
            .as_deref()
            .unwrap_or("https://supercluster.visiblelight.ai")
    }
}
