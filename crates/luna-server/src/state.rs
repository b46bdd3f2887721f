//! Shared handler state.

use std::sync::Arc;

use axum::http::HeaderMap;

use luna_core::{LunaRuntime, UserId};
use luna_storage::SqliteUserDirectory;

use crate::session::CookieSessionStore;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<LunaRuntime>,
    /// Credential checks for the login endpoint.
    pub accounts: Arc<SqliteUserDirectory>,
    pub sessions: Arc<CookieSessionStore>,
    pub cors_origin: Arc<str>,
}

impl AppState {
    pub fn new(runtime: Arc<LunaRuntime>, accounts: Arc<SqliteUserDirectory>) -> Self {
        let server = &runtime.config.server;
        let sessions = Arc::new(CookieSessionStore::with_clock(
            server.effective_session_cookie(),
            runtime.clock.clone(),
        ));
        let cors_origin: Arc<str> = Arc::from(server.effective_cors_origin());
        Self {
            runtime,
            accounts,
            sessions,
            cors_origin,
        }
    }

    /// The signed-in account behind the request's session cookie, if any.
    pub fn viewer(&self, headers: &HeaderMap) -> Option<UserId> {
        self.sessions.user_from_headers(headers)
    }
}
