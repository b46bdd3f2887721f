//! Cookie sessions: random tokens mapped to accounts, held in memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use luna_core::errors::StorageError;
use luna_core::traits::{Clock, SessionSink, SystemClock};
use luna_core::{SessionGrant, UserId};

const TOKEN_BYTES: usize = 32;

/// Lifetime of a "remember me" cookie, in seconds.
pub const REMEMBER_MAX_AGE: u64 = 14 * 24 * 60 * 60;

/// Server-side lifetime of a browser-session cookie, in seconds.
pub const SESSION_MAX_AGE: u64 = 2 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub user_id: UserId,
    pub remember: bool,
}

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

pub struct CookieSessionStore {
    cookie_name: String,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl CookieSessionStore {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self::with_clock(cookie_name, Arc::new(SystemClock))
    }

    pub fn with_clock(cookie_name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Issue a fresh token. Expired entries are pruned on the way in.
    pub fn issue(&self, user_id: UserId, remember: bool) -> Result<IssuedSession, StorageError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let now = self.clock.now();
        let max_age = if remember { REMEMBER_MAX_AGE } else { SESSION_MAX_AGE };
        let entry = SessionEntry {
            user_id,
            expires_at: now + Duration::seconds(max_age as i64),
        };
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StorageError::Poisoned(format!("sessions: {e}")))?;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        if sessions.len() < before {
            debug!(pruned = before - sessions.len(), "expired sessions pruned");
        }
        sessions.insert(token.clone(), entry);
        debug!(user_id = %user_id, remember, "session issued");
        Ok(IssuedSession {
            token,
            user_id,
            remember,
        })
    }

    /// Account behind a live token. An expired token is dropped.
    pub fn user_for_token(&self, token: &str) -> Option<UserId> {
        let entry = self.sessions.read().ok()?.get(token).copied()?;
        if entry.expires_at > self.clock.now() {
            return Some(entry.user_id);
        }
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(token);
        }
        debug!(user_id = %entry.user_id, "expired session rejected");
        None
    }

    pub fn revoke(&self, token: &str) -> Option<UserId> {
        self.sessions
            .write()
            .ok()?
            .remove(token)
            .map(|entry| entry.user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Session token carried by the request's `Cookie` headers.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, token)| token.to_string())
    }

    pub fn user_from_headers(&self, headers: &HeaderMap) -> Option<UserId> {
        self.token_from_headers(headers)
            .and_then(|token| self.user_for_token(&token))
    }

    /// `Set-Cookie` value for a freshly issued session.
    pub fn set_cookie(&self, session: &IssuedSession) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax",
            self.cookie_name, session.token
        );
        if session.remember {
            cookie.push_str(&format!("; Max-Age={REMEMBER_MAX_AGE}"));
        }
        cookie
    }

    /// `Set-Cookie` value that expires the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0",
            self.cookie_name
        )
    }
}

/// Per-request [`SessionSink`]: issues a session for the first grant and
/// keeps it so the response can carry the cookie.
pub struct IssuingSink<'a> {
    store: &'a CookieSessionStore,
    issued: Mutex<Option<IssuedSession>>,
}

impl<'a> IssuingSink<'a> {
    pub fn new(store: &'a CookieSessionStore) -> Self {
        Self {
            store,
            issued: Mutex::new(None),
        }
    }

    pub fn into_issued(self) -> Option<IssuedSession> {
        self.issued.into_inner().ok().flatten()
    }
}

impl SessionSink for IssuingSink<'_> {
    fn establish(&self, grant: &SessionGrant) -> Result<(), StorageError> {
        let mut issued = self
            .issued
            .lock()
            .map_err(|e| StorageError::Poisoned(format!("issued session: {e}")))?;
        if issued.is_none() {
            *issued = Some(self.store.issue(grant.user_id, grant.remember)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;
    use luna_core::traits::storage::test_helpers::FixedClock;

    #[test]
    fn issued_token_resolves_until_revoked() {
        let store = CookieSessionStore::new("luna_session");
        let session = store.issue(UserId(7), true).unwrap();
        assert_eq!(session.token.len(), TOKEN_BYTES * 2);
        assert_eq!(store.user_for_token(&session.token), Some(UserId(7)));
        assert_eq!(store.revoke(&session.token), Some(UserId(7)));
        assert_eq!(store.user_for_token(&session.token), None);
    }

    #[test]
    fn cookie_header_is_parsed_among_others() {
        let store = CookieSessionStore::new("luna_session");
        let session = store.issue(UserId(3), false).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; luna_session={}; x=1", session.token)).unwrap(),
        );
        assert_eq!(store.user_from_headers(&headers), Some(UserId(3)));
    }

    #[test]
    fn remember_sets_max_age() {
        let store = CookieSessionStore::new("luna_session");
        let long = store.issue(UserId(1), true).unwrap();
        let short = store.issue(UserId(1), false).unwrap();
        assert!(store.set_cookie(&long).contains("Max-Age=1209600"));
        assert!(!store.set_cookie(&short).contains("Max-Age"));
    }

    #[test]
    fn sessions_expire_with_their_cookie() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()));
        let store = CookieSessionStore::with_clock("luna_session", clock.clone());
        let remembered = store.issue(UserId(1), true).unwrap();
        let browser = store.issue(UserId(2), false).unwrap();

        clock.advance(Duration::days(2) + Duration::seconds(1));
        assert_eq!(store.user_for_token(&browser.token), None);
        assert_eq!(store.user_for_token(&remembered.token), Some(UserId(1)));

        clock.advance(Duration::days(12));
        assert_eq!(store.user_for_token(&remembered.token), None);
        assert!(store.is_empty());
    }

    #[test]
    fn issuing_prunes_expired_entries() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()));
        let store = CookieSessionStore::with_clock("luna_session", clock.clone());
        for id in 0..5 {
            store.issue(UserId(id), false).unwrap();
        }
        clock.advance(Duration::days(3));
        store.issue(UserId(9), false).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sink_issues_once() {
        let store = CookieSessionStore::new("luna_session");
        let sink = IssuingSink::new(&store);
        let grant = SessionGrant {
            user_id: UserId(9),
            login: "client".into(),
            remember: true,
        };
        sink.establish(&grant).unwrap();
        sink.establish(&grant).unwrap();
        let issued = sink.into_issued().unwrap();
        assert_eq!(issued.user_id, UserId(9));
        assert_eq!(store.len(), 1);
    }
}
