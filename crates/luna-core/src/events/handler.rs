use crate::types::{SessionGrant, UserId};

/// Listener for session lifecycle signals. Every method defaults to a no-op.
pub trait SessionEventHandler: Send + Sync {
    /// A session was established (silent sign-on included).
    fn on_login(&self, _grant: &SessionGrant) {}

    /// A session was torn down.
    fn on_logout(&self, _user: Option<UserId>) {}
}
