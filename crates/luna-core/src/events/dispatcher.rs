use std::sync::Arc;

use tracing::trace;

use super::handler::SessionEventHandler;
use crate::types::{SessionGrant, UserId};

/// Fans session events out to every registered handler, in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn SessionEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn SessionEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn emit_login(&self, grant: &SessionGrant) {
        trace!(user_id = %grant.user_id, handlers = self.handlers.len(), "emit login");
        for handler in &self.handlers {
            handler.on_login(grant);
        }
    }

    pub fn emit_logout(&self, user: Option<UserId>) {
        trace!(handlers = self.handlers.len(), "emit logout");
        for handler in &self.handlers {
            handler.on_logout(user);
        }
    }
}
