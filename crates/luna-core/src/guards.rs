//! Route guards — lifecycle hook adapters around the reconciliation engine.
//!
//! Guards are the only place decisions take effect: they establish sessions
//! through a [`SessionSink`], fire session events, normalize the request and
//! translate the action into a [`GuardOutcome`]. Engine errors never escape a
//! guard; each hook has a fixed fallback.

use std::sync::Arc;

use tracing::warn;

use crate::events::EventDispatcher;
use crate::reconcile::ReconciliationEngine;
use crate::traits::SessionSink;
use crate::types::{Decision, RequestContext, UserId};

/// What the host should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Continue,
    Redirect(String),
}

impl GuardOutcome {
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            Self::Redirect(url) => Some(url),
            Self::Continue => None,
        }
    }
}

pub struct RouteGuards {
    engine: Arc<ReconciliationEngine>,
    dispatcher: Arc<EventDispatcher>,
}

impl RouteGuards {
    pub fn new(engine: Arc<ReconciliationEngine>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self { engine, dispatcher }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    /// Rule 2, before any other access guard runs.
    pub fn on_early_init(&self, ctx: &mut RequestContext, sink: &dyn SessionSink) -> GuardOutcome {
        match self.engine.bootstrap(ctx) {
            Ok(decision) => self.apply(decision, ctx, sink),
            Err(e) => {
                warn!(error = %e, path = %ctx.path, "console bootstrap failed; continuing");
                GuardOutcome::Continue
            }
        }
    }

    /// Rule 3 on console pages, rule 5 on the dedicated login page.
    pub fn on_template_render(&self, ctx: &mut RequestContext, sink: &dyn SessionSink) -> GuardOutcome {
        let result = if self.engine.extractor().is_console_page(ctx) {
            self.engine.protect(ctx)
        } else if self.is_login_page(ctx) {
            self.engine.login_screen_bounce(ctx)
        } else {
            return GuardOutcome::Continue;
        };
        match result {
            Ok(decision) => self.apply(decision, ctx, sink),
            Err(e) => {
                warn!(error = %e, path = %ctx.path, "console guard failed; sending to fallback");
                GuardOutcome::Redirect(self.engine.routing().marketing_fallback_url.clone())
            }
        }
    }

    /// Rule 4. Returns the final post-login redirect target.
    pub fn on_login_redirect_filter(
        &self,
        proposed: &str,
        requested: &str,
        user: Option<UserId>,
        ctx: &RequestContext,
    ) -> String {
        let Some(user) = user else {
            return proposed.to_string();
        };
        self.engine
            .login_redirect(proposed, requested, user, ctx)
            .unwrap_or_else(|e| {
                warn!(error = %e, user_id = %user, "login redirect failed; sending to fallback");
                self.engine.routing().marketing_fallback_url.clone()
            })
    }

    /// Rule 6, after the host has torn the session down.
    pub fn on_logout(&self, user: Option<UserId>) -> GuardOutcome {
        self.dispatcher.emit_logout(user);
        outcome(&self.engine.logout())
    }

    /// Rule 5 on the core login endpoint.
    pub fn on_login_init(&self, ctx: &RequestContext) -> GuardOutcome {
        match self.engine.login_screen_bounce(ctx) {
            Ok(decision) => outcome(&decision),
            Err(e) => {
                warn!(error = %e, "login screen bounce failed; showing login");
                GuardOutcome::Continue
            }
        }
    }

    fn is_login_page(&self, ctx: &RequestContext) -> bool {
        let routing = self.engine.routing();
        ctx.page_slug.as_deref() == Some(routing.login_page_slug.as_str())
            || ctx.path.trim_matches('/') == routing.login_page_slug
    }

    /// Establish the session at most once, then normalize and route.
    fn apply(&self, decision: Decision, ctx: &mut RequestContext, sink: &dyn SessionSink) -> GuardOutcome {
        if let Some(grant) = &decision.session {
            if let Err(e) = sink.establish(grant) {
                warn!(error = %e, user_id = %grant.user_id, "session establishment failed");
                return GuardOutcome::Redirect(self.engine.routing().login_page_url.clone());
            }
            ctx.current_user = Some(grant.user_id);
            ctx.has_auth_cookie = true;
            self.dispatcher.emit_login(grant);
        }
        decision.apply_to(ctx);
        outcome(&decision)
    }
}

fn outcome(decision: &Decision) -> GuardOutcome {
    match decision.redirect_url() {
        Some(url) => GuardOutcome::Redirect(url.to_string()),
        None => GuardOutcome::Continue,
    }
}
