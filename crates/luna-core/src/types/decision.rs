//! Reconciliation decisions.

use serde::{Deserialize, Serialize};

use crate::constants::PARAM_LICENSE;
use crate::types::request::RequestContext;
use crate::types::user::UserId;

/// Where the request goes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "url", rename_all = "snake_case")]
pub enum DecisionAction {
    /// Viewer is (or has just been) signed in; send them to `url`.
    AuthenticateAndRedirect(String),
    /// Send the viewer to `url` without a session.
    RedirectUnauthenticated(String),
    PassThrough,
    /// Missing or unusable license on a console request.
    RejectToFallback(String),
}

/// A session the host must establish. Applied at most once, by a route guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
    pub user_id: UserId,
    pub login: String,
    /// Issue the long-lived auth cookie.
    pub remember: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: DecisionAction,
    pub session: Option<SessionGrant>,
    /// License to write into the request's `license` slot for the rest of
    /// the lifecycle.
    pub normalized_license: Option<String>,
}

impl Decision {
    fn of(action: DecisionAction) -> Self {
        Self {
            action,
            session: None,
            normalized_license: None,
        }
    }

    pub fn pass_through() -> Self {
        Self::of(DecisionAction::PassThrough)
    }

    pub fn redirect_unauthenticated(url: impl Into<String>) -> Self {
        Self::of(DecisionAction::RedirectUnauthenticated(url.into()))
    }

    pub fn reject_to_fallback(url: impl Into<String>) -> Self {
        Self::of(DecisionAction::RejectToFallback(url.into()))
    }

    pub fn authenticate_and_redirect(url: impl Into<String>) -> Self {
        Self::of(DecisionAction::AuthenticateAndRedirect(url.into()))
    }

    pub fn with_session(mut self, grant: SessionGrant) -> Self {
        self.session = Some(grant);
        self
    }

    pub fn with_normalized_license(mut self, license: impl Into<String>) -> Self {
        self.normalized_license = Some(license.into());
        self
    }

    pub fn is_pass_through(&self) -> bool {
        self.action == DecisionAction::PassThrough
    }

    /// Redirect target, if the decision leaves the current page.
    pub fn redirect_url(&self) -> Option<&str> {
        match &self.action {
            DecisionAction::AuthenticateAndRedirect(url)
            | DecisionAction::RedirectUnauthenticated(url)
            | DecisionAction::RejectToFallback(url) => Some(url),
            DecisionAction::PassThrough => None,
        }
    }

    /// Write the normalized license back into the request.
    pub fn apply_to(&self, ctx: &mut RequestContext) {
        if let Some(license) = &self.normalized_license {
            ctx.set_param(PARAM_LICENSE, license.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_to_writes_license_slot() {
        let mut ctx = RequestContext::from_uri("/ai-constellation-dashboard/?lic=VL-AWJJ-8J6S-GD6R");
        Decision::pass_through()
            .with_normalized_license("VL-AWJJ-8J6S-GD6R")
            .apply_to(&mut ctx);
        assert_eq!(ctx.param("license"), Some("VL-AWJJ-8J6S-GD6R"));
    }

    #[test]
    fn pass_through_has_no_target() {
        assert_eq!(Decision::pass_through().redirect_url(), None);
        assert_eq!(
            Decision::reject_to_fallback("https://x.test/").redirect_url(),
            Some("https://x.test/")
        );
    }
}
