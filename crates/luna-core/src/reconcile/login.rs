//! Rules 4 to 6: post-login redirect, login-screen bounce, logout.

use tracing::{debug, info};

use super::engine::ReconciliationEngine;
use crate::constants::{CLIENT_ROLE, LOGIN_EXEMPT_ACTIONS, PARAM_ACTION};
use crate::errors::LunaResult;
use crate::licensing::key_codec::is_legacy;
use crate::types::{Decision, RequestContext, UserAccount, UserId};

impl ReconciliationEngine {
    /// Rule 4. Final redirect after a credential login.
    pub fn login_redirect(
        &self,
        proposed: &str,
        requested: &str,
        user_id: UserId,
        ctx: &RequestContext,
    ) -> LunaResult<String> {
        let honour_request = || {
            if requested.is_empty() {
                proposed.to_string()
            } else {
                requested.to_string()
            }
        };

        let Some(mut user) = self.load_user(user_id)? else {
            return Ok(honour_request());
        };

        if !user.is_client() && user.stored_license().is_some() {
            self.binding.directory().add_role(user.id, CLIENT_ROLE)?;
            user.roles.insert(CLIENT_ROLE.to_string());
            info!(user_id = %user.id, "granted client role from stored license");
        }
        if !user.is_client() {
            debug!(user_id = %user.id, "not a client; honouring requested redirect");
            return Ok(honour_request());
        }

        let mut license = self.scrub_legacy(&user)?;

        if license.is_none() && !requested.is_empty() {
            license = self.adopt(&user, self.extractor.extract_from_url(requested))?;
        }
        if license.is_none() {
            license = self.adopt(&user, self.extractor.extract(ctx).license)?;
        }

        let landing = self.landing_url(license.as_deref())?;

        if !requested.is_empty() && self.extractor.targets_console(requested) {
            debug!(user_id = %user.id, "honouring requested console redirect");
            return Ok(requested.to_string());
        }
        Ok(landing)
    }

    /// Rule 5. A signed-in client hitting a login screen goes to their
    /// dashboard instead. Logout, password reset and registration actions are
    /// left alone.
    pub fn login_screen_bounce(&self, ctx: &RequestContext) -> LunaResult<Decision> {
        let action = ctx.param(PARAM_ACTION).unwrap_or("login").to_ascii_lowercase();
        if LOGIN_EXEMPT_ACTIONS.contains(&action.as_str()) {
            return Ok(Decision::pass_through());
        }
        let Some(id) = ctx.current_user else {
            return Ok(Decision::pass_through());
        };
        let Some(user) = self.load_user(id)? else {
            return Ok(Decision::pass_through());
        };
        if !user.is_client() {
            return Ok(Decision::pass_through());
        }
        let license = self.scrub_legacy(&user)?;
        Ok(Decision::authenticate_and_redirect(
            self.landing_url(license.as_deref())?,
        ))
    }

    /// Rule 6.
    pub fn logout(&self) -> Decision {
        Decision::redirect_unauthenticated(self.routing.marketing_fallback_url.clone())
    }

    /// Store a discovered license on the account. Blank, legacy and
    /// conflicting keys are not adopted.
    fn adopt(&self, user: &UserAccount, candidate: String) -> LunaResult<Option<String>> {
        if candidate.is_empty() || is_legacy(&candidate) {
            return Ok(None);
        }
        if self.persist_license(user, &candidate)? {
            Ok(Some(candidate))
        } else {
            Ok(None)
        }
    }
}
