//! Rules 2 and 3: console bootstrap and console protection.

use tracing::debug;

use super::engine::ReconciliationEngine;
use crate::errors::LunaResult;
use crate::licensing::key_codec::{is_legacy, redact};
use crate::types::{Decision, LicenseExtraction, RequestContext, SessionGrant};

impl ReconciliationEngine {
    /// Rule 2. Runs before any site-wide login wall: an anonymous request
    /// aimed at the console with a usable license is signed in silently and
    /// allowed to continue.
    pub fn bootstrap(&self, ctx: &RequestContext) -> LunaResult<Decision> {
        if ctx.is_admin || ctx.is_authenticated() || !self.extractor.is_console_request(ctx) {
            return Ok(Decision::pass_through());
        }

        let extraction = self.extractor.extract(ctx);
        let unbound = || {
            if self.extractor.targets_console(&ctx.path) {
                Decision::redirect_unauthenticated(self.routing.marketing_fallback_url.clone())
            } else {
                Decision::pass_through()
            }
        };

        if extraction.is_empty() || is_legacy(&extraction.license) {
            return Ok(unbound());
        }

        match self.silent_bind(&extraction.license)? {
            Some(grant) => {
                debug!(license = %redact(&extraction.license), source = %extraction.source, "console bootstrap");
                Ok(granted(&extraction, grant))
            }
            None => Ok(unbound()),
        }
    }

    /// Rule 3. Console pages require a license in the request.
    pub fn protect(&self, ctx: &RequestContext) -> LunaResult<Decision> {
        if ctx.is_admin || !self.extractor.is_console_page(ctx) {
            return Ok(Decision::pass_through());
        }

        let extraction = self.extractor.extract(ctx);
        if extraction.is_empty() || is_legacy(&extraction.license) {
            return Ok(Decision::reject_to_fallback(
                self.routing.marketing_fallback_url.clone(),
            ));
        }

        if let Some(id) = ctx.current_user {
            if let Some(user) = self.load_user(id)? {
                self.scrub_legacy(&user)?;
            }
            return Ok(normalized(&extraction, Decision::pass_through()));
        }

        match self.silent_bind(&extraction.license)? {
            Some(grant) => Ok(granted(&extraction, grant)),
            None => Ok(Decision::redirect_unauthenticated(
                self.routing.login_page_url.clone(),
            )),
        }
    }
}

fn granted(extraction: &LicenseExtraction, grant: SessionGrant) -> Decision {
    normalized(extraction, Decision::pass_through().with_session(grant))
}

fn normalized(extraction: &LicenseExtraction, decision: Decision) -> Decision {
    if extraction.needs_normalization() {
        decision.with_normalized_license(extraction.license.clone())
    } else {
        decision
    }
}
