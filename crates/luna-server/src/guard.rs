//! Page middleware: early-init guard, then template-render guard, then the
//! page itself. A session granted along the way rides back on the response
//! as a `Set-Cookie`.

use axum::extract::{Request, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use luna_core::{GuardOutcome, RequestContext};

use crate::session::{IssuedSession, IssuingSink};
use crate::state::AppState;

const ADMIN_AREA: &str = "/wp-admin";

/// The guarded request as the page handler sees it: normalized license
/// parameter, resolved viewer.
#[derive(Debug, Clone)]
pub struct PageContext(pub RequestContext);

pub async fn page_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let mut ctx = RequestContext::from_uri(&target).with_admin(target.starts_with(ADMIN_AREA));
    if let Some(viewer) = state.viewer(request.headers()) {
        ctx = ctx.with_user(viewer);
    }

    let (outcome, issued) = {
        let guards = &state.runtime.guards;
        let sink = IssuingSink::new(&state.sessions);
        let mut outcome = guards.on_early_init(&mut ctx, &sink);
        if outcome == GuardOutcome::Continue {
            outcome = guards.on_template_render(&mut ctx, &sink);
        }
        (outcome, sink.into_issued())
    };

    let mut response = match outcome {
        GuardOutcome::Redirect(url) => {
            debug!(path = %ctx.path, to = %url, "guard redirect");
            redirect(&url)
        }
        GuardOutcome::Continue => {
            request.extensions_mut().insert(PageContext(ctx));
            next.run(request).await
        }
    };
    if let Some(session) = issued {
        attach_session(&state, &mut response, &session);
    }
    response
}

/// 302 to `url`.
pub fn redirect(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
        Err(e) => {
            warn!(error = %e, "redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn attach_session(state: &AppState, response: &mut Response, session: &IssuedSession) {
    match HeaderValue::from_str(&state.sessions.set_cookie(session)) {
        Ok(cookie) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Err(e) => warn!(error = %e, "session cookie is not a valid header value"),
    }
}
