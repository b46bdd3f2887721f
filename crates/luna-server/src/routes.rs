//! Router assembly and handlers.

use axum::extract::{FromRequest, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use luna_core::services::{
    ActivateRequest, ActivateResponse, ClientsResponse, HeartbeatRequest, HeartbeatResponse,
    SessionInfo,
};
use luna_core::constants::PARAM_LICENSE;
use luna_core::{GuardOutcome, RequestContext};

use crate::cors::cors;
use crate::error::ApiError;
use crate::guard::{attach_session, page_guard, redirect, PageContext};
use crate::state::AppState;

/// Where a credential login lands when no redirect was requested.
const DEFAULT_LOGIN_TARGET: &str = "/wp-admin/";

pub fn router(state: AppState) -> Router {
    let login_path = state.runtime.config.routing.login_endpoint.clone();

    let api = Router::new()
        .route("/wp-json/vl-license/v1/activate", post(activate))
        .route("/wp-json/vl-license/v1/heartbeat", post(heartbeat))
        .route("/wp-json/vl-hub/v1/session", get(session_info))
        .route("/wp-json/vl-hub/v1/clients", get(clients))
        .layer(from_fn_with_state(state.clone(), cors));

    let pages = Router::new()
        .fallback(render_page)
        .layer(from_fn_with_state(state.clone(), page_guard));

    Router::new()
        .route(&login_path, get(login_screen).post(login_submit))
        .route("/logout", get(logout))
        .merge(api)
        .merge(pages)
        .with_state(state)
}

// ─── REST ───────────────────────────────────────────────────────────

async fn activate(
    State(state): State<AppState>,
    Json(body): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>, ApiError> {
    Ok(Json(state.runtime.rest.activate(&body)?))
}

async fn heartbeat(
    State(state): State<AppState>,
    Json(body): Json<HeartbeatRequest>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    Ok(Json(state.runtime.rest.heartbeat(&body)?))
}

async fn session_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionInfo>, ApiError> {
    let viewer = state.viewer(&headers);
    Ok(Json(state.runtime.rest.session_info(viewer)?))
}

async fn clients(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClientsResponse>, ApiError> {
    let viewer = state.viewer(&headers);
    Ok(Json(state.runtime.rest.clients(viewer)?))
}

// ─── Login / logout ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub log: String,
    pub pwd: String,
    pub redirect_to: String,
    pub rememberme: String,
    /// A license posted with the credentials; overrides one in the query.
    pub license: String,
}

async fn login_screen(State(state): State<AppState>, request: Request) -> Response {
    let ctx = request_context(&state, &request);
    match state.runtime.guards.on_login_init(&ctx) {
        GuardOutcome::Redirect(url) => redirect(&url),
        GuardOutcome::Continue => login_form(StatusCode::OK, ctx.param("redirect_to").unwrap_or("")),
    }
}

async fn login_submit(State(state): State<AppState>, request: Request) -> Response {
    let ctx = request_context(&state, &request);
    let Form(form) = match Form::<LoginForm>::from_request(request, &state).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };

    let user = match state.accounts.authenticate(form.log.trim(), &form.pwd) {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!(login = %form.log.trim(), "credential login rejected");
            return login_form(StatusCode::UNAUTHORIZED, &form.redirect_to);
        }
        Err(e) => {
            warn!(error = %e, "credential lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let session = match state.sessions.issue(user.id, !form.rememberme.is_empty()) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "session issue failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let requested = form.redirect_to.trim();
    let proposed = if requested.is_empty() {
        DEFAULT_LOGIN_TARGET
    } else {
        requested
    };
    let mut ctx = ctx.with_user(user.id);
    if !form.license.trim().is_empty() {
        ctx.set_param(PARAM_LICENSE, form.license.trim());
    }
    let target = state
        .runtime
        .guards
        .on_login_redirect_filter(proposed, requested, Some(user.id), &ctx);

    let mut response = redirect(&target);
    attach_session(&state, &mut response, &session);
    response
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = state
        .sessions
        .token_from_headers(&headers)
        .and_then(|token| state.sessions.revoke(&token));
    let mut response = match state.runtime.guards.on_logout(user) {
        GuardOutcome::Redirect(url) => redirect(&url),
        GuardOutcome::Continue => StatusCode::NO_CONTENT.into_response(),
    };
    if let Ok(cookie) = HeaderValue::from_str(&state.sessions.clear_cookie()) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

// ─── Pages ──────────────────────────────────────────────────────────

async fn render_page(page: Option<Extension<PageContext>>) -> Html<String> {
    let (path, license) = match page {
        Some(Extension(PageContext(ctx))) => {
            let license = ctx.param("license").unwrap_or("").to_string();
            (ctx.path, license)
        }
        None => ("/".to_string(), String::new()),
    };
    Html(format!(
        "<!doctype html><title>Luna</title><main data-path=\"{}\" data-license=\"{}\"></main>",
        escape(&path),
        escape(&license)
    ))
}

fn login_form(status: StatusCode, redirect_to: &str) -> Response {
    let notice = if status == StatusCode::UNAUTHORIZED {
        "<p role=\"alert\">Unknown username or incorrect password.</p>"
    } else {
        ""
    };
    let body = format!(
        "<!doctype html><title>Log in</title>{notice}\
         <form method=\"post\">\
         <input name=\"log\"><input name=\"pwd\" type=\"password\">\
         <input name=\"rememberme\" type=\"checkbox\" value=\"forever\">\
         <input name=\"redirect_to\" type=\"hidden\" value=\"{}\">\
         </form>",
        escape(redirect_to)
    );
    (status, Html(body)).into_response()
}

fn request_context(state: &AppState, request: &Request) -> RequestContext {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let ctx = RequestContext::from_uri(target);
    match state.viewer(request.headers()) {
        Some(viewer) => ctx.with_user(viewer),
        None => ctx,
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
