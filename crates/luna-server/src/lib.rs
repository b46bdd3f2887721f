//! # luna-server
//!
//! axum binding for the Luna license gate.
//!
//! ## Modules
//! - `cors` — CORS headers and preflight for the REST routes
//! - `error` — REST errors as JSON responses
//! - `guard` — page middleware running the early-init and template guards
//! - `routes` — REST, login and logout handlers, router assembly
//! - `session` — in-memory cookie session table
//! - `state` — shared application state

pub mod cors;
pub mod error;
pub mod guard;
pub mod routes;
pub mod session;
pub mod state;

pub use routes::router;
pub use session::CookieSessionStore;
pub use state::AppState;
