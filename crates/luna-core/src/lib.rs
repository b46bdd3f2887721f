//! # luna-core
//!
//! Foundation crate for the Luna license gate.
//! A license key is the sole credential that unlocks a client's console;
//! this crate decides, per request, whether a key is valid, which account it
//! maps to, whether that account should be signed in silently, and where the
//! request should go next.
//!
//! ## Modules
//! - `binding` — license → account resolution, account provisioning
//! - `config` — LunaConfig and its sections, TOML loading, validation
//! - `constants` — role, capability and metadata names shared with the host
//! - `errors` — one thiserror enum per concern, LunaErrorCode mapping
//! - `events` — session event handlers and the dispatcher
//! - `extraction` — license extraction from requests and arbitrary URLs
//! - `guards` — lifecycle hook adapters that apply engine decisions
//! - `licensing` — key codec, legacy migrator, license registry
//! - `reconcile` — the license/session reconciliation engine
//! - `runtime` — explicit wiring of every component
//! - `services` — REST and admin operations
//! - `tracing` — subscriber setup
//! - `traits` — storage, clock and session seams with in-memory doubles
//! - `types` — records, accounts, request context, decisions

pub mod binding;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod extraction;
pub mod guards;
pub mod licensing;
pub mod reconcile;
pub mod runtime;
pub mod services;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::LunaConfig;
pub use errors::{LunaError, LunaErrorCode, LunaResult};
pub use guards::{GuardOutcome, RouteGuards};
pub use reconcile::ReconciliationEngine;
pub use runtime::LunaRuntime;
pub use types::{
    Decision, DecisionAction, ExtractionSource, LicenseExtraction, LicenseRecord, LicenseStatus,
    RequestContext, SessionGrant, UserAccount, UserId,
};
