//! License keys and the license registry.
//!
//! ## Components
//! - **key_codec** — generation, format checks, redaction, dashboard URLs
//! - **sanitize** — host-compatible text, email, username and URL cleaning
//! - **migrator** — normalize-on-read of the registry document, legacy purge
//! - **registry** — LicenseRegistry over an injected option store

pub mod key_codec;
pub mod migrator;
pub mod registry;
pub mod sanitize;

pub use key_codec::{dashboard_url, generate, is_canonical, is_legacy, redact};
pub use migrator::{normalize_document, normalize_record, Normalized};
pub use registry::LicenseRegistry;
