//! Request License Extractor.
//!
//! Precedence, first match wins: `license` query parameter, `lic` query
//! parameter, then a `lic=<token>` or `license=<token>` path segment under
//! one of the console families or the supercluster family.

mod extractor;

pub use extractor::LicenseExtractor;
