//! Admin operation errors. Messages are field-level and safe to show to the
//! admin-facing caller as-is.

use super::error_code::{self, LunaErrorCode};
use super::{BindingError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Client name, site, email address, and password are all required (missing: {field}).")]
    MissingField { field: &'static str },

    #[error("Please provide a valid email address for the client.")]
    InvalidEmail,

    #[error("License not found.")]
    LicenseNotFound,

    #[error("Unable to sync {client}: no email address stored with the license.")]
    MissingContactEmail { client: String },

    #[error("{0}")]
    Binding(#[from] BindingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl LunaErrorCode for AdminError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => error_code::MISSING_FIELD,
            Self::InvalidEmail => error_code::INVALID_EMAIL,
            Self::LicenseNotFound => error_code::LICENSE_NOT_FOUND,
            Self::MissingContactEmail { .. } => error_code::MISSING_CONTACT_EMAIL,
            Self::Binding(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
        }
    }
}
