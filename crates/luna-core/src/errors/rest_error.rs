//! REST operation errors.
//!
//! Unknown and malformed keys both surface as `LicenseNotFound`; callers can
//! never tell which one they sent.

use super::error_code::{self, LunaErrorCode};
use super::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("Missing required parameters")]
    MissingParams,

    #[error("Missing license")]
    MissingLicense,

    #[error("License not found")]
    LicenseNotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RestError {
    /// HTTP status the binding layer should use for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingParams | Self::MissingLicense => 400,
            Self::Forbidden => 403,
            Self::LicenseNotFound => 404,
            Self::Storage(_) => 500,
        }
    }
}

impl LunaErrorCode for RestError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingParams => error_code::MISSING_PARAMS,
            Self::MissingLicense => error_code::MISSING_LICENSE,
            Self::LicenseNotFound => error_code::LICENSE_NOT_FOUND,
            Self::Forbidden => error_code::FORBIDDEN,
            Self::Storage(_) => error_code::STORAGE_ERROR,
        }
    }
}
