//! Account binding errors.

use super::error_code::{self, LunaErrorCode};
use super::StorageError;

/// Errors raised while binding a license to an account.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("A valid email address is required for VL clients.")]
    InvalidEmail,

    #[error("Unable to load the existing user for {email}.")]
    ExistingUserMissing { email: String },

    #[error("Unable to create a user for {email}: {reason}")]
    CreateFailed { email: String, reason: String },

    #[error("License {license} is already bound to another user ({holder}).")]
    AlreadyBound { license: String, holder: u64 },

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for BindingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict {
                license_key,
                holder,
            } => Self::AlreadyBound {
                license: license_key,
                holder,
            },
            other => Self::Storage(other),
        }
    }
}

impl LunaErrorCode for BindingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => error_code::INVALID_EMAIL,
            Self::ExistingUserMissing { .. } => error_code::EXISTING_USER_MISSING,
            Self::CreateFailed { .. } => error_code::CREATE_FAILED,
            Self::AlreadyBound { .. } => error_code::ALREADY_BOUND,
            Self::Storage(e) => e.error_code(),
        }
    }
}
