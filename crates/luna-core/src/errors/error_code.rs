//! Stable error codes surfaced to callers.

/// Maps an error to a stable, machine-readable code.
pub trait LunaErrorCode {
    fn error_code(&self) -> &'static str;
}

pub const STORAGE_ERROR: &str = "storage_error";
pub const CONFLICT: &str = "conflict";
pub const NOT_FOUND: &str = "not_found";
pub const NOT_SUPPORTED: &str = "not_supported";
pub const INVALID_EMAIL: &str = "invalid_email";
pub const CREATE_FAILED: &str = "create_failed";
pub const EXISTING_USER_MISSING: &str = "existing_user_missing";
pub const ALREADY_BOUND: &str = "already_bound";
pub const MISSING_PARAMS: &str = "missing_params";
pub const MISSING_LICENSE: &str = "missing_license";
pub const LICENSE_NOT_FOUND: &str = "license_not_found";
pub const FORBIDDEN: &str = "forbidden";
pub const MISSING_FIELD: &str = "missing_field";
pub const MISSING_CONTACT_EMAIL: &str = "missing_contact_email";
pub const CONFIG_ERROR: &str = "config_error";
