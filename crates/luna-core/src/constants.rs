//! Names shared with the host account system.

/// Role that marks an account as a console client.
pub const CLIENT_ROLE: &str = "vl_client";

/// Role allowed to manage clients (the `list_users` capability).
pub const ADMIN_ROLE: &str = "administrator";

/// Current account metadata field holding the bound license key.
pub const META_LICENSE_KEY: &str = "vl_license_key";

/// Legacy metadata field kept in sync for older readers.
pub const META_LEGACY_LICENSE_KEY: &str = "license_key";

/// Metadata field holding the client's site descriptor.
pub const META_CLIENT_SITE: &str = "vl_client_site";

/// Both license metadata fields, current first.
pub const LICENSE_META_KEYS: [&str; 2] = [META_LICENSE_KEY, META_LEGACY_LICENSE_KEY];

/// Primary query parameter carrying a license.
pub const PARAM_LICENSE: &str = "license";

/// Short query parameter carrying a license.
pub const PARAM_LIC: &str = "lic";

/// Query parameter naming the login-screen action.
pub const PARAM_ACTION: &str = "action";

/// Login-screen actions that must never be bounced to the dashboard.
pub const LOGIN_EXEMPT_ACTIONS: [&str; 7] = [
    "logout",
    "lostpassword",
    "retrievepassword",
    "rp",
    "resetpass",
    "register",
    "confirmaction",
];

/// Fallback base for usernames when neither client name nor email yields one.
pub const USERNAME_FALLBACK: &str = "vlclient";

/// Length of generated account passwords.
pub const GENERATED_PASSWORD_LEN: usize = 20;
