//! Username synthesis and password generation for new client accounts.

use rand::rngs::OsRng;
use rand::Rng;

use crate::constants::{GENERATED_PASSWORD_LEN, USERNAME_FALLBACK};
use crate::errors::StorageError;
use crate::licensing::sanitize::sanitize_user;
use crate::traits::IUserDirectory;

const PASSWORD_CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_ []{}<>~`+=,.;:/?|";

/// Base username: client name without whitespace, lowercased; then the
/// email's local part; then the client name with spaces as hyphens; then
/// the generic fallback. Every candidate goes through strict sanitizing.
pub fn username_base(client_name: &str, email: &str) -> String {
    let squashed: String = client_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let local = email.split('@').next().unwrap_or_default();
    let hyphenated = client_name.to_lowercase().replace(' ', "-");

    [squashed.as_str(), local, hyphenated.as_str()]
        .iter()
        .map(|candidate| sanitize_user(candidate, true))
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_else(|| USERNAME_FALLBACK.to_string())
}

/// First free login: `base`, then `base1`, `base2`, ...
pub fn unique_username(directory: &dyn IUserDirectory, base: &str) -> Result<String, StorageError> {
    let mut candidate = base.to_string();
    let mut suffix: u64 = 1;
    while directory.login_exists(&candidate)? {
        candidate = format!("{base}{suffix}");
        suffix += 1;
    }
    Ok(candidate)
}

/// Random password with special characters, from the OS CSPRNG.
pub fn generate_password() -> String {
    let mut rng = OsRng;
    (0..GENERATED_PASSWORD_LEN)
        .map(|_| PASSWORD_CHARS[rng.gen_range(0..PASSWORD_CHARS.len())] as char)
        .collect()
}
