//! License key format: `VL-XXXX-XXXX-XXXX` over a 32-symbol alphabet that
//! leaves out `0`, `O`, `1` and `I`.

use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};

use crate::constants::PARAM_LICENSE;

pub const KEY_PREFIX: &str = "VL-";
pub const KEY_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const KEY_GROUPS: usize = 3;
pub const KEY_GROUP_LEN: usize = 4;
pub const LEGACY_PREFIX: &str = "lic_";

/// Fresh key from the operating system's CSPRNG.
pub fn generate() -> String {
    generate_with(&mut OsRng)
}

/// Fresh key from the given cryptographically secure source.
pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut key = String::with_capacity(KEY_PREFIX.len() + KEY_GROUPS * (KEY_GROUP_LEN + 1));
    key.push_str(KEY_PREFIX);
    for group in 0..KEY_GROUPS {
        if group > 0 {
            key.push('-');
        }
        for _ in 0..KEY_GROUP_LEN {
            let idx = rng.gen_range(0..KEY_ALPHABET.len());
            key.push(KEY_ALPHABET[idx] as char);
        }
    }
    assert!(!is_legacy(&key), "generated key carries the legacy prefix");
    key
}

/// Deprecated `lic_` keys, matched case-insensitively.
pub fn is_legacy(key: &str) -> bool {
    key.trim()
        .get(..LEGACY_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(LEGACY_PREFIX))
}

/// Exact canonical shape. Lookups never require it; seeds and generated keys do.
pub fn is_canonical(key: &str) -> bool {
    let Some(body) = key.strip_prefix(KEY_PREFIX) else {
        return false;
    };
    let groups: Vec<&str> = body.split('-').collect();
    groups.len() == KEY_GROUPS
        && groups.iter().all(|g| {
            g.len() == KEY_GROUP_LEN && g.bytes().all(|b| KEY_ALPHABET.contains(&b))
        })
}

/// Log-safe form of a key: first 8 chars, `...`, last 4.
pub fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// `<base>?license=<key>`; the bare base when `key` is empty.
pub fn dashboard_url(base: &str, key: &str) -> String {
    if key.is_empty() {
        return base.to_string();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{PARAM_LICENSE}={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_is_canonical() {
        for _ in 0..64 {
            let key = generate();
            assert!(is_canonical(&key), "{key}");
            assert!(!is_legacy(&key));
        }
    }

    #[test]
    fn legacy_prefix_is_case_insensitive() {
        assert!(is_legacy("lic_abc"));
        assert!(is_legacy("LIC_abc"));
        assert!(is_legacy("  Lic_abc"));
        assert!(!is_legacy("VL-AWJJ-8J6S-GD6R"));
        assert!(!is_legacy("li"));
        assert!(!is_legacy("é"));
    }

    #[test]
    fn canonical_rejects_ambiguous_symbols() {
        assert!(is_canonical("VL-AWJJ-8J6S-GD6R"));
        assert!(!is_canonical("VL-BOGUS-0000-0000"));
        assert!(!is_canonical("VL-AWJ0-8J6S-GD6R"));
        assert!(!is_canonical("vl-AWJJ-8J6S-GD6R"));
        assert!(!is_canonical("VL-AWJJ-8J6S"));
    }

    #[test]
    fn redact_keeps_edges() {
        assert_eq!(redact("VL-AWJJ-8J6S-GD6R"), "VL-AWJJ-...GD6R");
        assert_eq!(redact("short"), "*****");
    }

    #[test]
    fn dashboard_url_appends_param() {
        assert_eq!(
            dashboard_url("https://supercluster.visiblelight.ai/", "VL-AWJJ-8J6S-GD6R"),
            "https://supercluster.visiblelight.ai/?license=VL-AWJJ-8J6S-GD6R"
        );
        assert_eq!(
            dashboard_url("https://x.test/d?tab=1", "VL-AWJJ-8J6S-GD6R"),
            "https://x.test/d?tab=1&license=VL-AWJJ-8J6S-GD6R"
        );
        assert_eq!(dashboard_url("https://x.test/", ""), "https://x.test/");
    }
}
