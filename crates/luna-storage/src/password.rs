//! Password digests: PBKDF2-HMAC-SHA256 with a random salt, stored as
//! `pbkdf2-sha256$<rounds>$<salt hex>$<digest hex>`.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Rounds for newly hashed passwords. Stored hashes carry their own count.
pub const DEFAULT_ROUNDS: u32 = 310_000;

pub fn hash_password(password: &str) -> String {
    hash_password_with(password, DEFAULT_ROUNDS)
}

pub fn hash_password_with(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = derive(password, &salt, rounds);
    format!("{SCHEME}${rounds}${}${}", hex::encode(salt), hex::encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(4, '$');
    let (Some(SCHEME), Some(rounds), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(rounds), Ok(salt), Ok(expected)) =
        (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };
    if rounds == 0 || expected.len() != DIGEST_LEN {
        return false;
    }
    derive(password, &salt, rounds).ct_eq(&expected).into()
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> Vec<u8> {
    let mut out = vec![0u8; DIGEST_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}
