//! Salted SHA-256 credential digests: `sha256$<salt>$<digest>` (base64).

use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD as B64};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4();
    let d = digest(salt.as_bytes(), password);
    format!("{SCHEME}${}${}", B64.encode(salt.as_bytes()), B64.encode(d))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(SCHEME), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (B64.decode(salt), B64.decode(expected)) else {
        return false;
    };

    constant_time_eq(&digest(&salt, password), &expected)
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
