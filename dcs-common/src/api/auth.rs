//! Password and session token primitives
//!
//! # Passwords
//!
//! Stored as `SHA-256(salt || password)` in lowercase hex, with a random
//! 128-bit salt per person. The plaintext is never persisted.
//!
//! # Session tokens
//!
//! Random 256-bit values handed to the client as 64 hex characters. Only
//! `SHA-256(token)` is stored, so a leaked database does not leak live
//! sessions.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn random_hex(len: usize) -> String {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    to_hex(&buf)
}

/// Generate a fresh password salt (32 hex characters)
pub fn generate_salt() -> String {
    random_hex(16)
}

/// Hash a password with its salt
///
/// # Examples
///
/// ```
/// use dcs_common::api::auth::hash_password;
///
/// let hash = hash_password("hunter22", "00112233445566778899aabbccddeeff");
/// assert_eq!(hash.len(), 64);
/// assert_ne!(hash, hash_password("hunter22", "ffeeddccbbaa99887766554433221100"));
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a candidate password against a stored hash
///
/// Comparison runs over the full digest regardless of where the first
/// mismatch is.
pub fn verify_password(candidate: &str, salt: &str, stored_hash: &str) -> bool {
    let calculated = hash_password(candidate, salt);
    if calculated.len() != stored_hash.len() {
        return false;
    }
    calculated
        .bytes()
        .zip(stored_hash.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Generate a new session token (64 hex characters)
pub fn generate_session_token() -> String {
    random_hex(32)
}

/// Digest of a session token as stored in the `sessions` table
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
