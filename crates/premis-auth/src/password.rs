//! Peppered password hashing.
//!
//! Pipeline: `HMAC-SHA512(pepper, password)` → base64 → bcrypt →
//! `HMAC-SHA512(pepper, bcrypt output)` → base64 (no padding). The
//! stored value is the bcrypt settings prefix (version, cost, salt)
//! followed by the final MAC, so verification can re-run the pipeline
//! with the pinned salt and cost. The pepper is a server-wide secret.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::AuthError;

type HmacSha512 = Hmac<Sha512>;

/// bcrypt's radix-64 alphabet; salts are 22 chars / 16 bytes with four
/// trailing bits.
const BCRYPT_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Length of `$2b$NN$` plus the 22-character salt.
const SETTINGS_PREFIX_LEN: usize = 29;

/// Hash a password with a fresh random salt at the configured cost.
///
/// Cost is validated by `AuthConfig::validate` at composition time, not
/// here.
pub fn hash_password(password: &str, pepper: &str, cost: u32) -> Result<String, AuthError> {
    let salt: [u8; 16] = rand::Rng::random(&mut rand::rng());
    hash_with_pinned_salt(password, pepper, cost, salt)
}

/// Verify a password against a stored hash produced by [`hash_password`].
///
/// Salt and cost are taken from the stored settings prefix. Returns
/// `Ok(false)` on mismatch and `Err` only for a malformed stored hash.
pub fn verify_password(password: &str, stored: &str, pepper: &str) -> Result<bool, AuthError> {
    if stored.len() < SETTINGS_PREFIX_LEN || !stored.is_ascii() || !stored.starts_with("$2b$") {
        return Err(AuthError::Crypto("malformed stored password hash".into()));
    }
    let cost: u32 = stored[4..6]
        .parse()
        .map_err(|_| AuthError::Crypto("malformed bcrypt cost in stored hash".into()))?;
    let salt_bytes = BCRYPT_B64
        .decode(&stored[7..SETTINGS_PREFIX_LEN])
        .map_err(|e| AuthError::Crypto(format!("malformed bcrypt salt: {e}")))?;
    let salt: [u8; 16] = salt_bytes
        .try_into()
        .map_err(|_| AuthError::Crypto("bcrypt salt is not 16 bytes".into()))?;

    let candidate = hash_with_pinned_salt(password, pepper, cost, salt)?;
    Ok(constant_time_eq(candidate.as_bytes(), stored.as_bytes()))
}

fn hash_with_pinned_salt(
    password: &str,
    pepper: &str,
    cost: u32,
    salt: [u8; 16],
) -> Result<String, AuthError> {
    let pre_mac = hmac_sha512(pepper, password.as_bytes())?;
    let pre_b64 = STANDARD.encode(pre_mac);

    let parts = bcrypt::hash_with_salt(pre_b64.as_bytes(), cost, salt)
        .map_err(|e| AuthError::Crypto(format!("bcrypt: {e}")))?;
    let bcrypt_out = parts.format_for_version(bcrypt::Version::TwoB);

    let post_mac = hmac_sha512(pepper, bcrypt_out.as_bytes())?;
    let post_b64 = STANDARD_NO_PAD.encode(post_mac);

    Ok(format!("{}{post_b64}", &bcrypt_out[..SETTINGS_PREFIX_LEN]))
}

fn hmac_sha512(key: &str, message: &[u8]) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("HMAC key: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time byte equality: XOR-accumulate over the full length,
/// deciding only after the complete scan.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
