//! TOTP verification with single-use replay protection, and AES-256-GCM
//! secret encryption.
//!
//! Codes are 6 digits over a 30-second step, HMAC-SHA512, with one step
//! of tolerance either way for network delay. A code that matches at
//! step `T` is usable exactly once: the replay cache remembers
//! `(user, T)` for three periods, so resubmitting the same code is
//! rejected even though it is still cryptographically valid.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use totp_rs::{Algorithm, TOTP};
use uuid::Uuid;

use crate::error::AuthError;
use crate::password::constant_time_eq;

pub const TOTP_STEP_SECS: u64 = 30;
pub const TOTP_DIGITS: usize = 6;
/// Replay entries outlive the full ±1-step verification window.
pub const REPLAY_TTL: Duration = Duration::from_secs(91);
/// Default secret length (160 bits, the RFC 4226 recommendation).
pub const DEFAULT_SECRET_BYTES: usize = 20;

/// Outcome of a single code verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotpOutcome {
    Ok,
    CodeInvalid,
    /// Cryptographically valid, but the matched time-step was already
    /// consumed by an earlier login.
    CodeAlreadyUsed,
}

/// Verifier holding the secret-encryption key and the replay cache.
///
/// One instance per process, shared across requests; the replay cache
/// is safe for concurrent use.
pub struct TotpVerifier {
    encryption_key: [u8; 32],
    issuer: String,
    replay: DashMap<(Uuid, u64), Instant>,
}

impl TotpVerifier {
    pub fn new(encryption_key: [u8; 32], issuer: impl Into<String>) -> Self {
        Self {
            encryption_key,
            issuer: issuer.into(),
            replay: DashMap::new(),
        }
    }

    /// Generate a fresh raw secret from the OS RNG.
    pub fn generate_secret(length_bytes: usize) -> Vec<u8> {
        let mut secret = vec![0u8; length_bytes];
        OsRng.fill_bytes(&mut secret);
        secret
    }

    /// otpauth:// URI for enrolling `account` in an authenticator app.
    ///
    /// The only place a plaintext secret ever leaves this module.
    pub fn provisioning_uri(&self, secret: &[u8], account: &str) -> Result<String, AuthError> {
        let totp = TOTP::new(
            Algorithm::SHA512,
            TOTP_DIGITS,
            1,
            TOTP_STEP_SECS,
            secret.to_vec(),
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))?;
        Ok(totp.get_url())
    }

    /// Verify a submitted code against a user's encrypted secret.
    pub fn verify_code(
        &self,
        user_id: Uuid,
        code: &str,
        encrypted_secret: &str,
    ) -> Result<TotpOutcome, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Crypto(format!("system clock: {e}")))?
            .as_secs();
        let secret = decrypt_secret(&self.encryption_key, encrypted_secret)?;
        self.verify_at(user_id, code, &secret, now)
    }

    fn verify_at(
        &self,
        user_id: Uuid,
        code: &str,
        secret: &[u8],
        now_secs: u64,
    ) -> Result<TotpOutcome, AuthError> {
        if code.len() != TOTP_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(TotpOutcome::CodeInvalid);
        }

        // Parameters are our own; skip totp-rs URL validation.
        let totp = TOTP::new_unchecked(
            Algorithm::SHA512,
            TOTP_DIGITS,
            1,
            TOTP_STEP_SECS,
            secret.to_vec(),
            Some(self.issuer.clone()),
            String::new(),
        );

        // Generate each candidate step explicitly: the replay key needs
        // the step that matched, not just a yes/no.
        for candidate in [
            now_secs.saturating_sub(TOTP_STEP_SECS),
            now_secs,
            now_secs + TOTP_STEP_SECS,
        ] {
            let expected = totp.generate(candidate);
            if constant_time_eq(code.as_bytes(), expected.as_bytes()) {
                return Ok(self.consume_step(user_id, candidate / TOTP_STEP_SECS));
            }
        }
        Ok(TotpOutcome::CodeInvalid)
    }

    /// Single-use gate per (user, matched step). Check and insert run
    /// under the shard's write lock via the entry API, so concurrent
    /// submissions of the same code cannot both consume the step.
    /// Expired entries are reclaimed in place on the next hit.
    fn consume_step(&self, user_id: Uuid, step: u64) -> TotpOutcome {
        match self.replay.entry((user_id, step)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().elapsed() <= REPLAY_TTL {
                    return TotpOutcome::CodeAlreadyUsed;
                }
                occupied.insert(Instant::now());
                TotpOutcome::Ok
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                TotpOutcome::Ok
            }
        }
    }

    /// Drop all expired replay entries (periodic housekeeping).
    pub fn purge_expired(&self) {
        self.replay.retain(|_, inserted| inserted.elapsed() <= REPLAY_TTL);
    }
}

/// Encrypt a TOTP secret with AES-256-GCM.
///
/// Returns `base64(nonce || ciphertext || tag)`.
pub fn encrypt_secret(key: &[u8; 32], plaintext: &[u8]) -> Result<String, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Decrypt an AES-256-GCM encrypted TOTP secret.
pub fn decrypt_secret(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, AuthError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() < 13 {
        return Err(AuthError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [42u8; 32];
    // A fixed timestamp well past the epoch so the ±1-step window never
    // underflows.
    const NOW: u64 = 1_700_000_000;

    fn verifier() -> TotpVerifier {
        TotpVerifier::new(KEY, "PREMIS-Test")
    }

    fn code_at(secret: &[u8], time: u64) -> String {
        TOTP::new_unchecked(
            Algorithm::SHA512,
            TOTP_DIGITS,
            1,
            TOTP_STEP_SECS,
            secret.to_vec(),
            None,
            String::new(),
        )
        .generate(time)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let encrypted = encrypt_secret(&KEY, b"totp-secret-bytes-01").unwrap();
        let decrypted = decrypt_secret(&KEY, &encrypted).unwrap();
        assert_eq!(decrypted, b"totp-secret-bytes-01");
    }

    #[test]
    fn wrong_key_fails_decrypt() {
        let encrypted = encrypt_secret(&KEY, b"secret-material-0123").unwrap();
        assert!(decrypt_secret(&[99u8; 32], &encrypted).is_err());
    }

    #[test]
    fn valid_code_verifies_once_then_replays() {
        let v = verifier();
        let secret = TotpVerifier::generate_secret(DEFAULT_SECRET_BYTES);
        let user = Uuid::new_v4();
        let code = code_at(&secret, NOW);

        assert_eq!(v.verify_at(user, &code, &secret, NOW).unwrap(), TotpOutcome::Ok);
        assert_eq!(
            v.verify_at(user, &code, &secret, NOW).unwrap(),
            TotpOutcome::CodeAlreadyUsed
        );
    }

    #[test]
    fn replay_is_per_user() {
        let v = verifier();
        let secret = TotpVerifier::generate_secret(DEFAULT_SECRET_BYTES);
        let code = code_at(&secret, NOW);

        assert_eq!(
            v.verify_at(Uuid::new_v4(), &code, &secret, NOW).unwrap(),
            TotpOutcome::Ok
        );
        assert_eq!(
            v.verify_at(Uuid::new_v4(), &code, &secret, NOW).unwrap(),
            TotpOutcome::Ok
        );
    }

    #[test]
    fn adjacent_steps_are_accepted() {
        let v = verifier();
        let secret = TotpVerifier::generate_secret(DEFAULT_SECRET_BYTES);
        let user = Uuid::new_v4();

        let previous = code_at(&secret, NOW - TOTP_STEP_SECS);
        let next = code_at(&secret, NOW + TOTP_STEP_SECS);
        assert_eq!(
            v.verify_at(user, &previous, &secret, NOW).unwrap(),
            TotpOutcome::Ok
        );
        assert_eq!(v.verify_at(user, &next, &secret, NOW).unwrap(), TotpOutcome::Ok);
    }

    #[test]
    fn code_outside_window_is_invalid() {
        let v = verifier();
        let secret = TotpVerifier::generate_secret(DEFAULT_SECRET_BYTES);
        let stale = code_at(&secret, NOW - 2 * TOTP_STEP_SECS);

        assert_eq!(
            v.verify_at(Uuid::new_v4(), &stale, &secret, NOW).unwrap(),
            TotpOutcome::CodeInvalid
        );
    }

    #[test]
    fn a_new_step_is_not_blocked_by_an_old_one() {
        let v = verifier();
        let secret = TotpVerifier::generate_secret(DEFAULT_SECRET_BYTES);
        let user = Uuid::new_v4();

        let first = code_at(&secret, NOW);
        assert_eq!(v.verify_at(user, &first, &secret, NOW).unwrap(), TotpOutcome::Ok);

        let later = NOW + 4 * TOTP_STEP_SECS;
        let second = code_at(&secret, later);
        assert_eq!(
            v.verify_at(user, &second, &secret, later).unwrap(),
            TotpOutcome::Ok
        );
    }

    #[test]
    fn concurrent_submissions_of_one_code_authorize_once() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let v = Arc::new(verifier());
        let user = Uuid::new_v4();

        for step in 0..500 {
            let barrier = Arc::new(Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let v = Arc::clone(&v);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        v.consume_step(user, step)
                    })
                })
                .collect();
            let oks = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|outcome| *outcome == TotpOutcome::Ok)
                .count();
            assert_eq!(oks, 1, "step {step}: exactly one submission may win");
        }
    }

    #[test]
    fn malformed_codes_are_invalid_not_errors() {
        let v = verifier();
        let secret = TotpVerifier::generate_secret(DEFAULT_SECRET_BYTES);
        let user = Uuid::new_v4();

        for bad in ["", "12345", "1234567", "12345a", "......"] {
            assert_eq!(
                v.verify_at(user, bad, &secret, NOW).unwrap(),
                TotpOutcome::CodeInvalid,
                "{bad:?}"
            );
        }
    }

    #[test]
    fn provisioning_uri_shape() {
        let v = verifier();
        let secret = TotpVerifier::generate_secret(DEFAULT_SECRET_BYTES);
        let uri = v.provisioning_uri(&secret, "alice@example.com").unwrap();
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("PREMIS-Test"));
        assert!(uri.contains("SHA512"));
    }
}
