//! Authentication configuration.

use crate::error::AuthError;

/// Inclusive bcrypt cost range accepted by [`AuthConfig::validate`].
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 16;

/// Configuration for the authentication subsystem.
///
/// Secrets (pepper, TOTP encryption key, JWT keys) come from the secret
/// store at composition time; none of them are derived from per-user
/// data.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Session access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Tablet access token lifetime in seconds (default: ten years).
    /// Tablet devices re-authenticate by other means; no refresh token.
    pub tablet_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// Server-wide pepper for password hashing.
    pub pepper: String,
    /// bcrypt cost factor; must be within [10, 16].
    pub bcrypt_cost: u32,
    /// Issuer name shown in authenticator apps.
    pub totp_issuer: String,
    /// 256-bit AES-GCM key for encrypting TOTP secrets at rest.
    pub totp_encryption_key: [u8; 32],
    /// Permission snapshot TTL in seconds (default: 300 = 5 minutes).
    pub permission_cache_ttl_secs: u64,
    /// Max consecutive failed attempts before lockout (default: 5).
    pub max_failed_attempts: u32,
    /// Lockout duration in seconds (default: 300 = 5 min).
    pub lockout_duration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "premis".into(),
            access_token_lifetime_secs: 900,
            tablet_token_lifetime_secs: 10 * 365 * 24 * 3600,
            refresh_token_lifetime_secs: 2_592_000,
            pepper: String::new(),
            bcrypt_cost: 12,
            totp_issuer: "PREMIS".into(),
            totp_encryption_key: [0u8; 32],
            permission_cache_ttl_secs: 300,
            max_failed_attempts: 5,
            lockout_duration_secs: 300,
        }
    }
}

impl AuthConfig {
    /// Reject misconfiguration at composition time. A cost outside the
    /// accepted range or a missing secret is a deployment error, not
    /// something to surface per request.
    pub fn validate(&self) -> Result<(), AuthError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(AuthError::Config(format!(
                "bcrypt cost {} outside [{MIN_BCRYPT_COST}, {MAX_BCRYPT_COST}]",
                self.bcrypt_cost
            )));
        }
        if self.pepper.is_empty() {
            return Err(AuthError::Config("password pepper is not set".into()));
        }
        if self.jwt_private_key_pem.is_empty() || self.jwt_public_key_pem.is_empty() {
            return Err(AuthError::Config("JWT key pair is not set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        AuthConfig {
            jwt_private_key_pem: "key".into(),
            jwt_public_key_pem: "key".into(),
            pepper: "pepper".into(),
            ..Default::default()
        }
    }

    #[test]
    fn default_cost_is_accepted() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn cost_out_of_range_is_a_config_error() {
        for cost in [4, 9, 17, 31] {
            let config = AuthConfig {
                bcrypt_cost: cost,
                ..valid_config()
            };
            assert!(
                matches!(config.validate(), Err(AuthError::Config(_))),
                "cost {cost} should be rejected"
            );
        }
    }

    #[test]
    fn missing_pepper_is_rejected() {
        let config = AuthConfig {
            pepper: String::new(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }
}
