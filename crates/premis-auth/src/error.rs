//! Authentication error types.

use premis_core::error::PremisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for PremisError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => {
                PremisError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::Config(msg) => PremisError::Internal(msg),
            AuthError::Crypto(msg) => PremisError::Crypto(msg),
        }
    }
}
