//! PREMIS Auth — permission resolution, password and TOTP credential
//! verification, and token issuance.
//!
//! The cache services in this crate are constructed once at process
//! start and injected (by `Arc`) into request handling; nothing here is
//! process-global.

pub mod cache;
pub mod config;
pub mod error;
pub mod password;
pub mod policy;
pub mod service;
pub mod token;
pub mod totp;

pub use cache::PermissionCache;
pub use config::AuthConfig;
pub use error::AuthError;
pub use policy::AccessDecision;
pub use service::{LoginOutcome, LoginRequest, LoginService};
pub use token::{AccessTokenClaims, TokenSubject};
pub use totp::{TotpOutcome, TotpVerifier};
