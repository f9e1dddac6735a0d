//! User credential domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::role::SystemRole;

/// The raw credential record the login flow consumes.
///
/// `password_hash` is `None` for SSO-only accounts. `totp_secret` is the
/// AES-256-GCM encrypted secret (if two-factor is enrolled) — decrypted
/// only in-memory during verification, never logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub totp_enabled: bool,
    pub totp_secret: Option<String>,
    pub system_role: SystemRole,
    /// Password logins rejected until this instant (lockout).
    pub password_locked_until: Option<DateTime<Utc>>,
    /// Two-factor attempts rejected until this instant (lockout).
    pub totp_locked_until: Option<DateTime<Utc>>,
    pub failed_password_attempts: u32,
    pub failed_totp_attempts: u32,
}
