//! Data-access trait definitions.
//!
//! All operations are async. Implementations live outside this core —
//! the authoritative assignment store owns consistency of the underlying
//! records; these traits only reflect its current state.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::PremisResult;
use crate::models::{
    permission::{UserBuildingPermission, UserOrganizationPermission},
    role::SystemRole,
    user::AuthUser,
};

/// Authoritative source of permission data, queried on cache misses.
///
/// `None` means unassigned, nonexistent, or deleted — callers treat all
/// three as "no permission", never as an error.
pub trait PermissionSource: Send + Sync {
    fn fetch_organization_assignment(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> impl Future<Output = PremisResult<Option<UserOrganizationPermission>>> + Send;

    fn fetch_building_assignment(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        building_id: Uuid,
    ) -> impl Future<Output = PremisResult<Option<UserBuildingPermission>>> + Send;

    /// System-wide role of a user; unknown users resolve to `NoAccess`.
    fn fetch_system_role(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = PremisResult<SystemRole>> + Send;

    /// Whether a building exists within an organization, regardless of
    /// any per-user assignment.
    fn building_exists(
        &self,
        organization_id: Uuid,
        building_id: Uuid,
    ) -> impl Future<Output = PremisResult<bool>> + Send;
}

/// Credential lookup and failed-attempt bookkeeping for the login flow.
pub trait UserDirectory: Send + Sync {
    fn get_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = PremisResult<Option<AuthUser>>> + Send;

    /// Record a failed password attempt. When the incremented counter
    /// reaches `max_attempts`, the directory sets
    /// `password_locked_until` to now plus `lockout` and resets the
    /// counter.
    fn record_failed_password_attempt(
        &self,
        user_id: Uuid,
        max_attempts: u32,
        lockout: Duration,
    ) -> impl Future<Output = PremisResult<()>> + Send;

    /// Same bookkeeping as the password variant, against
    /// `totp_locked_until`.
    fn record_failed_totp_attempt(
        &self,
        user_id: Uuid,
        max_attempts: u32,
        lockout: Duration,
    ) -> impl Future<Output = PremisResult<()>> + Send;

    /// Reset both attempt counters after a fully successful login.
    fn clear_failed_attempts(&self, user_id: Uuid)
    -> impl Future<Output = PremisResult<()>> + Send;
}

/// Server-side store of opaque refresh tokens, kept as raw bytes.
pub trait RefreshTokenStore: Send + Sync {
    fn store(
        &self,
        user_id: Uuid,
        token: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = PremisResult<()>> + Send;

    /// Atomically consume a stored token: if a live token for `user_id`
    /// matches `token` (constant-time comparison), remove it and return
    /// `true`. A consumed or unknown token returns `false` — single-use
    /// is the replay guarantee.
    fn consume(
        &self,
        user_id: Uuid,
        token: &[u8],
    ) -> impl Future<Output = PremisResult<bool>> + Send;

    /// Revoke every live refresh token for a user (e.g. password change).
    fn revoke_all(&self, user_id: Uuid) -> impl Future<Output = PremisResult<()>> + Send;
}
