//! Authorization policy — the decision functions every protected
//! endpoint calls before acting.
//!
//! Each check is a pure decision over a permission snapshot, evaluated
//! in a fixed order: id validation, snapshot lookup, disabled-org rule,
//! role comparison. Expected denials are values ([`AccessDecision`]),
//! never errors; only a broken data source or corrupt state escapes as
//! `Err`.

use tracing::warn;
use uuid::Uuid;

use premis_core::error::{FieldError, PremisResult};
use premis_core::models::permission::UserOrganizationPermission;
use premis_core::models::role::{OrgRole, SystemRole};
use premis_core::repository::PermissionSource;

use crate::cache::PermissionCache;

/// Result of a policy check.
///
/// `fatal` distinguishes a permission denial (the resource does not
/// exist for this user; resubmitting will not help) from a field
/// validation failure the caller can correct. This replaces the
/// original out-of-band request-context flag with an explicit return
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub fatal: bool,
    pub errors: Vec<FieldError>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            fatal: false,
            errors: Vec::new(),
        }
    }

    /// Permission denial: not recoverable by resubmission.
    pub fn deny_fatal() -> Self {
        Self {
            allowed: false,
            fatal: true,
            errors: Vec::new(),
        }
    }

    /// Input validation denial: recoverable with corrected input.
    pub fn deny_invalid(errors: Vec<FieldError>) -> Self {
        Self {
            allowed: false,
            fatal: false,
            errors,
        }
    }
}

fn organization_id_required() -> FieldError {
    FieldError::new(
        "organizationId",
        "Organization id is required.",
        "error.organizationIdIsRequired",
    )
}

fn building_id_required() -> FieldError {
    FieldError::new(
        "buildingId",
        "Building id is required.",
        "error.buildingIdIsRequired",
    )
}

/// Authorize `user_id` against `min_role` within an organization.
pub async fn authorize_organization<S: PermissionSource>(
    cache: &PermissionCache<S>,
    organization_id: Option<Uuid>,
    user_id: Uuid,
    min_role: OrgRole,
    allow_disabled_org: bool,
) -> PremisResult<AccessDecision> {
    let Some(organization_id) = organization_id else {
        return Ok(AccessDecision::deny_invalid(vec![
            organization_id_required(),
        ]));
    };

    let Some(snapshot) = cache
        .get_organization_permission(user_id, organization_id)
        .await?
    else {
        warn!(%user_id, %organization_id, "denied: no organization assignment");
        return Ok(AccessDecision::deny_fatal());
    };

    Ok(evaluate_org_snapshot(&snapshot, min_role, allow_disabled_org))
}

/// [`authorize_organization`] with the Master bypass: a system `Master`
/// user is allowed for any organization id, existing or not, enabled or
/// not, skipping the disabled and role checks entirely.
pub async fn authorize_master_or_organization<S: PermissionSource>(
    cache: &PermissionCache<S>,
    organization_id: Option<Uuid>,
    user_id: Uuid,
    min_role: OrgRole,
    allow_disabled_org: bool,
) -> PremisResult<AccessDecision> {
    let Some(organization_id) = organization_id else {
        return Ok(AccessDecision::deny_invalid(vec![
            organization_id_required(),
        ]));
    };

    let Some(snapshot) = cache
        .get_master_or_organization_permission(user_id, organization_id)
        .await?
    else {
        warn!(%user_id, %organization_id, "denied: no organization assignment");
        return Ok(AccessDecision::deny_fatal());
    };

    if snapshot.system_role == SystemRole::Master {
        return Ok(AccessDecision::allow());
    }

    Ok(evaluate_org_snapshot(&snapshot, min_role, allow_disabled_org))
}

/// Authorize `user_id` for a building they are individually assigned to.
///
/// Both ids are validated up front; two missing ids produce two field
/// errors, not a short-circuited one.
pub async fn authorize_building<S: PermissionSource>(
    cache: &PermissionCache<S>,
    organization_id: Option<Uuid>,
    building_id: Option<Uuid>,
    user_id: Uuid,
    allow_disabled_org: bool,
) -> PremisResult<AccessDecision> {
    let (Some(organization_id), Some(building_id)) = (organization_id, building_id) else {
        return Ok(missing_building_ids(organization_id, building_id));
    };

    let Some(snapshot) = cache
        .get_building_permission(user_id, organization_id, building_id)
        .await?
    else {
        warn!(%user_id, %organization_id, %building_id, "denied: no building assignment");
        return Ok(AccessDecision::deny_fatal());
    };

    if snapshot.organization_disabled && !allow_disabled_org {
        return Ok(AccessDecision::deny_fatal());
    }
    Ok(AccessDecision::allow())
}

/// Building authorization with the SuperAdmin escape hatch: a
/// SuperAdmin may act on any building that exists in the organization,
/// assigned to it or not; User/Admin fall through to the individual
/// assignment check.
pub async fn authorize_building_or_super_admin<S: PermissionSource>(
    cache: &PermissionCache<S>,
    organization_id: Option<Uuid>,
    building_id: Option<Uuid>,
    user_id: Uuid,
    allow_disabled_org: bool,
) -> PremisResult<AccessDecision> {
    let (Some(organization_id), Some(building_id)) = (organization_id, building_id) else {
        return Ok(missing_building_ids(organization_id, building_id));
    };

    let Some(org_snapshot) = cache
        .get_organization_permission(user_id, organization_id)
        .await?
    else {
        warn!(%user_id, %organization_id, "denied: no organization assignment");
        return Ok(AccessDecision::deny_fatal());
    };

    if org_snapshot.organization_disabled && !allow_disabled_org {
        return Ok(AccessDecision::deny_fatal());
    }

    match org_snapshot.org_role {
        OrgRole::SuperAdmin => {
            if cache.building_exists(organization_id, building_id).await? {
                Ok(AccessDecision::allow())
            } else {
                Ok(AccessDecision::deny_fatal())
            }
        }
        OrgRole::User | OrgRole::Admin => {
            let Some(snapshot) = cache
                .get_building_permission(user_id, organization_id, building_id)
                .await?
            else {
                return Ok(AccessDecision::deny_fatal());
            };
            if snapshot.organization_disabled && !allow_disabled_org {
                return Ok(AccessDecision::deny_fatal());
            }
            Ok(AccessDecision::allow())
        }
        // A stored snapshot never carries NoAccess (absence is the deny
        // signal) and Tablet accounts have no building-admin surface.
        role @ (OrgRole::NoAccess | OrgRole::Tablet) => {
            unreachable!("organization snapshot with role {role:?} reached a building check")
        }
    }
}

fn evaluate_org_snapshot(
    snapshot: &UserOrganizationPermission,
    min_role: OrgRole,
    allow_disabled_org: bool,
) -> AccessDecision {
    if snapshot.organization_disabled && !allow_disabled_org {
        return AccessDecision::deny_fatal();
    }
    if snapshot.org_role.satisfies(min_role) {
        AccessDecision::allow()
    } else {
        AccessDecision::deny_fatal()
    }
}

fn missing_building_ids(organization_id: Option<Uuid>, building_id: Option<Uuid>) -> AccessDecision {
    let mut errors = Vec::new();
    if organization_id.is_none() {
        errors.push(organization_id_required());
    }
    if building_id.is_none() {
        errors.push(building_id_required());
    }
    AccessDecision::deny_invalid(errors)
}
