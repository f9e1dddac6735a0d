//! Permission snapshot domain model.
//!
//! Snapshots are read-only projections of the persistent assignment
//! records. Absence of a snapshot for a (user, organization) pair *is*
//! the deny signal — no snapshot ever carries an explicit deny flag.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::role::{OrgRole, SystemRole};

/// Resolved permissions of one user within one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOrganizationPermission {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub organization_disabled: bool,
    pub org_role: OrgRole,
    pub system_role: SystemRole,
    /// Building-level permissions keyed by building id.
    pub buildings: HashMap<Uuid, UserBuildingPermission>,
}

impl UserOrganizationPermission {
    /// Synthetic full-access snapshot for a system `Master` user.
    ///
    /// Produced without consulting organization assignment — the
    /// organization may not even exist.
    pub fn master_override(user_id: Uuid, organization_id: Uuid) -> Self {
        Self {
            user_id,
            organization_id,
            organization_disabled: false,
            org_role: OrgRole::SuperAdmin,
            system_role: SystemRole::Master,
            buildings: HashMap::new(),
        }
    }
}

/// Resolved permissions of one user within one building.
///
/// Carries the owning organization's id and disabled flag so building
/// checks need no second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBuildingPermission {
    pub user_id: Uuid,
    pub building_id: Uuid,
    /// IANA timezone of the building (e.g. `Europe/Amsterdam`).
    pub timezone: String,
    pub organization_id: Uuid,
    pub organization_disabled: bool,
    pub function_id: Option<Uuid>,
    pub allow_booking_desk_for_visitor: bool,
    pub allow_booking_restricted_rooms: bool,
    pub allow_booking_anyone_anywhere: bool,
}
