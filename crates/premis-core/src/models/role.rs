//! Role domain model.
//!
//! Two independent role axes exist: the per-organization role and the
//! system-wide role. The organization hierarchy is not a simple ladder —
//! `Tablet` is a parallel minimum tier for shared check-in devices,
//! satisfied only by `Tablet` itself and `SuperAdmin`.

use serde::{Deserialize, Serialize};

/// A user's role within a single organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrgRole {
    NoAccess,
    /// Shared check-in device account. Parallel tier: does not satisfy
    /// `User` and is not satisfied by `User` or `Admin`.
    Tablet,
    User,
    Admin,
    SuperAdmin,
}

impl OrgRole {
    /// Whether this role meets a required minimum.
    ///
    /// `NoAccess` < `Tablet`, `User` < `Admin` < `SuperAdmin`, with
    /// `Tablet` satisfied only by `{Tablet, SuperAdmin}`.
    pub fn satisfies(self, minimum: OrgRole) -> bool {
        match minimum {
            OrgRole::NoAccess => true,
            OrgRole::Tablet => matches!(self, OrgRole::Tablet | OrgRole::SuperAdmin),
            OrgRole::User => matches!(self, OrgRole::User | OrgRole::Admin | OrgRole::SuperAdmin),
            OrgRole::Admin => matches!(self, OrgRole::Admin | OrgRole::SuperAdmin),
            OrgRole::SuperAdmin => matches!(self, OrgRole::SuperAdmin),
        }
    }
}

/// A user's system-wide role. Flat — `Master` acts only as an
/// organization-role override where a call site explicitly opts in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SystemRole {
    NoAccess,
    User,
    Master,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_satisfies_everything() {
        for min in [
            OrgRole::NoAccess,
            OrgRole::Tablet,
            OrgRole::User,
            OrgRole::Admin,
            OrgRole::SuperAdmin,
        ] {
            assert!(OrgRole::SuperAdmin.satisfies(min), "{min:?}");
        }
    }

    #[test]
    fn ladder_is_strictly_increasing() {
        assert!(OrgRole::User.satisfies(OrgRole::User));
        assert!(OrgRole::Admin.satisfies(OrgRole::User));
        assert!(!OrgRole::User.satisfies(OrgRole::Admin));
        assert!(!OrgRole::Admin.satisfies(OrgRole::SuperAdmin));
    }

    #[test]
    fn tablet_is_a_parallel_tier() {
        assert!(OrgRole::Tablet.satisfies(OrgRole::Tablet));
        assert!(!OrgRole::User.satisfies(OrgRole::Tablet));
        assert!(!OrgRole::Admin.satisfies(OrgRole::Tablet));
        assert!(!OrgRole::Tablet.satisfies(OrgRole::User));
    }

    #[test]
    fn no_access_satisfies_nothing_but_no_access() {
        assert!(OrgRole::NoAccess.satisfies(OrgRole::NoAccess));
        assert!(!OrgRole::NoAccess.satisfies(OrgRole::Tablet));
        assert!(!OrgRole::NoAccess.satisfies(OrgRole::User));
    }
}
