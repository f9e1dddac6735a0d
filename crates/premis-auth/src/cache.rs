//! Process-wide permission snapshot cache.
//!
//! Resolves (user, organization) and (user, organization, building) to
//! permission snapshots, serving cached copies within a bounded TTL and
//! falling back to the authoritative [`PermissionSource`] on a miss.
//! Negative results are cached too: a `None` snapshot means "no
//! permission" and is just as cacheable as a positive one.
//!
//! Concurrency: entries are inserted atomically per key only after the
//! awaited fetch completes, so a cancelled (dropped) lookup leaves the
//! cache untouched. Two requests racing on a cold key may both hit the
//! source; the duplicate work is accepted, the results are identical.
//! A fetch that was in flight when an invalidation hook fired discards
//! its result instead of caching it (generation check), so a revocation
//! is never masked by a racing read.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use premis_core::error::PremisResult;
use premis_core::models::permission::{UserBuildingPermission, UserOrganizationPermission};
use premis_core::models::role::SystemRole;
use premis_core::repository::PermissionSource;

use crate::config::AuthConfig;

struct Entry<T> {
    value: T,
    cached_at: Instant,
}

impl<T> Entry<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
        }
    }
}

/// Shared permission cache, constructed once at process start and
/// handed to request handling via `Arc`.
pub struct PermissionCache<S> {
    source: S,
    ttl: Duration,
    org: DashMap<(Uuid, Uuid), Entry<Option<Arc<UserOrganizationPermission>>>>,
    building: DashMap<(Uuid, Uuid, Uuid), Entry<Option<Arc<UserBuildingPermission>>>>,
    system_role: DashMap<Uuid, Entry<SystemRole>>,
    /// Bumped by every invalidation hook; a fetch only caches its result
    /// when the generation it observed before fetching is still current.
    generation: AtomicU64,
}

impl<S: PermissionSource> PermissionCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            org: DashMap::new(),
            building: DashMap::new(),
            system_role: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Cache with the TTL taken from [`AuthConfig`].
    pub fn from_config(source: S, config: &AuthConfig) -> Self {
        Self::new(source, Duration::from_secs(config.permission_cache_ttl_secs))
    }

    /// Resolved (user, organization) snapshot; `None` means no access.
    pub async fn get_organization_permission(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> PremisResult<Option<Arc<UserOrganizationPermission>>> {
        let key = (user_id, organization_id);
        if let Some(entry) = self.org.get(&key) {
            if entry.cached_at.elapsed() <= self.ttl {
                return Ok(entry.value.clone());
            }
            drop(entry);
            self.org.remove(&key);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let snapshot = self
            .source
            .fetch_organization_assignment(user_id, organization_id)
            .await?
            .map(Arc::new);
        // A fetch overlapping an invalidation may carry pre-mutation
        // data; serve it once but do not cache it.
        if self.generation.load(Ordering::Acquire) == generation {
            self.org.insert(key, Entry::fresh(snapshot.clone()));
        }
        Ok(snapshot)
    }

    /// Resolved (user, organization, building) snapshot.
    pub async fn get_building_permission(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        building_id: Uuid,
    ) -> PremisResult<Option<Arc<UserBuildingPermission>>> {
        let key = (user_id, organization_id, building_id);
        if let Some(entry) = self.building.get(&key) {
            if entry.cached_at.elapsed() <= self.ttl {
                return Ok(entry.value.clone());
            }
            drop(entry);
            self.building.remove(&key);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let snapshot = self
            .source
            .fetch_building_assignment(user_id, organization_id, building_id)
            .await?
            .map(Arc::new);
        if self.generation.load(Ordering::Acquire) == generation {
            self.building.insert(key, Entry::fresh(snapshot.clone()));
        }
        Ok(snapshot)
    }

    /// Like [`get_organization_permission`], but a system `Master` user
    /// short-circuits to a synthetic full-access snapshot without the
    /// organization assignment ever being consulted.
    ///
    /// [`get_organization_permission`]: Self::get_organization_permission
    pub async fn get_master_or_organization_permission(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> PremisResult<Option<Arc<UserOrganizationPermission>>> {
        if self.get_system_role(user_id).await? == SystemRole::Master {
            return Ok(Some(Arc::new(UserOrganizationPermission::master_override(
                user_id,
                organization_id,
            ))));
        }
        self.get_organization_permission(user_id, organization_id)
            .await
    }

    /// Building existence is checked against the source directly:
    /// deletions must be visible immediately to the SuperAdmin path.
    pub async fn building_exists(
        &self,
        organization_id: Uuid,
        building_id: Uuid,
    ) -> PremisResult<bool> {
        self.source
            .building_exists(organization_id, building_id)
            .await
    }

    async fn get_system_role(&self, user_id: Uuid) -> PremisResult<SystemRole> {
        if let Some(entry) = self.system_role.get(&user_id) {
            if entry.cached_at.elapsed() <= self.ttl {
                return Ok(entry.value);
            }
            drop(entry);
            self.system_role.remove(&user_id);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let role = self.source.fetch_system_role(user_id).await?;
        if self.generation.load(Ordering::Acquire) == generation {
            self.system_role.insert(user_id, Entry::fresh(role));
        }
        Ok(role)
    }

    // ------------------------------------------------------------------
    // Invalidation hooks. Fired by any endpoint that mutates role,
    // disabled-flag, or assignment data, before its response is
    // observable to the client.
    // ------------------------------------------------------------------

    /// User role change or user disable/enable.
    pub fn invalidate_user(&self, user_id: Uuid) {
        debug!(%user_id, "invalidating cached permissions for user");
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.org.retain(|key, _| key.0 != user_id);
        self.building.retain(|key, _| key.0 != user_id);
        self.system_role.remove(&user_id);
    }

    /// Organization disable/enable or deletion.
    pub fn invalidate_organization(&self, organization_id: Uuid) {
        debug!(%organization_id, "invalidating cached permissions for organization");
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.org.retain(|key, _| key.1 != organization_id);
        self.building.retain(|key, _| key.1 != organization_id);
    }

    /// Building deletion. Organization snapshots embed their building
    /// map, so any snapshot referencing the building goes too.
    pub fn invalidate_building(&self, building_id: Uuid) {
        debug!(%building_id, "invalidating cached permissions for building");
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.building.retain(|key, _| key.2 != building_id);
        self.org.retain(|_, entry| match &entry.value {
            Some(snapshot) => !snapshot.buildings.contains_key(&building_id),
            None => true,
        });
    }

    /// Building/user assignment change within one organization.
    pub fn invalidate_assignment(&self, user_id: Uuid, organization_id: Uuid) {
        debug!(%user_id, %organization_id, "invalidating cached assignment");
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.org.remove(&(user_id, organization_id));
        self.building
            .retain(|key, _| !(key.0 == user_id && key.1 == organization_id));
    }
}
