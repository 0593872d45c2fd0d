//! Persisted role hint.
//!
//! Role, tenant and staff flag from the last successful profile fetch are kept
//! in durable storage so a restarted client can pick a landing page before the
//! profile arrives. The hint never feeds the session snapshot; it is dropped
//! as soon as a fresh profile disagrees with it, and on every auth cleanup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sahara_core::TenantId;

use crate::storage::KeyValueStorage;
use crate::{Profile, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHint {
    pub role: Role,
    pub tenant_id: TenantId,
    pub is_staff: bool,
}

impl From<&Profile> for RoleHint {
    fn from(profile: &Profile) -> Self {
        Self {
            role: profile.role,
            tenant_id: profile.tenant_id(),
            is_staff: profile.is_staff,
        }
    }
}

/// What [`RoleHintCache::reconcile`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintUpdate {
    Unchanged,
    Stored,
    /// A stale hint was discarded (and replaced when a profile exists).
    Invalidated,
}

pub struct RoleHintCache {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl RoleHintCache {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Cached hint, if one is stored and readable.
    pub fn load(&self) -> Option<RoleHint> {
        let raw = self.storage.get(&self.key)?;
        match serde_json::from_str(&raw) {
            Ok(hint) => Some(hint),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "discarding unreadable role hint");
                self.storage.remove(&self.key);
                None
            }
        }
    }

    /// Bring the hint in line with a freshly fetched profile.
    pub fn reconcile(&self, profile: Option<&Profile>) -> HintUpdate {
        let cached = self.load();
        let fresh = profile.map(RoleHint::from);

        match (cached, fresh) {
            (Some(cached), Some(fresh)) if cached == fresh => HintUpdate::Unchanged,
            (None, None) => HintUpdate::Unchanged,
            (None, Some(fresh)) => {
                self.store(&fresh);
                HintUpdate::Stored
            }
            (Some(cached), fresh) => {
                tracing::info!(
                    cached_role = %cached.role,
                    cached_tenant = %cached.tenant_id,
                    "role hint disagrees with fetched profile; invalidating"
                );
                self.invalidate();
                if let Some(fresh) = fresh {
                    self.store(&fresh);
                }
                HintUpdate::Invalidated
            }
        }
    }

    pub fn invalidate(&self) {
        self.storage.remove(&self.key);
    }

    fn store(&self, hint: &RoleHint) {
        match serde_json::to_string(hint) {
            Ok(raw) => self.storage.set(&self.key, raw),
            Err(err) => tracing::error!(error = %err, "failed to serialize role hint"),
        }
    }
}

impl core::fmt::Debug for RoleHintCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoleHintCache").field("key", &self.key).finish()
    }
}
