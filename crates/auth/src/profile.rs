//! Provisioned application profile.

use serde::{Deserialize, Serialize};

use sahara_core::{IdentityId, ProfileId, TenantId};

use crate::Role;

/// Lifecycle status of a profile as reported by the data store.
///
/// Unknown values are preserved rather than rejected so that a new server-side
/// status never breaks profile loading.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProfileStatus {
    #[default]
    Active,
    Pending,
    Suspended,
    Other(String),
}

impl ProfileStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Pending => "pending",
            ProfileStatus::Suspended => "suspended",
            ProfileStatus::Other(other) => other,
        }
    }
}

impl From<String> for ProfileStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => ProfileStatus::Active,
            "pending" => ProfileStatus::Pending,
            "suspended" => ProfileStatus::Suspended,
            _ => ProfileStatus::Other(value),
        }
    }
}

impl From<ProfileStatus> for String {
    fn from(value: ProfileStatus) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application record for an identity.
///
/// # Invariants
/// - A profile belongs to exactly one tenant; `tenant_id` has no setter.
/// - Exactly one [`Role`] per profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(rename = "user_id")]
    pub identity_id: IdentityId,
    tenant_id: TenantId,
    pub role: Role,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub status: ProfileStatus,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub tenant_slug: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Profile {
    pub fn new(id: ProfileId, identity_id: IdentityId, tenant_id: TenantId, role: Role) -> Self {
        Self {
            id,
            identity_id,
            tenant_id,
            role,
            is_staff: false,
            status: ProfileStatus::Active,
            first_name: None,
            last_name: None,
            phone: None,
            department: None,
            tenant_name: None,
            tenant_slug: None,
            email: None,
        }
    }

    pub fn with_staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    pub fn with_status(mut self, status: ProfileStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// "First Last", falling back to whichever part exists, then the email.
    pub fn display_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => self.email.clone(),
        }
    }
}
