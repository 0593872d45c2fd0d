use core::str::FromStr;

use serde::{Deserialize, Serialize};

use sahara_core::{DomainError, DomainResult};

/// Job-function role held by a profile.
///
/// Closed set: the data store enforces the same enumeration, so an unknown
/// role name is a validation failure rather than an opaque string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ClientAdmin,
    Approver,
    Ops,
    Recruiter,
    Finance,
    Talent,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::ClientAdmin,
        Role::Approver,
        Role::Ops,
        Role::Recruiter,
        Role::Finance,
        Role::Talent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ClientAdmin => "client_admin",
            Role::Approver => "approver",
            Role::Ops => "ops",
            Role::Recruiter => "recruiter",
            Role::Finance => "finance",
            Role::Talent => "talent",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(matches!("admin".parse::<Role>(), Err(DomainError::Validation(_))));
        assert!("Recruiter".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Role::ClientAdmin).unwrap();
        assert_eq!(json, "\"client_admin\"");
        let role: Role = serde_json::from_str("\"finance\"").unwrap();
        assert_eq!(role, Role::Finance);
    }
}
