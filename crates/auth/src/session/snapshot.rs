use serde::Serialize;

use sahara_core::TenantId;

use crate::{Identity, Profile, Role, Session};

/// Coarse lifecycle phase derived from the snapshot fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// First reconciliation has not completed.
    Initializing,
    Anonymous,
    /// Signed in, no profile provisioned yet.
    Unprovisioned,
    Active,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Initializing => "initializing",
            SessionPhase::Anonymous => "anonymous",
            SessionPhase::Unprovisioned => "unprovisioned",
            SessionPhase::Active => "active",
        }
    }
}

impl core::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the session state.
///
/// # Invariants
/// - `role`, `tenant_id` and `is_staff` are derived from `profile` in the same
///   assignment that sets it; there is no way to set them independently.
/// - A profile is only kept while an identity with the same id is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    identity: Option<Identity>,
    session: Option<Session>,
    profile: Option<Profile>,
    role: Option<Role>,
    tenant_id: Option<TenantId>,
    is_staff: bool,
    is_loading: bool,
}

impl SessionSnapshot {
    /// State before the first reconciliation.
    pub fn initializing() -> Self {
        Self {
            identity: None,
            session: None,
            profile: None,
            role: None,
            tenant_id: None,
            is_staff: false,
            is_loading: true,
        }
    }

    /// Reconciled state with no one signed in.
    pub fn anonymous() -> Self {
        Self {
            is_loading: false,
            ..Self::initializing()
        }
    }

    /// Reconciled state for a session and (optionally) its profile.
    ///
    /// A profile owned by a different identity, or without a session, is ignored.
    pub fn resolved(session: Option<Session>, profile: Option<Profile>) -> Self {
        let mut snapshot = Self::anonymous();
        snapshot.apply_session(session);
        snapshot.apply_profile(profile);
        snapshot
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.is_loading, &self.identity, &self.profile) {
            (true, _, _) => SessionPhase::Initializing,
            (false, None, _) => SessionPhase::Anonymous,
            (false, Some(_), None) => SessionPhase::Unprovisioned,
            (false, Some(_), Some(_)) => SessionPhase::Active,
        }
    }

    /// Staff pass every role check; otherwise the role must be in `allowed`.
    pub fn check_role(&self, allowed: &[Role]) -> bool {
        if self.is_staff {
            return true;
        }
        match self.role {
            Some(role) => allowed.contains(&role),
            None => false,
        }
    }

    pub(crate) fn apply_session(&mut self, session: Option<Session>) {
        self.identity = session.as_ref().map(|s| s.identity().clone());
        self.session = session;
        self.is_loading = false;

        let profile_still_owned = match (&self.identity, &self.profile) {
            (Some(identity), Some(profile)) => profile.identity_id == identity.id,
            _ => false,
        };
        if !profile_still_owned {
            self.clear_profile();
        }
    }

    pub(crate) fn apply_profile(&mut self, profile: Option<Profile>) {
        let owned = match (&self.identity, &profile) {
            (Some(identity), Some(p)) => p.identity_id == identity.id,
            _ => false,
        };
        let profile = if owned { profile } else { None };

        self.role = profile.as_ref().map(|p| p.role);
        self.tenant_id = profile.as_ref().map(|p| p.tenant_id());
        self.is_staff = profile.as_ref().is_some_and(|p| p.is_staff);
        self.profile = profile;
        self.is_loading = false;
    }

    fn clear_profile(&mut self) {
        self.profile = None;
        self.role = None;
        self.tenant_id = None;
        self.is_staff = false;
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initializing()
    }
}

#[cfg(test)]
mod tests {
    use sahara_core::{IdentityId, ProfileId};

    use super::*;

    fn session() -> Session {
        Session::new(Identity::new(IdentityId::new()).with_email("a@example.com"), "tok")
    }

    fn profile_for(session: &Session, role: Role) -> Profile {
        Profile::new(ProfileId::new(), session.identity().id, TenantId::new(), role)
    }

    #[test]
    fn phases_follow_fields() {
        assert_eq!(SessionSnapshot::initializing().phase(), SessionPhase::Initializing);
        assert_eq!(SessionSnapshot::anonymous().phase(), SessionPhase::Anonymous);

        let s = session();
        assert_eq!(
            SessionSnapshot::resolved(Some(s.clone()), None).phase(),
            SessionPhase::Unprovisioned
        );
        let p = profile_for(&s, Role::Talent);
        assert_eq!(SessionSnapshot::resolved(Some(s), Some(p)).phase(), SessionPhase::Active);
    }

    #[test]
    fn derived_fields_track_profile() {
        let s = session();
        let p = profile_for(&s, Role::Finance).with_staff(true);
        let snapshot = SessionSnapshot::resolved(Some(s), Some(p.clone()));

        assert_eq!(snapshot.role(), Some(Role::Finance));
        assert_eq!(snapshot.tenant_id(), Some(p.tenant_id()));
        assert!(snapshot.is_staff());
    }

    #[test]
    fn foreign_profile_is_ignored() {
        let s = session();
        let other = Profile::new(ProfileId::new(), IdentityId::new(), TenantId::new(), Role::Ops);
        let snapshot = SessionSnapshot::resolved(Some(s), Some(other));

        assert!(snapshot.profile().is_none());
        assert_eq!(snapshot.role(), None);
    }

    #[test]
    fn new_identity_drops_previous_profile() {
        let first = session();
        let mut snapshot =
            SessionSnapshot::resolved(Some(first.clone()), Some(profile_for(&first, Role::Ops)));

        snapshot.apply_session(Some(session()));

        assert_eq!(snapshot.phase(), SessionPhase::Unprovisioned);
        assert!(!snapshot.is_staff());
    }

    #[test]
    fn token_refresh_for_same_identity_keeps_profile() {
        let s = session();
        let mut snapshot = SessionSnapshot::resolved(Some(s.clone()), Some(profile_for(&s, Role::Ops)));

        let refreshed = Session::new(s.identity().clone(), "tok-2");
        snapshot.apply_session(Some(refreshed));

        assert_eq!(snapshot.phase(), SessionPhase::Active);
        assert_eq!(snapshot.session().map(Session::access_token), Some("tok-2"));
    }

    #[test]
    fn check_role_rules() {
        let s = session();
        let recruiter = SessionSnapshot::resolved(Some(s.clone()), Some(profile_for(&s, Role::Recruiter)));
        assert!(recruiter.check_role(&[Role::Ops, Role::Recruiter]));
        assert!(!recruiter.check_role(&[Role::Finance]));
        assert!(!recruiter.check_role(&[]));

        let staff_talent = SessionSnapshot::resolved(
            Some(s.clone()),
            Some(profile_for(&s, Role::Talent).with_staff(true)),
        );
        assert!(staff_talent.check_role(&[Role::Ops, Role::Recruiter]));

        let unprovisioned = SessionSnapshot::resolved(Some(s), None);
        assert!(!unprovisioned.check_role(&Role::ALL));
    }
}
