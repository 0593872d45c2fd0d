//! Route/content gate.
//!
//! Turns a [`SessionSnapshot`] and a route's [`RouteGuard`] into a
//! render-or-redirect decision. Redirects are one-shot navigation requests;
//! the gate never mutates session state.
//!
//! Decision order (first match wins):
//! 1. still loading → [`GateDecision::Loading`]
//! 2. no identity → sign-in, carrying the requested path+query as `next`
//! 3. no profile → pending-provisioning (only under
//!    [`GatePolicy::RoleAndProfileRequired`])
//! 4. non-empty allow-list and the role check fails → unauthorized
//! 5. render
//!
//! [`GatePolicy::AuthenticationOnly`] stops after step 2;
//! [`GatePolicy::RoleChecked`] skips step 3.

use serde::Serialize;
use tracing::info;

use crate::config::{GateConfig, GatePolicy};
use crate::navigation::Navigator;
use crate::session::SessionSnapshot;
use crate::Role;

/// Path and query string the visitor asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedLocation {
    path: String,
    query: String,
}

impl RequestedLocation {
    /// `query` may be given with or without its leading `?`.
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        let query: String = query.into();
        Self {
            path: path.into(),
            query: query.strip_prefix('?').unwrap_or(&query).to_string(),
        }
    }

    /// Split `"/missions?tab=open"` into path and query.
    pub fn parse(uri: &str) -> Self {
        match uri.split_once('?') {
            Some((path, query)) => Self::new(path, query),
            None => Self::new(uri, ""),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

/// Per-route gate declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    allowed_roles: Vec<Role>,
    fallback: Option<String>,
}

impl RouteGuard {
    /// Any signed-in (and, by default policy, provisioned) visitor.
    pub fn signed_in() -> Self {
        Self::default()
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: roles.into_iter().collect(),
            fallback: None,
        }
    }

    /// Send anonymous visitors here instead of the sign-in page.
    pub fn with_fallback(mut self, target: impl Into<String>) -> Self {
        self.fallback = Some(target.into());
        self
    }

    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed_roles
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    SignInRequired,
    PendingProvisioning,
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub reason: RedirectReason,
    /// Replace the current history entry rather than pushing a new one.
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session not reconciled yet; show a placeholder and decide later.
    Loading,
    Render,
    Redirect(Redirect),
}

impl GateDecision {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GateDecision::Redirect(redirect) => Some(&redirect.target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteGate {
    config: GateConfig,
}

impl RouteGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn decide(
        &self,
        snapshot: &SessionSnapshot,
        guard: &RouteGuard,
        requested: &RequestedLocation,
    ) -> GateDecision {
        if snapshot.is_loading() {
            return GateDecision::Loading;
        }

        if snapshot.identity().is_none() {
            return redirect(self.sign_in_target(guard, requested), RedirectReason::SignInRequired);
        }

        if self.config.policy == GatePolicy::AuthenticationOnly {
            return GateDecision::Render;
        }

        if self.config.policy == GatePolicy::RoleAndProfileRequired && snapshot.profile().is_none() {
            return redirect(self.config.pending_path.clone(), RedirectReason::PendingProvisioning);
        }

        if !guard.allowed_roles.is_empty() && !snapshot.check_role(&guard.allowed_roles) {
            return redirect(self.config.unauthorized_path.clone(), RedirectReason::Unauthorized);
        }

        GateDecision::Render
    }

    /// Decide, and perform the redirect if there is one.
    pub fn enforce(
        &self,
        snapshot: &SessionSnapshot,
        guard: &RouteGuard,
        requested: &RequestedLocation,
        navigator: &dyn Navigator,
    ) -> GateDecision {
        let decision = self.decide(snapshot, guard, requested);
        if let GateDecision::Redirect(redirect) = &decision {
            info!(
                requested = %requested.path(),
                destination = %redirect.target,
                reason = ?redirect.reason,
                phase = %snapshot.phase(),
                "route gate redirect"
            );
            navigator.navigate(&redirect.target, redirect.replace);
        }
        decision
    }

    fn sign_in_target(&self, guard: &RouteGuard, requested: &RequestedLocation) -> String {
        match guard.fallback() {
            Some(fallback) if fallback != self.config.sign_in_path => fallback.to_string(),
            _ => sign_in_url(&self.config.sign_in_path, &requested.path_and_query()),
        }
    }
}

fn redirect(target: String, reason: RedirectReason) -> GateDecision {
    GateDecision::Redirect(Redirect {
        target,
        reason,
        replace: true,
    })
}

/// Sign-in URL that sends the visitor back to `next` afterwards.
pub fn sign_in_url(sign_in_path: &str, next: &str) -> String {
    let separator = if sign_in_path.contains('?') { '&' } else { '?' };
    format!("{sign_in_path}{separator}next={}", urlencoding::encode(next))
}

/// Recover the post-sign-in destination from a query string.
///
/// Only same-origin relative paths are honoured; anything else (absolute or
/// protocol-relative URLs, undecodable input) falls back to `/`.
pub fn next_target_from_query(query: &str) -> String {
    query_param(query, "next")
        .filter(|next| is_local_path(next))
        .unwrap_or_else(|| "/".to_string())
}

pub(crate) fn query_param(query: &str, key: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(k, _)| *k == key)
        .and_then(|(_, value)| {
            let value = value.replace('+', " ");
            urlencoding::decode(&value).ok().map(|v| v.into_owned())
        })
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

#[cfg(test)]
mod tests {
    use sahara_core::{IdentityId, ProfileId, TenantId};

    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::{Identity, Profile, Session};

    fn session() -> Session {
        Session::new(Identity::new(IdentityId::new()), "tok")
    }

    fn active(role: Role, staff: bool) -> SessionSnapshot {
        let s = session();
        let p = Profile::new(ProfileId::new(), s.identity().id, TenantId::new(), role).with_staff(staff);
        SessionSnapshot::resolved(Some(s), Some(p))
    }

    fn unprovisioned() -> SessionSnapshot {
        SessionSnapshot::resolved(Some(session()), None)
    }

    fn missions() -> RequestedLocation {
        RequestedLocation::parse("/missions?status=open&page=2")
    }

    fn ops_or_recruiter() -> RouteGuard {
        RouteGuard::roles([Role::Ops, Role::Recruiter])
    }

    #[test]
    fn loading_decides_nothing() {
        let gate = RouteGate::default();
        let decision = gate.decide(&SessionSnapshot::initializing(), &ops_or_recruiter(), &missions());
        assert_eq!(decision, GateDecision::Loading);
    }

    #[test]
    fn anonymous_visit_redirects_to_sign_in_with_recoverable_next() {
        let gate = RouteGate::default();
        let decision = gate.decide(&SessionSnapshot::anonymous(), &ops_or_recruiter(), &missions());

        let GateDecision::Redirect(redirect) = decision else {
            panic!("expected redirect");
        };
        assert_eq!(redirect.reason, RedirectReason::SignInRequired);
        assert_eq!(redirect.target, "/login?next=%2Fmissions%3Fstatus%3Dopen%26page%3D2");

        let (_, query) = redirect.target.split_once('?').unwrap();
        assert_eq!(next_target_from_query(query), "/missions?status=open&page=2");
    }

    #[test]
    fn custom_fallback_is_used_verbatim() {
        let gate = RouteGate::default();
        let guard = RouteGuard::signed_in().with_fallback("/jobs");
        let decision = gate.decide(&SessionSnapshot::anonymous(), &guard, &missions());
        assert_eq!(decision.redirect_target(), Some("/jobs"));

        let guard = RouteGuard::signed_in().with_fallback("/login");
        let decision = gate.decide(&SessionSnapshot::anonymous(), &guard, &missions());
        assert!(decision.redirect_target().unwrap().starts_with("/login?next="));
    }

    #[test]
    fn unprovisioned_goes_to_pending_even_without_role_restriction() {
        let gate = RouteGate::default();
        let decision = gate.decide(&unprovisioned(), &RouteGuard::signed_in(), &missions());

        let GateDecision::Redirect(redirect) = decision else {
            panic!("expected redirect");
        };
        assert_eq!(redirect.reason, RedirectReason::PendingProvisioning);
        assert_eq!(redirect.target, "/pending-approval");
    }

    #[test]
    fn staff_talent_passes_ops_recruiter_guard() {
        let gate = RouteGate::default();
        let decision = gate.decide(&active(Role::Talent, true), &ops_or_recruiter(), &missions());
        assert_eq!(decision, GateDecision::Render);
    }

    #[test]
    fn wrong_role_is_unauthorized() {
        let gate = RouteGate::default();
        let decision = gate.decide(&active(Role::Talent, false), &ops_or_recruiter(), &missions());
        assert_eq!(decision.redirect_target(), Some("/unauthorized"));
    }

    #[test]
    fn empty_allow_list_renders_for_any_role() {
        let gate = RouteGate::default();
        let decision = gate.decide(&active(Role::Finance, false), &RouteGuard::signed_in(), &missions());
        assert_eq!(decision, GateDecision::Render);
    }

    #[test]
    fn authentication_only_policy_ignores_roles_and_profile() {
        let gate = RouteGate::new(GateConfig::default().with_policy(GatePolicy::AuthenticationOnly));
        assert_eq!(gate.decide(&unprovisioned(), &ops_or_recruiter(), &missions()), GateDecision::Render);
        assert_eq!(
            gate.decide(&active(Role::Talent, false), &ops_or_recruiter(), &missions()),
            GateDecision::Render
        );
    }

    #[test]
    fn role_checked_policy_skips_profile_requirement() {
        let gate = RouteGate::new(GateConfig::default().with_policy(GatePolicy::RoleChecked));
        assert_eq!(gate.decide(&unprovisioned(), &RouteGuard::signed_in(), &missions()), GateDecision::Render);
        assert_eq!(
            gate.decide(&unprovisioned(), &ops_or_recruiter(), &missions()).redirect_target(),
            Some("/unauthorized")
        );
    }

    #[test]
    fn enforce_navigates_once_with_replace() {
        let gate = RouteGate::default();
        let navigator = RecordingNavigator::new();

        gate.enforce(&SessionSnapshot::anonymous(), &ops_or_recruiter(), &missions(), &navigator);
        gate.enforce(&active(Role::Ops, false), &ops_or_recruiter(), &missions(), &navigator);

        let visits = navigator.visits();
        assert_eq!(visits.len(), 1);
        assert!(visits[0].replace);
    }

    #[test]
    fn next_target_rejects_foreign_destinations() {
        assert_eq!(next_target_from_query("next=https%3A%2F%2Fevil.example"), "/");
        assert_eq!(next_target_from_query("next=%2F%2Fevil.example"), "/");
        assert_eq!(next_target_from_query("other=1"), "/");
        assert_eq!(next_target_from_query("?next=%2Fpassport"), "/passport");
    }

    #[test]
    fn sign_in_url_appends_to_existing_query() {
        assert_eq!(sign_in_url("/login?lang=fr", "/rfq"), "/login?lang=fr&next=%2Frfq");
    }
}
