//! Boundary contracts for the identity provider and the profile lookup.
//!
//! Both are external services reached over the network; the session manager
//! only sees these traits. In-memory implementations are provided for tests
//! and local development.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sahara_events::{EventBus, InMemoryEventBus, Subscription};

use sahara_core::{ProfileId, TenantId};

use crate::{Identity, Profile, Role, Session};

/// Failure reported by a provider call.
///
/// "No profile yet" is *not* an error; see [`ProfileSource::fetch_my_profile`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Unavailable(String),

    #[error("provider rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Kind of identity-provider notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    /// Current session as known when the listener attached.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// Notification pushed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    pub fn initial(session: Option<Session>) -> Self {
        Self::new(AuthEventKind::InitialSession, session)
    }

    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }
}

/// Scope of a sign-out request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignOutScope {
    /// Revoke every session of the identity, on every device.
    Global,
    /// Forget the session on this client only.
    Local,
}

/// Identity provider as seen by the client.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Start receiving auth notifications. Dropping the subscription ends it.
    fn subscribe(&self) -> Subscription<AuthEvent>;

    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Identity behind the current credential, revalidated with the provider.
    async fn get_user(&self) -> Result<Option<Identity>, ProviderError>;

    async fn sign_in_with_password(&self, address: &str, password: &str) -> Result<Session, ProviderError>;

    async fn sign_out(&self, scope: SignOutScope) -> Result<(), ProviderError>;

    async fn request_password_reset(
        &self,
        address: &str,
        redirect_to: &str,
    ) -> Result<(), ProviderError>;
}

/// "Get my profile" lookup against the data store.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Zero or one profile row for `identity`.
    ///
    /// `Ok(None)` means the identity is authenticated but not provisioned yet.
    async fn fetch_my_profile(&self, identity: &Identity) -> Result<Option<Profile>, ProviderError>;

    /// Create the profile row for `identity` if it has none. Idempotent.
    async fn ensure_profile(&self, identity: &Identity, request: &ProvisionRequest) -> Result<(), ProviderError>;
}

/// What a first-time identity is provisioned as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub full_name: Option<String>,
    pub default_role: Role,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Password-reset request recorded by [`InMemoryIdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
    pub address: String,
    pub redirect_to: String,
}

/// In-memory identity provider for tests/dev.
///
/// Notifications go through an [`InMemoryEventBus`], so they are buffered
/// per subscriber exactly like a real provider's callback queue would be.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    bus: InMemoryEventBus<AuthEvent>,
    current: Mutex<Option<Session>>,
    during_session_query: Mutex<Vec<AuthEvent>>,
    fail_sign_out: AtomicBool,
    fail_session_query: AtomicBool,
    fail_user_query: AtomicBool,
    accounts: Mutex<Vec<(String, String, Session)>>,
    sign_outs: Mutex<Vec<SignOutScope>>,
    resets: Mutex<Vec<ResetRequest>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that already holds a session when the client starts.
    pub fn with_session(session: Session) -> Self {
        let provider = Self::default();
        *lock(&provider.current) = Some(session);
        provider
    }

    /// Register credentials accepted by `sign_in_with_password`.
    pub fn with_account(self, address: impl Into<String>, password: impl Into<String>, session: Session) -> Self {
        lock(&self.accounts).push((address.into(), password.into(), session));
        self
    }

    /// Simulate an interactive sign-in.
    pub fn sign_in(&self, session: Session) {
        *lock(&self.current) = Some(session.clone());
        self.emit(AuthEvent::signed_in(session));
    }

    /// Simulate the provider ending the session (expiry, remote revoke).
    pub fn end_session(&self) {
        *lock(&self.current) = None;
        self.emit(AuthEvent::signed_out());
    }

    /// Publish an arbitrary notification to every subscriber.
    pub fn emit(&self, event: AuthEvent) {
        if let Err(err) = self.bus.publish(event) {
            tracing::error!("failed to publish auth event: {err:?}");
        }
    }

    /// Queue notifications to be published while `current_session` runs.
    ///
    /// The query itself still answers with the session held before the call,
    /// which is the race a real provider exhibits.
    pub fn emit_during_session_query(&self, event: AuthEvent) {
        lock(&self.during_session_query).push(event);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn fail_session_query(&self, fail: bool) {
        self.fail_session_query.store(fail, Ordering::SeqCst);
    }

    pub fn fail_user_query(&self, fail: bool) {
        self.fail_user_query.store(fail, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    pub fn sign_out_calls(&self) -> Vec<SignOutScope> {
        lock(&self.sign_outs).clone()
    }

    pub fn reset_requests(&self) -> Vec<ResetRequest> {
        lock(&self.resets).clone()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn subscribe(&self) -> Subscription<AuthEvent> {
        self.bus.subscribe()
    }

    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        let pending: Vec<AuthEvent> = lock(&self.during_session_query).drain(..).collect();
        for event in pending {
            self.emit(event);
        }

        if self.fail_session_query.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("session query failed".to_string()));
        }
        Ok(lock(&self.current).clone())
    }

    async fn get_user(&self) -> Result<Option<Identity>, ProviderError> {
        if self.fail_user_query.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("user endpoint returned 500").into());
        }
        Ok(lock(&self.current).as_ref().map(|session| session.identity().clone()))
    }

    async fn sign_in_with_password(&self, address: &str, password: &str) -> Result<Session, ProviderError> {
        let session = lock(&self.accounts)
            .iter()
            .find(|(a, p, _)| a.eq_ignore_ascii_case(address) && p == password)
            .map(|(_, _, session)| session.clone())
            .ok_or_else(|| ProviderError::Rejected("invalid login credentials".to_string()))?;
        self.sign_in(session.clone());
        Ok(session)
    }

    async fn sign_out(&self, scope: SignOutScope) -> Result<(), ProviderError> {
        lock(&self.sign_outs).push(scope);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("revoke endpoint unreachable".to_string()));
        }
        let had_session = lock(&self.current).take().is_some();
        if had_session {
            self.emit(AuthEvent::signed_out());
        }
        Ok(())
    }

    async fn request_password_reset(
        &self,
        address: &str,
        redirect_to: &str,
    ) -> Result<(), ProviderError> {
        lock(&self.resets).push(ResetRequest {
            address: address.to_string(),
            redirect_to: redirect_to.to_string(),
        });
        Ok(())
    }
}

/// Scripted answer for [`StaticProfileSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileAnswer {
    Found(Profile),
    NotProvisioned,
    Failure(String),
}

/// Profile source returning a fixed, swappable answer.
#[derive(Debug)]
pub struct StaticProfileSource {
    answer: Mutex<ProfileAnswer>,
    calls: Mutex<usize>,
    provision_tenant: Mutex<Option<TenantId>>,
    provisions: Mutex<Vec<ProvisionRequest>>,
}

impl StaticProfileSource {
    pub fn new(answer: ProfileAnswer) -> Self {
        Self {
            answer: Mutex::new(answer),
            calls: Mutex::new(0),
            provision_tenant: Mutex::new(None),
            provisions: Mutex::new(Vec::new()),
        }
    }

    /// Let `ensure_profile` create missing profiles in `tenant`.
    pub fn provision_into(&self, tenant: TenantId) {
        *lock(&self.provision_tenant) = Some(tenant);
    }

    pub fn provision_requests(&self) -> Vec<ProvisionRequest> {
        lock(&self.provisions).clone()
    }

    pub fn set_answer(&self, answer: ProfileAnswer) {
        *lock(&self.answer) = answer;
    }

    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }
}

impl Default for StaticProfileSource {
    fn default() -> Self {
        Self::new(ProfileAnswer::NotProvisioned)
    }
}

#[async_trait]
impl ProfileSource for StaticProfileSource {
    async fn fetch_my_profile(&self, identity: &Identity) -> Result<Option<Profile>, ProviderError> {
        *lock(&self.calls) += 1;
        match lock(&self.answer).clone() {
            ProfileAnswer::Found(profile) if profile.identity_id == identity.id => Ok(Some(profile)),
            ProfileAnswer::Found(_) | ProfileAnswer::NotProvisioned => Ok(None),
            ProfileAnswer::Failure(msg) => Err(ProviderError::Unavailable(msg)),
        }
    }

    async fn ensure_profile(&self, identity: &Identity, request: &ProvisionRequest) -> Result<(), ProviderError> {
        lock(&self.provisions).push(request.clone());
        let mut answer = lock(&self.answer);
        match &*answer {
            ProfileAnswer::Failure(msg) => Err(ProviderError::Unavailable(msg.clone())),
            ProfileAnswer::Found(profile) if profile.identity_id == identity.id => Ok(()),
            _ => {
                if let Some(tenant) = *lock(&self.provision_tenant) {
                    let mut profile = Profile::new(ProfileId::new(), identity.id, tenant, request.default_role);
                    profile.email = identity.email.clone();
                    *answer = ProfileAnswer::Found(profile);
                }
                Ok(())
            }
        }
    }
}
