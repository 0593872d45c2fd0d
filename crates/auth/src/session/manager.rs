//! Session lifecycle manager.
//!
//! Owns the only mutable session state on the client and reconciles it from
//! identity-provider notifications. Built once at the composition root and
//! passed around by reference; there is no global instance.
//!
//! ## Event handling and the task queue
//!
//! Notifications are buffered in a [`Subscription`] and applied by
//! [`SessionManager::pump`]. Applying a notification never awaits: follow-up
//! work that needs IO (the profile fetch after a sign-in) is posted as a
//! [`SessionTask`] and only run once the whole batch of notifications has
//! been applied. The provider's delivery path is therefore never re-entered
//! from inside one of its own callbacks.
//!
//! ## Concurrency
//!
//! All methods take `&self` and are meant to be driven from one logical
//! thread. Locks are never held across an `.await`. Overlapping
//! [`SessionManager::refresh_profile`] calls are not cancelled; whichever
//! resolves last wins.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use sahara_events::Subscription;

use crate::callback::{CallbackOutcome, resolve_callback};
use crate::config::SessionConfig;
use crate::gate::sign_in_url;
use crate::navigation::Navigator;
use crate::provider::{
    AuthEvent, AuthEventKind, IdentityProvider, ProfileSource, ProviderError, ProvisionRequest, SignOutScope,
};
use crate::role_hint::{RoleHint, RoleHintCache};
use crate::storage::{AuthNamespace, KeyValueStorage, purge_namespace};
use crate::{Profile, Role, Session};

use super::snapshot::SessionSnapshot;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session manager already initialized")]
    AlreadyInitialized,

    #[error("invalid contact address: {0:?}")]
    InvalidAddress(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Deferred work posted by event handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTask {
    RefreshProfile,
}

/// External collaborators of the session manager.
pub struct SessionDeps {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileSource>,
    pub navigator: Arc<dyn Navigator>,
    /// Short-lived storage area.
    pub session_storage: Arc<dyn KeyValueStorage>,
    /// Storage area that survives restarts.
    pub durable_storage: Arc<dyn KeyValueStorage>,
}

pub struct SessionManager {
    config: SessionConfig,
    namespace: AuthNamespace,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileSource>,
    navigator: Arc<dyn Navigator>,
    session_storage: Arc<dyn KeyValueStorage>,
    durable_storage: Arc<dyn KeyValueStorage>,
    hints: RoleHintCache,
    state: RwLock<SessionSnapshot>,
    tasks: Mutex<VecDeque<SessionTask>>,
    subscription: Mutex<Option<Subscription<AuthEvent>>>,
    initialized: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionManager {
    pub fn new(config: SessionConfig, deps: SessionDeps) -> Self {
        let namespace = config.auth_namespace();
        let hints = RoleHintCache::new(deps.durable_storage.clone(), config.role_hint_key.clone());
        Self {
            config,
            namespace,
            identity: deps.identity,
            profiles: deps.profiles,
            navigator: deps.navigator,
            session_storage: deps.session_storage,
            durable_storage: deps.durable_storage,
            hints,
            state: RwLock::new(SessionSnapshot::initializing()),
            tasks: Mutex::new(VecDeque::new()),
            subscription: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Attach to the identity provider and perform the first reconciliation.
    ///
    /// The subscription is established before the current session is queried,
    /// so notifications emitted during the query are buffered and applied
    /// right after it.
    pub async fn init(&self) -> Result<(), SessionError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyInitialized);
        }

        let subscription = self.identity.subscribe();
        *lock(&self.subscription) = Some(subscription);

        let session = match self.identity.current_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "current session query failed; starting anonymous");
                None
            }
        };

        self.on_identity_event(AuthEvent::initial(session));
        self.pump().await;

        info!(phase = %self.snapshot().phase(), "session manager initialized");
        Ok(())
    }

    /// Detach from the identity provider. Later `pump` calls see no events.
    pub fn teardown(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
        }
        lock(&self.tasks).clear();
        debug!("session manager torn down");
    }

    /// Current state (read-only copy).
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read_state().clone()
    }

    /// Role hint persisted from an earlier run, if any.
    pub fn role_hint(&self) -> Option<RoleHint> {
        self.hints.load()
    }

    /// Apply one identity-provider notification.
    ///
    /// Synchronous: session and identity are updated immediately. A sign-in
    /// posts [`SessionTask::RefreshProfile`] instead of fetching inline; a
    /// sign-out clears the profile and local auth storage.
    pub fn on_identity_event(&self, event: AuthEvent) {
        let AuthEvent { kind, session } = event;
        let has_session = session.is_some();

        let phase = {
            let mut state = self.write_state();
            state.apply_session(session);
            state.phase()
        };
        debug!(kind = ?kind, phase = %phase, "identity event applied");

        match kind {
            AuthEventKind::SignedIn | AuthEventKind::InitialSession if has_session => {
                self.post(SessionTask::RefreshProfile);
            }
            AuthEventKind::SignedOut => {
                self.cleanup_auth_state();
            }
            _ => {}
        }
    }

    /// Apply every buffered notification, then run the tasks they posted.
    ///
    /// Returns the number of notifications applied.
    pub async fn pump(&self) -> usize {
        let events = match lock(&self.subscription).as_ref() {
            Some(subscription) => subscription.drain(),
            None => Vec::new(),
        };

        let applied = events.len();
        for event in events {
            self.on_identity_event(event);
        }
        self.run_pending_tasks().await;
        applied
    }

    /// Run queued tasks until the queue is empty.
    pub async fn run_pending_tasks(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.next_task() {
            match task {
                SessionTask::RefreshProfile => self.refresh_profile().await,
            }
            ran += 1;
        }
        ran
    }

    /// Tasks waiting to run, oldest first.
    pub fn pending_tasks(&self) -> Vec<SessionTask> {
        lock(&self.tasks).iter().copied().collect()
    }

    /// Fetch the profile for the current identity.
    ///
    /// A missing row leaves the session unprovisioned. A failed fetch is
    /// logged and leaves the previous profile state untouched. A result that
    /// arrives after the identity changed is discarded.
    pub async fn refresh_profile(&self) {
        let Some(identity) = self.read_state().identity().cloned() else {
            debug!("profile refresh skipped: no identity");
            return;
        };

        match self.profiles.fetch_my_profile(&identity).await {
            Ok(profile) => {
                let current = self.read_state().identity().map(|i| i.id);
                if current != Some(identity.id) {
                    debug!(identity_id = %identity.id, "discarding profile for a stale identity");
                    return;
                }
                if profile.is_none() {
                    info!(identity_id = %identity.id, "identity has no profile yet");
                }
                self.set_profile(profile);
            }
            Err(err) => {
                warn!(
                    identity_id = %identity.id,
                    error = %err,
                    "profile refresh failed; keeping previous profile state"
                );
            }
        }
    }

    /// Replace the profile; role, tenant and staff flag follow in the same write.
    pub fn set_profile(&self, profile: Option<Profile>) {
        let (phase, stored) = {
            let mut state = self.write_state();
            state.apply_profile(profile);
            (state.phase(), state.profile().cloned())
        };

        let hint = self.hints.reconcile(stored.as_ref());
        info!(
            phase = %phase,
            role = stored.as_ref().map(|p| p.role.as_str()).unwrap_or("none"),
            tenant_id = ?stored.as_ref().map(|p| p.tenant_id()),
            hint = ?hint,
            "profile updated"
        );
    }

    pub fn check_role(&self, allowed: &[Role]) -> bool {
        self.read_state().check_role(allowed)
    }

    /// Sign out locally, ask the provider to revoke globally, go to sign-in.
    ///
    /// Local cleanup happens first and the navigation always happens; a failed
    /// revoke is only logged.
    pub async fn sign_out(&self) {
        self.cleanup_auth_state();

        if let Err(err) = self.identity.sign_out(SignOutScope::Global).await {
            warn!(error = %err, "global sign-out failed; local session already cleared");
        }

        self.navigator.navigate(&self.config.sign_in_path, true);
    }

    /// Interactive password sign-in.
    ///
    /// Leftover auth state is cleared and a global revoke attempted (failure
    /// only logged) before the credentials are submitted. On success the
    /// visitor is sent to the post-sign-in page; session state follows from
    /// the provider's `SignedIn` notification on the next `pump`.
    pub async fn sign_in(&self, address: &str, password: &str) -> Result<Session, SessionError> {
        let address = contact_address(address)?;

        self.cleanup_auth_state();
        if let Err(err) = self.identity.sign_out(SignOutScope::Global).await {
            warn!(error = %err, "pre-sign-in global sign-out failed; continuing");
        }

        let session = self.identity.sign_in_with_password(address, password).await?;
        info!(identity_id = %session.identity().id, "password sign-in succeeded");
        self.navigator.navigate(&self.config.post_sign_in_path, false);
        Ok(session)
    }

    /// Finish a magic-link or OAuth redirect.
    ///
    /// A fragment error, or no verifiable user, sends the visitor back to
    /// sign-in with `next` preserved. Otherwise the identity is provisioned
    /// (a failure is only logged), the profile reloaded, and the visitor sent
    /// to `next`. Every outcome navigates with `replace`.
    pub async fn complete_callback(&self, fragment: &str, query: &str) -> CallbackOutcome {
        let next = match resolve_callback(fragment, query, &self.config.sign_in_path) {
            CallbackOutcome::Proceed { next } => next,
            rejected => {
                self.navigator.navigate(rejected.destination(), true);
                return rejected;
            }
        };

        let identity = match self.identity.get_user().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                info!("auth callback without a signed-in user");
                return self.callback_retry(&next);
            }
            Err(err) => {
                warn!(error = %err, "auth callback user check failed");
                return self.callback_retry(&next);
            }
        };

        let request = ProvisionRequest {
            full_name: identity.email.clone(),
            default_role: self.config.default_role,
        };
        if let Err(err) = self.profiles.ensure_profile(&identity, &request).await {
            warn!(identity_id = %identity.id, error = %err, "profile provisioning failed");
        }

        self.pump().await;
        let needs_refresh = self.read_state().profile().is_none();
        if needs_refresh {
            self.refresh_profile().await;
        }

        info!(identity_id = %identity.id, destination = %next, "auth callback completed");
        self.navigator.navigate(&next, true);
        CallbackOutcome::Proceed { next }
    }

    /// Ask the provider to email a password-reset link to `address`.
    pub async fn request_password_reset(&self, address: &str) -> Result<(), SessionError> {
        let address = contact_address(address)?;

        self.identity
            .request_password_reset(address, &self.config.password_reset_redirect)
            .await?;
        info!("password reset requested");
        Ok(())
    }

    /// Drop every trace of the current session from local state and storage.
    ///
    /// Idempotent. Returns the number of storage keys removed.
    pub fn cleanup_auth_state(&self) -> usize {
        let removed = purge_namespace(self.session_storage.as_ref(), &self.namespace)
            + purge_namespace(self.durable_storage.as_ref(), &self.namespace);
        self.hints.invalidate();
        lock(&self.tasks).clear();
        *self.write_state() = SessionSnapshot::anonymous();

        debug!(removed, "auth state cleaned up");
        removed
    }

    fn callback_retry(&self, next: &str) -> CallbackOutcome {
        let retry = sign_in_url(&self.config.sign_in_path, next);
        self.navigator.navigate(&retry, true);
        CallbackOutcome::SignInRequired { retry }
    }

    fn post(&self, task: SessionTask) {
        let mut tasks = lock(&self.tasks);
        if !tasks.contains(&task) {
            tasks.push_back(task);
        }
    }

    fn next_task(&self) -> Option<SessionTask> {
        lock(&self.tasks).pop_front()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionSnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionSnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn contact_address(raw: &str) -> Result<&str, SessionError> {
    let address = raw.trim();
    if address.is_empty() || !address.contains('@') {
        return Err(SessionError::InvalidAddress(address.to_string()));
    }
    Ok(address)
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
        }
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("state", &*self.read_state())
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}
