//! `sahara-auth` — session lifecycle and route gating for the staffing platform.
//!
//! Decoupled from any UI toolkit or HTTP stack: the identity provider, profile
//! lookup, navigation and local storage are reached through traits, with
//! in-memory implementations for tests and local development.

pub mod callback;
pub mod config;
pub mod gate;
pub mod navigation;
pub mod principal;
pub mod profile;
pub mod provider;
pub mod role_hint;
pub mod roles;
pub mod session;
pub mod storage;

pub use callback::{CallbackOutcome, resolve_callback};
pub use config::{GateConfig, GatePolicy, SessionConfig};
pub use gate::{GateDecision, Redirect, RedirectReason, RequestedLocation, RouteGate, RouteGuard};
pub use navigation::{Navigation, Navigator, RecordingNavigator};
pub use principal::{Identity, Session};
pub use profile::{Profile, ProfileStatus};
pub use provider::{
    AuthEvent, AuthEventKind, IdentityProvider, ProfileSource, ProviderError, ProvisionRequest, SignOutScope,
};
pub use role_hint::RoleHint;
pub use roles::Role;
pub use session::{SessionDeps, SessionError, SessionManager, SessionPhase, SessionSnapshot, SessionTask};
pub use storage::{AuthNamespace, InMemoryStorage, KeyValueStorage};
