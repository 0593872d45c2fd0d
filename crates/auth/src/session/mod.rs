//! Session lifecycle: who is acting, as which role, in which tenant.

pub mod manager;
pub mod snapshot;

pub use manager::{SessionDeps, SessionError, SessionManager, SessionTask};
pub use snapshot::{SessionPhase, SessionSnapshot};
