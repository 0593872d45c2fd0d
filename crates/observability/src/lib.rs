//! Process-wide log setup shared by the sahara crates' hosts and tests.

/// Install the global subscriber from the environment.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init_with(&tracing::LogConfig::from_env());
}

/// Subscriber configuration and installation.
pub mod tracing;

pub use tracing::{LogConfig, LogFormat};
