//! One-shot navigation requests issued by the gate and by sign-out.

use std::sync::{Mutex, PoisonError};

/// Host router (or full-page location change).
pub trait Navigator: Send + Sync {
    /// Go to `target`. With `replace`, the current history entry is replaced.
    fn navigate(&self, target: &str, replace: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: String,
    pub replace: bool,
}

/// Navigator that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Navigation> {
        self.visits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_target(&self) -> Option<String> {
        self.visits().last().map(|n| n.target.clone())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &str, replace: bool) {
        tracing::debug!(destination = %target, replace, "navigate");
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Navigation {
                target: target.to_string(),
                replace,
            });
    }
}
