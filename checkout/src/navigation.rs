//! Route changes out of the checkout.

use std::sync::{Arc, Mutex, PoisonError};

/// Route navigation collaborator
pub trait Navigator: Send + Sync {
    /// Leave the checkout for `path`
    fn navigate_to(&self, path: &str);
}

/// Logs navigation instead of performing it
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate_to(&self, path: &str) {
        tracing::info!(path, "Leaving checkout");
    }
}

/// Remembers every navigation, for tests
#[derive(Clone, Debug, Default)]
pub struct RecordingNavigator {
    history: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    /// Navigator with empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths navigated to, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
