//! Hooks the transport uses to reach the UI shell: forced navigation and
//! user notifications.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Forced navigation target sink.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// User-facing notification sink. Receives exactly one call per classified
/// error.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Queue of navigations forced from outside the router (e.g. by a 401).
///
/// Cloning shares the same queue; the router drains it.
#[derive(Debug, Clone, Default)]
pub struct NavigationQueue {
    pending: Arc<Mutex<VecDeque<String>>>,
}

impl NavigationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every pending target, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Navigator for NavigationQueue {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "forced navigation queued");
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(path.to_string());
    }
}

/// Notifier that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn error(&self, message: &str) {
        tracing::error!(message, "request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_drains_in_order() {
        let queue = NavigationQueue::new();
        let handle: Arc<dyn Navigator> = Arc::new(queue.clone());
        handle.navigate("/login");
        handle.navigate("/forbidden");
        assert!(!queue.is_empty());
        assert_eq!(queue.drain(), vec!["/login", "/forbidden"]);
        assert!(queue.is_empty());
    }
}
