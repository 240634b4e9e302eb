use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

/// Shared "port is usable" flag.
///
/// Only the [`Supervisor`](crate::Supervisor) raises it, after a successful
/// open. Any worker lowers it on an I/O failure; the down transition is
/// logged once, not once per failed iteration.
#[derive(Debug, Clone, Default)]
pub struct LinkHealth {
    up: Arc<AtomicBool>,
}

impl LinkHealth {
    /// A flag that starts down.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Lower the flag. Returns `true` if it was up.
    pub fn mark_down(&self, reason: impl fmt::Display) -> bool {
        let was_up = self.up.swap(false, Ordering::AcqRel);
        if was_up {
            warn!(reason = %reason, "link down");
        }
        was_up
    }

    /// Raise the flag. Returns `true` if it was down.
    pub(crate) fn mark_up(&self) -> bool {
        !self.up.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_down() {
        assert!(!LinkHealth::new().is_up());
    }

    #[test]
    fn transitions_are_reported_once() {
        let health = LinkHealth::new();
        assert!(health.mark_up());
        assert!(!health.mark_up());

        assert!(health.mark_down("read failed"));
        assert!(!health.mark_down("read failed again"));
        assert!(!health.is_up());
    }

    #[test]
    fn clones_share_state() {
        let health = LinkHealth::new();
        let observer = health.clone();
        health.mark_up();
        assert!(observer.is_up());
        observer.mark_down("closed");
        assert!(!health.is_up());
    }
}
