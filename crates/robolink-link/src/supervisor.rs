use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use robolink_transport::SharedTransport;
use tracing::{debug, info, warn};

use crate::bridge::sleep_unless_stopped;
use crate::health::LinkHealth;

/// Keeps the transport open.
///
/// Construction makes one open attempt. Afterwards every [`tick`](Self::tick)
/// while health is down closes and reopens the port; `run` ticks once per
/// reconnect interval so a dead port is never hammered.
pub struct Supervisor {
    transport: SharedTransport,
    health: LinkHealth,
    interval: Duration,
    failures: u64,
}

impl Supervisor {
    pub fn new(transport: SharedTransport, health: LinkHealth, interval: Duration) -> Self {
        let mut supervisor = Self {
            transport,
            health,
            interval,
            failures: 0,
        };
        supervisor.try_open();
        supervisor
    }

    /// Reopen the port if health is down. Returns whether the link is up.
    pub fn tick(&mut self) -> bool {
        if self.health.is_up() {
            return true;
        }
        self.transport.close();
        self.try_open()
    }

    /// Tick every reconnect interval until `stop` is raised.
    pub fn run(&mut self, stop: &AtomicBool) {
        debug!(port = self.transport.name(), "supervisor started");
        while !stop.load(Ordering::Acquire) {
            self.tick();
            sleep_unless_stopped(self.interval, stop);
        }
        debug!(port = self.transport.name(), "supervisor stopped");
    }

    /// Consecutive failed open attempts.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn try_open(&mut self) -> bool {
        let result = self.transport.open();
        match result {
            Ok(()) if self.transport.is_open() => {
                if self.failures > 0 {
                    info!(
                        port = self.transport.name(),
                        attempts = self.failures + 1,
                        "link restored"
                    );
                } else {
                    info!(port = self.transport.name(), "link up");
                }
                self.failures = 0;
                self.health.mark_up();
                true
            }
            Ok(()) => {
                self.record_failure("port reported closed after open");
                false
            }
            Err(err) => {
                self.record_failure(err);
                false
            }
        }
    }

    fn record_failure(&mut self, reason: impl std::fmt::Display) {
        self.health.mark_down(&reason);
        self.failures += 1;
        if self.failures == 1 {
            warn!(port = self.transport.name(), error = %reason, "open failed, retrying");
        } else {
            debug!(
                port = self.transport.name(),
                error = %reason,
                attempts = self.failures,
                "open still failing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use robolink_transport::mock::MockTransport;
    use robolink_transport::Transport;

    use super::*;

    fn supervised(mock: &Arc<MockTransport>) -> (Supervisor, LinkHealth) {
        let health = LinkHealth::new();
        let supervisor = Supervisor::new(mock.clone(), health.clone(), Duration::from_millis(1));
        (supervisor, health)
    }

    #[test]
    fn construction_opens_once() {
        let mock = Arc::new(MockTransport::new());
        let (_supervisor, health) = supervised(&mock);

        assert!(health.is_up());
        assert!(mock.is_open());
        assert_eq!(mock.open_calls(), 1);
    }

    #[test]
    fn healthy_tick_does_nothing() {
        let mock = Arc::new(MockTransport::new());
        let (mut supervisor, _health) = supervised(&mock);

        assert!(supervisor.tick());
        assert!(supervisor.tick());
        assert_eq!(mock.open_calls(), 1);
        assert_eq!(mock.close_calls(), 0);
    }

    #[test]
    fn retries_until_open_succeeds() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_next_opens(2);
        let (mut supervisor, health) = supervised(&mock);

        assert!(!health.is_up());
        assert!(!supervisor.tick());
        assert_eq!(supervisor.failures(), 2);

        assert!(supervisor.tick());
        assert!(health.is_up());
        assert_eq!(supervisor.failures(), 0);
        assert_eq!(mock.open_calls(), 3);
        assert_eq!(mock.close_calls(), 2);
    }

    #[test]
    fn open_that_leaves_port_closed_counts_as_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.open_reports_closed(true);
        let (mut supervisor, health) = supervised(&mock);

        assert!(!health.is_up());
        assert_eq!(supervisor.failures(), 1);

        assert!(!supervisor.tick());
        assert!(!health.is_up());
        assert_eq!(supervisor.failures(), 2);
        assert_eq!(mock.open_calls(), 2);

        mock.open_reports_closed(false);
        assert!(supervisor.tick());
        assert!(health.is_up());
        assert_eq!(supervisor.failures(), 0);
    }

    #[test]
    fn reopens_after_worker_reports_failure() {
        let mock = Arc::new(MockTransport::new());
        let (mut supervisor, health) = supervised(&mock);

        health.mark_down("read failed");
        assert!(supervisor.tick());
        assert!(health.is_up());
        assert_eq!(mock.close_calls(), 1);
        assert_eq!(mock.open_calls(), 2);
    }

    #[test]
    fn run_returns_once_stopped() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_next_opens(usize::MAX);
        let (mut supervisor, _health) = supervised(&mock);

        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = stop.clone();
            std::thread::spawn(move || {
                supervisor.run(&stop);
                supervisor.failures()
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::Release);
        let failures = handle.join().unwrap();
        assert!(failures >= 2);
    }
}
