use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use robolink_transport::SharedTransport;
use tracing::{debug, error, info};

use crate::command::CommandHandle;
use crate::error::{LinkError, Result};
use crate::health::LinkHealth;
use crate::receiver::ReceiveLoop;
use crate::sender::SendLoop;
use crate::sink::TelemetrySink;
use crate::supervisor::Supervisor;

/// Longest single sleep; bounds how late a worker notices `stop`.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Timing of the three workers.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How often the supervisor checks health and reopens the port.
    pub reconnect_interval: Duration,
    /// Pause of the receive and send loops while health is down.
    pub backoff: Duration,
    /// Send loop cadence.
    pub send_period: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_secs(1),
            backoff: Duration::from_secs(1),
            send_period: Duration::from_millis(5),
        }
    }
}

/// A running link: supervisor, receive loop and send loop on named threads.
///
/// Dropping a bridge shuts it down.
pub struct Bridge {
    transport: SharedTransport,
    health: LinkHealth,
    commands: CommandHandle,
    stop: Arc<AtomicBool>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

impl Bridge {
    /// Open the port once, then spawn the workers.
    ///
    /// A failed first open is not an error: the supervisor keeps retrying.
    pub fn start<S>(transport: SharedTransport, sink: S, config: BridgeConfig) -> Result<Self>
    where
        S: TelemetrySink + 'static,
    {
        let health = LinkHealth::new();
        let commands = CommandHandle::new();
        let mut bridge = Self {
            transport: transport.clone(),
            health: health.clone(),
            commands: commands.clone(),
            stop: Arc::new(AtomicBool::new(false)),
            workers: Vec::with_capacity(3),
        };

        let mut supervisor = Supervisor::new(
            transport.clone(),
            health.clone(),
            config.reconnect_interval,
        );
        bridge.spawn("link-supervisor", move |stop| supervisor.run(stop))?;

        let mut receiver = ReceiveLoop::new(transport.clone(), sink, health.clone(), config.backoff);
        bridge.spawn("link-rx", move |stop| receiver.run(stop))?;

        let mut sender = SendLoop::new(
            transport,
            commands,
            health,
            config.send_period,
            config.backoff,
        );
        bridge.spawn("link-tx", move |stop| sender.run(stop))?;

        info!(
            port = bridge.transport.name(),
            up = bridge.health.is_up(),
            "bridge started"
        );
        Ok(bridge)
    }

    fn spawn<F>(&mut self, name: &'static str, work: F) -> Result<()>
    where
        F: FnOnce(&AtomicBool) + Send + 'static,
    {
        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || work(&stop))
            .map_err(|source| LinkError::Spawn { name, source })?;
        self.workers.push((name, handle));
        Ok(())
    }

    /// Handle for updating the outbound command record.
    pub fn commands(&self) -> CommandHandle {
        self.commands.clone()
    }

    pub fn health(&self) -> LinkHealth {
        self.health.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Acquire)
    }

    /// Stop all workers, join them, then close the port.
    ///
    /// Returns after the slowest worker finishes its current blocking read
    /// or sleep slice. Calling it twice is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.stop.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut result = Ok(());
        for (name, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                error!(thread = name, "worker panicked");
                if result.is_ok() {
                    result = Err(LinkError::WorkerPanicked(name));
                }
            }
        }

        self.transport.close();
        debug!(port = self.transport.name(), "bridge stopped");
        result
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("transport", &self.transport.name())
            .field("up", &self.health.is_up())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Sleep for `duration` in slices, returning early once `stop` is raised.
pub(crate) fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
