use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use robolink_frame::FrameWriter;
use robolink_transport::{SharedTransport, TransportWriter};
use tracing::{debug, warn};

use crate::bridge::sleep_unless_stopped;
use crate::command::CommandHandle;
use crate::health::LinkHealth;

/// What one [`SendLoop::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Health is down; no frame was built.
    BackedOff,
    Sent,
    /// The frame could not be encoded; the link is unaffected.
    Dropped,
    /// The write failed; health was lowered.
    LinkLost,
}

/// Streams the current command record to the controller.
pub struct SendLoop {
    writer: FrameWriter<TransportWriter>,
    commands: CommandHandle,
    health: LinkHealth,
    period: Duration,
    backoff: Duration,
    started: Instant,
    sent: u64,
}

impl SendLoop {
    pub fn new(
        transport: SharedTransport,
        commands: CommandHandle,
        health: LinkHealth,
        period: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            writer: FrameWriter::new(TransportWriter::new(transport)),
            commands,
            health,
            period,
            backoff,
            started: Instant::now(),
            sent: 0,
        }
    }

    /// One iteration: snapshot the command record, stamp it, write one frame.
    pub fn step(&mut self) -> SendOutcome {
        if !self.health.is_up() {
            return SendOutcome::BackedOff;
        }

        let mut cmd = self.commands.snapshot();
        // Wraps after ~49 days, like the controller's own millisecond clock.
        cmd.time_stamp = self.started.elapsed().as_millis() as u32;

        match self.writer.send_payload(&cmd) {
            Ok(()) => {
                self.sent += 1;
                SendOutcome::Sent
            }
            Err(err) if err.is_io() => {
                self.health.mark_down(&err);
                SendOutcome::LinkLost
            }
            Err(err) => {
                warn!(error = %err, "command frame dropped");
                SendOutcome::Dropped
            }
        }
    }

    /// Step every period until `stop` is raised, backing off while health is down.
    pub fn run(&mut self, stop: &AtomicBool) {
        debug!(period = ?self.period, "send loop started");
        while !stop.load(Ordering::Acquire) {
            let pause = match self.step() {
                SendOutcome::BackedOff => self.backoff,
                _ => self.period,
            };
            sleep_unless_stopped(pause, stop);
        }
        debug!(sent = self.sent, "send loop stopped");
    }

    /// Frames written since start.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use robolink_frame::messages::{Payload, RobotCmd};
    use robolink_frame::{decode_packet, OUTBOUND_START};
    use robolink_transport::mock::MockTransport;

    use super::*;

    fn healthy_loop(mock: &Arc<MockTransport>) -> (SendLoop, CommandHandle, LinkHealth) {
        let commands = CommandHandle::new();
        let health = LinkHealth::new();
        health.mark_up();
        let tx = SendLoop::new(
            mock.clone(),
            commands.clone(),
            health.clone(),
            Duration::from_millis(5),
            Duration::from_millis(1),
        );
        (tx, commands, health)
    }

    #[test]
    fn one_step_writes_the_current_velocity() {
        let mock = Arc::new(MockTransport::opened());
        let (mut tx, commands, _health) = healthy_loop(&mock);
        commands.set_velocity(1.0, -1.0, 0.5);

        assert_eq!(tx.step(), SendOutcome::Sent);

        let written = mock.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0][0], OUTBOUND_START);

        let frame = decode_packet(&written[0]).unwrap();
        assert_eq!(frame.message_id(), RobotCmd::ID);
        let cmd = RobotCmd::decode(&frame.payload).unwrap();
        assert_eq!(
            (cmd.speed.vx, cmd.speed.vy, cmd.speed.wz),
            (1.0, -1.0, 0.5)
        );
    }

    #[test]
    fn each_frame_is_one_write() {
        let mock = Arc::new(MockTransport::opened());
        let (mut tx, _commands, _health) = healthy_loop(&mock);

        for _ in 0..3 {
            assert_eq!(tx.step(), SendOutcome::Sent);
        }
        assert_eq!(mock.write_calls(), 3);
        assert_eq!(tx.sent(), 3);
        assert!(mock
            .written()
            .iter()
            .all(|w| w.len() == robolink_frame::HEADER_SIZE + RobotCmd::SIZE + 2));
    }

    #[test]
    fn timestamps_do_not_go_backwards() {
        let mock = Arc::new(MockTransport::opened());
        let (mut tx, _commands, _health) = healthy_loop(&mock);

        tx.step();
        std::thread::sleep(Duration::from_millis(3));
        tx.step();

        let stamps: Vec<u32> = mock
            .written()
            .iter()
            .map(|w| {
                let frame = decode_packet(w).unwrap();
                RobotCmd::decode(&frame.payload).unwrap().time_stamp
            })
            .collect();
        assert!(stamps[1] >= stamps[0] + 3);
    }

    #[test]
    fn write_failure_lowers_health_then_backs_off() {
        let mock = Arc::new(MockTransport::opened());
        mock.fail_writes(true);
        let (mut tx, _commands, health) = healthy_loop(&mock);

        assert_eq!(tx.step(), SendOutcome::LinkLost);
        assert!(!health.is_up());

        assert_eq!(tx.step(), SendOutcome::BackedOff);
        assert_eq!(mock.write_calls(), 1);
    }
}
