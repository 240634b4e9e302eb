use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use robolink_frame::{Frame, FrameError, FrameReader, MessageKind, ReaderStats, Telemetry};
use robolink_transport::{SharedTransport, TransportReader};
use tracing::{debug, info, warn};

use crate::bridge::sleep_unless_stopped;
use crate::health::LinkHealth;
use crate::sink::{dispatch, TelemetrySink};

/// What one [`ReceiveLoop::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Health is down; no I/O was attempted.
    BackedOff,
    /// Timed out or discarded a byte while hunting for a start marker.
    Idle,
    /// A record was decoded and handed to the sink.
    Dispatched(MessageKind),
    /// A valid frame carried an id outside the catalog.
    Unknown(u8),
    /// A frame failed a checksum or size check, or was abandoned part-way.
    Discarded,
    /// The transport failed; health was lowered.
    LinkLost,
}

/// Decodes inbound frames and dispatches them to a [`TelemetrySink`].
pub struct ReceiveLoop<S> {
    reader: FrameReader<TransportReader>,
    sink: S,
    health: LinkHealth,
    backoff: Duration,
}

impl<S: TelemetrySink> ReceiveLoop<S> {
    pub fn new(transport: SharedTransport, sink: S, health: LinkHealth, backoff: Duration) -> Self {
        Self {
            reader: FrameReader::new(TransportReader::new(transport)),
            sink,
            health,
            backoff,
        }
    }

    /// One iteration: check health, then make one step of framing progress.
    ///
    /// Framing errors are logged and absorbed. I/O errors lower health and
    /// are never retried here. A frame that has started keeps being read
    /// across timeouts for as long as health stays up.
    pub fn step(&mut self) -> ReceiveOutcome {
        self.step_until(&AtomicBool::new(false))
    }

    /// Like [`step`](Self::step), but a raised `stop` also abandons a
    /// partially read frame.
    pub fn step_until(&mut self, stop: &AtomicBool) -> ReceiveOutcome {
        if !self.health.is_up() {
            return ReceiveOutcome::BackedOff;
        }

        let health = &self.health;
        let keep_waiting = || health.is_up() && !stop.load(Ordering::Acquire);
        match self.reader.poll_frame_while(keep_waiting) {
            Ok(None) => ReceiveOutcome::Idle,
            Ok(Some(frame)) => self.deliver(frame),
            Err(err) if err.is_io() => {
                self.health.mark_down(&err);
                ReceiveOutcome::LinkLost
            }
            Err(err) => {
                log_discarded(&err);
                ReceiveOutcome::Discarded
            }
        }
    }

    /// Step until `stop` is raised, backing off while health is down.
    pub fn run(&mut self, stop: &AtomicBool) {
        debug!("receive loop started");
        while !stop.load(Ordering::Acquire) {
            if self.step_until(stop) == ReceiveOutcome::BackedOff {
                sleep_unless_stopped(self.backoff, stop);
            }
        }
        debug!(stats = ?self.reader.stats(), "receive loop stopped");
    }

    fn deliver(&mut self, frame: Frame) -> ReceiveOutcome {
        let Some(kind) = frame.kind() else {
            info!(
                id = frame.message_id(),
                len = frame.payload.len(),
                "ignoring unknown message kind"
            );
            return ReceiveOutcome::Unknown(frame.message_id());
        };

        match Telemetry::decode(kind, &frame.payload) {
            Ok(telemetry) => {
                dispatch(&mut self.sink, &telemetry);
                ReceiveOutcome::Dispatched(kind)
            }
            Err(err) => {
                log_discarded(&err);
                ReceiveOutcome::Discarded
            }
        }
    }

    pub fn stats(&self) -> ReaderStats {
        self.reader.stats()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

fn log_discarded(err: &FrameError) {
    match err {
        FrameError::HeaderChecksum { expected, actual } => {
            warn!(expected, actual, "header checksum mismatch, frame dropped")
        }
        FrameError::PacketChecksum { expected, actual } => {
            warn!(expected, actual, "packet checksum mismatch, frame dropped")
        }
        FrameError::MalformedPayload {
            id,
            expected,
            actual,
        } => warn!(id, expected, actual, "malformed payload, frame dropped"),
        FrameError::Truncated { expected, received } => {
            debug!(expected, received, "partial frame abandoned")
        }
        other => warn!(error = %other, "frame dropped"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;
    use std::sync::Arc;

    use robolink_frame::messages::{ImuData, Payload, RobotMotion};
    use robolink_frame::{FrameConfig, FrameWriter};
    use robolink_transport::mock::MockTransport;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        imu: Vec<ImuData>,
        motion: Vec<RobotMotion>,
    }

    impl TelemetrySink for Recorder {
        fn on_imu(&mut self, imu: &ImuData) {
            self.imu.push(*imu);
        }

        fn on_robot_motion(&mut self, motion: &RobotMotion) {
            self.motion.push(*motion);
        }
    }

    fn packet(id: u8, payload: &[u8]) -> Vec<u8> {
        let mut writer = FrameWriter::with_config(Vec::new(), FrameConfig::inbound());
        writer.send(id, payload).unwrap();
        writer.into_inner()
    }

    fn healthy_loop(mock: &Arc<MockTransport>) -> (ReceiveLoop<Recorder>, LinkHealth) {
        let health = LinkHealth::new();
        health.mark_up();
        let rx = ReceiveLoop::new(
            mock.clone(),
            Recorder::default(),
            health.clone(),
            Duration::from_millis(1),
        );
        (rx, health)
    }

    #[test]
    fn garbage_byte_then_imu_dispatches_once() {
        let imu = ImuData {
            time_stamp: 77,
            yaw: 0.1,
            ..ImuData::default()
        };
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(vec![0xaa]);
        mock.push_read(packet(ImuData::ID, &imu.encode()));

        let (mut rx, _health) = healthy_loop(&mock);
        assert_eq!(rx.step(), ReceiveOutcome::Idle);
        assert_eq!(rx.step(), ReceiveOutcome::Dispatched(MessageKind::Imu));
        assert_eq!(rx.sink().imu, vec![imu]);
    }

    #[test]
    fn bad_packet_checksum_dispatches_nothing_and_resumes() {
        let motion = RobotMotion {
            time_stamp: 3,
            vx: 1.0,
            vy: 0.0,
            wz: -0.5,
        };
        let mut corrupt = packet(RobotMotion::ID, &motion.encode());
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xff;

        let mock = Arc::new(MockTransport::opened());
        mock.push_read(corrupt);
        mock.push_read(packet(RobotMotion::ID, &motion.encode()));

        let (mut rx, _health) = healthy_loop(&mock);
        assert_eq!(rx.step(), ReceiveOutcome::Discarded);
        assert!(rx.sink().motion.is_empty());
        assert_eq!(rx.stats().packet_errors, 1);

        assert_eq!(
            rx.step(),
            ReceiveOutcome::Dispatched(MessageKind::RobotMotion)
        );
        assert_eq!(rx.into_sink().motion, vec![motion]);
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(packet(0x05, &[0u8; 20]));

        let (mut rx, health) = healthy_loop(&mock);
        assert_eq!(rx.step(), ReceiveOutcome::Unknown(0x05));
        assert!(health.is_up());
    }

    #[test]
    fn malformed_payload_is_discarded() {
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(packet(ImuData::ID, &[0u8; 10]));

        let (mut rx, health) = healthy_loop(&mock);
        assert_eq!(rx.step(), ReceiveOutcome::Discarded);
        assert!(rx.sink().imu.is_empty());
        assert!(health.is_up());
    }

    #[test]
    fn link_loss_stops_io_until_health_restored() {
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(vec![0x00]);
        mock.push_read(vec![0x01]);
        mock.push_failure(ErrorKind::BrokenPipe);

        let (mut rx, health) = healthy_loop(&mock);
        assert_eq!(rx.step(), ReceiveOutcome::Idle);
        assert_eq!(rx.step(), ReceiveOutcome::Idle);
        assert_eq!(rx.step(), ReceiveOutcome::LinkLost);
        assert!(!health.is_up());
        assert_eq!(mock.read_calls(), 3);

        for _ in 0..5 {
            assert_eq!(rx.step(), ReceiveOutcome::BackedOff);
        }
        assert_eq!(mock.read_calls(), 3);

        mock.push_read(packet(ImuData::ID, &ImuData::default().encode()));
        health.mark_up();
        assert_eq!(rx.step(), ReceiveOutcome::Dispatched(MessageKind::Imu));
        assert!(mock.read_calls() > 3);
    }

    #[test]
    fn closed_transport_lowers_health() {
        let mock = Arc::new(MockTransport::new());
        let (mut rx, health) = healthy_loop(&mock);

        assert_eq!(rx.step(), ReceiveOutcome::LinkLost);
        assert!(!health.is_up());
    }

    #[test]
    fn idle_transport_keeps_link_up() {
        let mock = Arc::new(MockTransport::opened());
        let (mut rx, health) = healthy_loop(&mock);

        for _ in 0..3 {
            assert_eq!(rx.step(), ReceiveOutcome::Idle);
        }
        assert!(health.is_up());
        assert_eq!(mock.read_calls(), 3);
    }

    #[test]
    fn frame_split_by_timeout_is_reassembled() {
        let imu = ImuData {
            time_stamp: 9,
            pitch: 0.75,
            ..ImuData::default()
        };
        let wire = packet(ImuData::ID, &imu.encode());
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(wire[..10].to_vec());
        mock.push_failure(ErrorKind::TimedOut);
        mock.push_read(wire[10..].to_vec());

        let (mut rx, health) = healthy_loop(&mock);
        assert_eq!(rx.step(), ReceiveOutcome::Dispatched(MessageKind::Imu));
        for _ in 0..3 {
            assert_eq!(rx.step(), ReceiveOutcome::Idle);
        }

        assert_eq!(rx.sink().imu, vec![imu]);
        assert_eq!(rx.stats().truncated, 0);
        assert_eq!(rx.stats().skipped_bytes, 0);
        assert!(health.is_up());
    }

    #[test]
    fn partial_frame_abandoned_when_health_drops() {
        let wire = packet(ImuData::ID, &ImuData::default().encode());
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(wire[..10].to_vec());

        let (mut rx, health) = healthy_loop(&mock);
        let dropper = {
            let health = health.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                health.mark_down("test");
            })
        };

        assert_eq!(rx.step(), ReceiveOutcome::Discarded);
        dropper.join().unwrap();
        assert_eq!(rx.stats().truncated, 1);
        assert!(rx.sink().imu.is_empty());
        assert_eq!(rx.step(), ReceiveOutcome::BackedOff);
    }

    #[test]
    fn partial_frame_abandoned_on_stop() {
        let wire = packet(ImuData::ID, &ImuData::default().encode());
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(wire[..10].to_vec());

        let (mut rx, health) = healthy_loop(&mock);
        let stop = AtomicBool::new(true);

        assert_eq!(rx.step_until(&stop), ReceiveOutcome::Discarded);
        assert_eq!(rx.stats().truncated, 1);
        assert!(health.is_up());
    }
}
