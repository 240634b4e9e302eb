use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};

use crate::codec::{FrameConfig, Header, CHECKSUM_SIZE, HEADER_SIZE};
use crate::crc::append_crc16;
use crate::error::{FrameError, Result};
use crate::messages::Payload;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes checksummed frames to any `Write` stream.
///
/// Each frame is assembled in an internal buffer and handed to the stream in
/// a single `write` call where the stream accepts it. The last header is
/// cached: the send loop repeats the same id and length every period.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    last_header: Option<Header>,
}

impl<T: Write> FrameWriter<T> {
    /// Create a writer for host → controller packets.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::outbound())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            last_header: None,
        }
    }

    /// Encode and send a catalog record.
    pub fn send_payload<P: Payload>(&mut self, message: &P) -> Result<()> {
        self.send(P::ID, &message.encode())
    }

    /// Encode and send a payload under `message_id`.
    pub fn send(&mut self, message_id: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }
        let length = u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u16::MAX as usize,
        })?;

        let header = self.header_for(message_id, length);
        self.buf.clear();
        self.buf.reserve(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
        self.buf.put_slice(&header.to_bytes());
        self.buf.put_slice(payload);
        append_crc16(&mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    fn header_for(&mut self, message_id: u8, length: u16) -> Header {
        match self.last_header {
            Some(header)
                if header.message_id == message_id
                    && header.payload_length == length
                    && header.start_marker == self.config.start_marker =>
            {
                header
            }
            _ => {
                let header = Header::new(self.config.start_marker, message_id, length);
                self.last_header = Some(header);
                header
            }
        }
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{decode_packet, FrameConfig, INBOUND_START, OUTBOUND_START};
    use crate::messages::{RobotCmd, ShootTarget, SpeedVector};
    use crate::reader::FrameReader;

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.send(1, b"hello").unwrap();

        let wire = written(writer);
        assert_eq!(wire[0], OUTBOUND_START);
        let frame = decode_packet(&wire).unwrap();
        assert_eq!(frame.message_id(), 1);
        assert_eq!(frame.payload.as_ref(), b"hello");
        assert_eq!(frame.wire_size(), wire.len());
    }

    #[test]
    fn robot_cmd_round_trips_through_reader() {
        let cmd = RobotCmd {
            time_stamp: 5,
            speed: SpeedVector {
                vx: 1.0,
                vy: -1.0,
                wz: 0.5,
            },
            shoot: ShootTarget {
                fire: false,
                fric_on: true,
            },
            ..RobotCmd::default()
        };

        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.send_payload(&cmd).unwrap();
        let wire = written(writer);
        assert_eq!(wire.len(), HEADER_SIZE + RobotCmd::SIZE + CHECKSUM_SIZE);

        let mut reader = FrameReader::with_config(Cursor::new(wire), FrameConfig::outbound());
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.message_id(), RobotCmd::ID);
        assert_eq!(RobotCmd::decode(&frame.payload).unwrap(), cmd);
    }

    #[test]
    fn header_cache_follows_id_and_length() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.send(1, b"abcd").unwrap();
        writer.send(1, b"wxyz").unwrap();
        writer.send(2, b"wxyz").unwrap();
        writer.send(2, b"longer").unwrap();

        let wire = written(writer);
        let mut offset = 0;
        let mut seen = Vec::new();
        while offset < wire.len() {
            let frame = decode_packet(&wire[offset..]).unwrap();
            offset += frame.wire_size();
            seen.push((frame.message_id(), frame.payload.to_vec()));
        }
        assert_eq!(
            seen,
            vec![
                (1, b"abcd".to_vec()),
                (1, b"wxyz".to_vec()),
                (2, b"wxyz".to_vec()),
                (2, b"longer".to_vec()),
            ]
        );
    }

    #[test]
    fn inbound_config_writes_inbound_marker() {
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::new()), FrameConfig::inbound());
        writer.send(0x02, b"imu").unwrap();
        assert_eq!(written(writer)[0], INBOUND_START);
    }

    #[test]
    fn payload_too_large_rejected() {
        let config = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::outbound()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::new()), config);

        let err = writer.send(1, b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(1, b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_and_short_writes() {
        let mut writer = FrameWriter::new(StutteringWriter::default());
        writer.send(5, b"retry").unwrap();

        let inner = writer.into_inner();
        let frame = decode_packet(&inner.data).unwrap();
        assert_eq!(frame.payload.as_ref(), b"retry");
        assert!(inner.interrupted);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(1, b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn write_errors_propagate() {
        let mut writer = FrameWriter::new(BrokenWriter);
        let err = writer.send(1, b"x").unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        assert_eq!(writer.config().start_marker, OUTBOUND_START);
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Interrupts the first write, then accepts at most three bytes per call.
    #[derive(Default)]
    struct StutteringWriter {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for StutteringWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = buf.len().min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
