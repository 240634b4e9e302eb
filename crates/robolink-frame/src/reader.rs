use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::codec::{
    decode_header, packet_checksum_error, Frame, FrameConfig, CHECKSUM_SIZE, HEADER_SIZE,
};
use crate::crc::{compute_crc8, verify_crc16, verify_crc8};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Counters kept by a [`FrameReader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Frames that passed both checksums.
    pub frames: u64,
    /// Bytes discarded while hunting for a start marker.
    pub skipped_bytes: u64,
    pub header_errors: u64,
    pub packet_errors: u64,
    /// Headers announcing more than `max_payload_size`.
    pub oversized: u64,
    /// Frames abandoned mid-read because the caller stopped waiting.
    pub truncated: u64,
}

/// Reads checksummed frames from any `Read` stream.
///
/// The stream is scanned one byte at a time until the configured start
/// marker appears; the rest of the frame is then read with as many partial
/// reads as the stream needs. A failed checksum drops only the bytes already
/// consumed, so the next poll resynchronizes on the following start marker.
///
/// Read timeouts (`TimedOut` or `WouldBlock`) while hunting are idle time, not
/// errors: [`poll_frame`](Self::poll_frame) returns `Ok(None)`. Timeouts after
/// a start marker only mean the rest of the frame has not arrived yet.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    stats: ReaderStats,
    unlocked_run: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a reader for controller → host packets.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::inbound())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            stats: ReaderStats::default(),
            unlocked_run: 0,
        }
    }

    /// Make one step of progress.
    ///
    /// Returns `Ok(None)` when the stream timed out before a start marker or
    /// when the byte read was not a start marker. Once a start marker is seen
    /// the call keeps reading until the frame is complete or fails its
    /// checksums.
    pub fn poll_frame(&mut self) -> Result<Option<Frame>> {
        self.poll_frame_while(|| true)
    }

    /// Like [`poll_frame`](Self::poll_frame), but `keep_waiting` is asked
    /// after every timed-out read inside a frame. Once it returns `false` the
    /// partial frame is dropped with `FrameError::Truncated`.
    pub fn poll_frame_while<F>(&mut self, mut keep_waiting: F) -> Result<Option<Frame>>
    where
        F: FnMut() -> bool,
    {
        let mut marker = [0u8; 1];
        if read_chunk(&mut self.inner, &mut marker)?.is_none() {
            return Ok(None);
        }

        if marker[0] != self.config.start_marker {
            self.stats.skipped_bytes += 1;
            self.unlocked_run += 1;
            trace!(byte = marker[0], "discarding byte outside a frame");
            return Ok(None);
        }

        if self.unlocked_run > 0 {
            debug!(skipped = self.unlocked_run, "locked onto start marker");
            self.unlocked_run = 0;
        }

        self.buf.clear();
        self.buf.resize(HEADER_SIZE, 0);
        self.buf[0] = marker[0];
        self.fill(1, HEADER_SIZE, &mut keep_waiting)?;

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&self.buf[..HEADER_SIZE]);
        let header = decode_header(&raw);
        if !verify_crc8(&raw) {
            self.stats.header_errors += 1;
            return Err(FrameError::HeaderChecksum {
                expected: compute_crc8(&raw[..HEADER_SIZE - 1]),
                actual: header.header_checksum,
            });
        }

        let length = header.payload_length as usize;
        if length > self.config.max_payload_size {
            self.stats.oversized += 1;
            return Err(FrameError::PayloadTooLarge {
                size: length,
                max: self.config.max_payload_size,
            });
        }

        let total = header.packet_size();
        self.buf.resize(total, 0);
        self.fill(HEADER_SIZE, total, &mut keep_waiting)?;

        if !verify_crc16(&self.buf[..total]) {
            self.stats.packet_errors += 1;
            return Err(packet_checksum_error(&self.buf[..total]));
        }

        self.stats.frames += 1;
        let packet = self.buf.split_to(total).freeze();
        Ok(Some(Frame {
            header,
            payload: packet.slice(HEADER_SIZE..total - CHECKSUM_SIZE),
        }))
    }

    /// Read the next complete frame (blocking).
    ///
    /// Skips idle timeouts. Returns `Err(FrameError::ConnectionClosed)` when
    /// EOF is reached. Checksum failures are returned to the caller; calling
    /// again resumes the hunt.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.poll_frame()? {
                return Ok(frame);
            }
        }
    }

    /// Fill `buf[from..to]` from the stream, reading again after timeouts
    /// for as long as `keep_waiting` allows.
    fn fill<F>(&mut self, from: usize, to: usize, keep_waiting: &mut F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        let mut filled = from;
        while filled < to {
            match read_chunk(&mut self.inner, &mut self.buf[filled..to])? {
                Some(n) => filled += n,
                None if keep_waiting() => {
                    trace!(received = filled, expected = to, "waiting for rest of frame");
                }
                None => {
                    self.stats.truncated += 1;
                    return Err(FrameError::Truncated {
                        expected: to,
                        received: filled,
                    });
                }
            }
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// One read. `None` means the stream timed out with nothing to give.
fn read_chunk<R: Read>(inner: &mut R, buf: &mut [u8]) -> Result<Option<usize>> {
    loop {
        match inner.read(buf) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => return Ok(Some(n)),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Ok(None)
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
