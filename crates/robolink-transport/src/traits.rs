use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::error::Result;

/// A raw byte channel to the controller.
///
/// All methods take `&self`: one handle is shared by the supervisor (which
/// opens and closes it) and by the receive and send loops (which only read
/// and write). Implementations serialize open/close against in-flight I/O so
/// a read racing a reopen fails cleanly instead of touching a stale handle.
pub trait Transport: Send + Sync {
    /// Open the underlying port.
    fn open(&self) -> Result<()>;

    /// Close the underlying port. Closing a closed transport is a no-op.
    fn close(&self);

    /// Whether the port is currently open.
    fn is_open(&self) -> bool;

    /// Read up to `buf.len()` bytes. May return fewer.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Write the whole buffer in one operation.
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Human-readable name used in log lines.
    fn name(&self) -> &str {
        "transport"
    }
}

/// Shared handle used by every worker of a link.
pub type SharedTransport = Arc<dyn Transport>;

/// Adapts a shared [`Transport`] to `std::io::Read`.
#[derive(Clone)]
pub struct TransportReader {
    transport: SharedTransport,
}

impl TransportReader {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }
}

impl Read for TransportReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.transport.read(buf).map_err(|err| err.into_io())
    }
}

/// Adapts a shared [`Transport`] to `std::io::Write`.
///
/// Each `write` hands the whole buffer to the transport at once.
#[derive(Clone)]
pub struct TransportWriter {
    transport: SharedTransport,
}

impl TransportWriter {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }
}

impl Write for TransportWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.transport.write(buf).map_err(|err| err.into_io())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for TransportReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportReader")
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl std::fmt::Debug for TransportWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportWriter")
            .field("transport", &self.transport.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn reader_forwards_bytes() {
        let mock = Arc::new(MockTransport::opened());
        mock.push_read(vec![1, 2, 3]);
        let mut reader = TransportReader::new(mock.clone());

        let mut buf = [0u8; 8];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
    }

    #[test]
    fn reader_reports_closed_transport_as_not_connected() {
        let mock = Arc::new(MockTransport::new());
        let mut reader = TransportReader::new(mock);

        let mut buf = [0u8; 1];
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn writer_hands_whole_buffer_to_transport() {
        let mock = Arc::new(MockTransport::opened());
        let mut writer = TransportWriter::new(mock.clone());

        assert_eq!(writer.write(b"abcdef").unwrap(), 6);
        assert_eq!(mock.written(), vec![b"abcdef".to_vec()]);
    }
}
