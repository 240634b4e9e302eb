/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Header CRC8 does not match; the frame is discarded before its payload is read.
    #[error("header checksum mismatch (computed {expected:#04x}, received {actual:#04x})")]
    HeaderChecksum { expected: u8, actual: u8 },

    /// Packet CRC16 does not match; the frame is discarded after being read in full.
    #[error("packet checksum mismatch (computed {expected:#06x}, received {actual:#06x})")]
    PacketChecksum { expected: u16, actual: u16 },

    /// The payload length does not match the fixed layout of its message id.
    #[error("malformed payload for id {id:#04x} ({actual} bytes, expected {expected})")]
    MalformedPayload {
        id: u8,
        expected: usize,
        actual: usize,
    },

    /// The message id is not in the catalog.
    #[error("unknown message id {0:#04x}")]
    UnknownKind(u8),

    /// The stream stalled before a complete frame arrived.
    #[error("truncated frame ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error means the link itself failed, as opposed to one bad frame.
    pub fn is_io(&self) -> bool {
        matches!(self, FrameError::Io(_) | FrameError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
