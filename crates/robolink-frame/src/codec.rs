use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::{compute_crc16, compute_crc8, verify_crc16, verify_crc8};
use crate::error::{FrameError, Result};
use crate::messages::MessageKind;

/// Header: start (1) + id (1) + length (2) + CRC8 (1) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Trailing packet checksum: CRC16, little-endian.
pub const CHECKSUM_SIZE: usize = 2;

/// Start marker of controller → host packets.
pub const INBOUND_START: u8 = 0x5a;

/// Start marker of host → controller packets.
pub const OUTBOUND_START: u8 = 0xa5;

/// Default maximum accepted payload size.
///
/// Comfortably above the largest catalog payload; a header that passes CRC8
/// by accident with a huge length is dropped instead of swallowing the stream.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// Fixed-size packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub start_marker: u8,
    pub message_id: u8,
    pub payload_length: u16,
    pub header_checksum: u8,
}

impl Header {
    /// Build a header and compute its checksum.
    pub fn new(start_marker: u8, message_id: u8, payload_length: u16) -> Self {
        let mut header = Self {
            start_marker,
            message_id,
            payload_length,
            header_checksum: 0,
        };
        header.header_checksum = compute_crc8(&encode_header(&header));
        header
    }

    /// Total wire size of the packet this header announces.
    pub fn packet_size(&self) -> usize {
        HEADER_SIZE + self.payload_length as usize + CHECKSUM_SIZE
    }

    /// Whether the stored checksum matches the other three fields.
    pub fn is_valid(&self) -> bool {
        compute_crc8(&encode_header(self)) == self.header_checksum
    }

    /// The header as it appears on the wire, checksum included.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [a, b, c, d] = encode_header(self);
        [a, b, c, d, self.header_checksum]
    }
}

/// Encode the checksummed fields of a header (everything but the CRC8).
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE - 1] {
    let [len_lo, len_hi] = header.payload_length.to_le_bytes();
    [header.start_marker, header.message_id, len_lo, len_hi]
}

/// Split a raw header into fields. Does not verify the checksum.
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> Header {
    Header {
        start_marker: bytes[0],
        message_id: bytes[1],
        payload_length: u16::from_le_bytes([bytes[2], bytes[3]]),
        header_checksum: bytes[4],
    }
}

/// A checksum-verified packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub payload: Bytes,
}

impl Frame {
    /// The catalog entry for this frame's id, if any.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_id(self.header.message_id)
    }

    pub fn message_id(&self) -> u8 {
        self.header.message_id
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.header.packet_size()
    }
}

/// Encode a complete packet into `dst`.
///
/// Wire format:
/// ```text
/// ┌───────┬──────┬──────────┬──────┬───────────────┬──────────┐
/// │ Start │ Id   │ Length   │ CRC8 │ Payload        │ CRC16    │
/// │ (1B)  │ (1B) │ (2B LE)  │ (1B) │ (Length bytes) │ (2B LE)  │
/// └───────┴──────┴──────────┴──────┴───────────────┴──────────┘
/// ```
pub fn encode_packet(
    start_marker: u8,
    message_id: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let length = u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u16::MAX as usize,
    })?;
    let header = Header::new(start_marker, message_id, length);

    let start = dst.len();
    dst.reserve(header.packet_size());
    dst.put_slice(&header.to_bytes());
    dst.put_slice(payload);
    let crc = compute_crc16(&dst[start..]);
    dst.put_u16_le(crc);
    Ok(())
}

/// Decode and verify one packet from the front of `src`.
///
/// Trailing bytes after the packet are ignored; use [`Frame::wire_size`] to
/// find where the next packet starts.
pub fn decode_packet(src: &[u8]) -> Result<Frame> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            expected: HEADER_SIZE,
            received: src.len(),
        });
    }

    let raw_header: &[u8; HEADER_SIZE] = src[..HEADER_SIZE]
        .try_into()
        .map_err(|_| FrameError::Truncated {
            expected: HEADER_SIZE,
            received: src.len(),
        })?;
    let header = decode_header(raw_header);
    if !verify_crc8(raw_header) {
        return Err(FrameError::HeaderChecksum {
            expected: compute_crc8(&raw_header[..HEADER_SIZE - 1]),
            actual: header.header_checksum,
        });
    }

    let total = header.packet_size();
    if src.len() < total {
        return Err(FrameError::Truncated {
            expected: total,
            received: src.len(),
        });
    }

    let packet = &src[..total];
    if !verify_crc16(packet) {
        return Err(packet_checksum_error(packet));
    }

    Ok(Frame {
        header,
        payload: Bytes::copy_from_slice(&packet[HEADER_SIZE..total - CHECKSUM_SIZE]),
    })
}

pub(crate) fn packet_checksum_error(packet: &[u8]) -> FrameError {
    let split = packet.len().saturating_sub(CHECKSUM_SIZE);
    let (body, tail) = packet.split_at(split);
    let actual = match tail {
        [lo, hi] => u16::from_le_bytes([*lo, *hi]),
        _ => 0,
    };
    FrameError::PacketChecksum {
        expected: compute_crc16(body),
        actual,
    }
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Start marker expected on read / emitted on write.
    pub start_marker: u8,
    /// Maximum payload size in bytes. Default: 1 KiB.
    pub max_payload_size: usize,
}

impl FrameConfig {
    /// Reading controller → host packets.
    pub fn inbound() -> Self {
        Self {
            start_marker: INBOUND_START,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Writing host → controller packets.
    pub fn outbound() -> Self {
        Self {
            start_marker: OUTBOUND_START,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::inbound()
    }
}
