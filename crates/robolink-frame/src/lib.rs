//! Checksummed packet framing for the host/controller serial link.
//!
//! Every packet on the wire is:
//! - a 5-byte header: start marker, message id, 2-byte little-endian payload
//!   length, CRC8 over the preceding four bytes
//! - the payload, whose layout is fixed per message id
//! - a 2-byte little-endian CRC16 over header and payload
//!
//! The two directions use different start markers, so a controller echoing
//! its own output never parses as valid input.

pub mod codec;
pub mod crc;
pub mod error;
pub mod messages;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_header, decode_packet, encode_header, encode_packet, Frame, FrameConfig, Header,
    CHECKSUM_SIZE, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, INBOUND_START, OUTBOUND_START,
};
pub use crc::{append_crc16, append_crc8, compute_crc16, compute_crc8, verify_crc16, verify_crc8};
pub use error::{FrameError, Result};
pub use messages::{decode_payload, MessageKind, Payload, RobotCmd, Telemetry};
pub use reader::{FrameReader, ReaderStats};
pub use writer::FrameWriter;
