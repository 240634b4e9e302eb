//! Checksums used by the link: CRC8 over the header, CRC16 over the packet.
//!
//! Verification always recomputes over everything but the trailing checksum
//! and compares, so the same functions serve encode (append) and decode
//! (verify).

use bytes::{BufMut, BytesMut};
use crc::{Algorithm, Crc};

/// Header checksum: reflected 0x31 polynomial, initial value 0xFF.
pub const CRC_8_LINK: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xff,
    refin: true,
    refout: true,
    xorout: 0x00,
    check: 0x0b,
    residue: 0x00,
};

/// Packet checksum: CRC-16/MCRF4XX, appended little-endian.
pub const CRC_16_LINK: Algorithm<u16> = crc::CRC_16_MCRF4XX;

static CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_LINK);
static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_LINK);

pub fn compute_crc8(bytes: &[u8]) -> u8 {
    CRC8.checksum(bytes)
}

/// Check a buffer whose last byte is the CRC8 of everything before it.
pub fn verify_crc8(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        Some((&received, body)) => compute_crc8(body) == received,
        None => false,
    }
}

pub fn append_crc8(buf: &mut BytesMut) {
    let crc = compute_crc8(buf);
    buf.put_u8(crc);
}

pub fn compute_crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Check a buffer whose last two bytes are the little-endian CRC16 of everything before them.
pub fn verify_crc16(bytes: &[u8]) -> bool {
    if bytes.len() < 2 {
        return false;
    }
    let (body, tail) = bytes.split_at(bytes.len() - 2);
    compute_crc16(body) == u16::from_le_bytes([tail[0], tail[1]])
}

pub fn append_crc16(buf: &mut BytesMut) {
    let crc = compute_crc16(buf);
    buf.put_u16_le(crc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc8_check_value() {
        assert_eq!(compute_crc8(b"123456789"), CRC_8_LINK.check);
    }

    #[test]
    fn crc16_check_value() {
        assert_eq!(compute_crc16(b"123456789"), 0x6f91);
    }

    #[test]
    fn append_then_verify() {
        let mut buf = BytesMut::from(&[0x5a, 0x02, 0x1c, 0x00][..]);
        append_crc8(&mut buf);
        assert!(verify_crc8(&buf));

        buf.extend_from_slice(&[1, 2, 3, 4]);
        append_crc16(&mut buf);
        assert!(verify_crc16(&buf));
        assert_eq!(buf.len(), 4 + 1 + 4 + 2);
    }

    #[test]
    fn crc8_detects_every_single_bit_flip() {
        let mut buf = BytesMut::from(&[0x5a, 0x08, 0x10, 0x00][..]);
        append_crc8(&mut buf);

        for bit in 0..buf.len() * 8 {
            let mut corrupted = buf.to_vec();
            corrupted[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify_crc8(&corrupted), "bit {bit} flip went undetected");
        }
    }

    #[test]
    fn crc16_detects_every_single_bit_flip() {
        let mut buf = BytesMut::from(&b"\x5a\x08\x10\x00\x00robolink payload"[..]);
        append_crc16(&mut buf);

        for bit in 0..buf.len() * 8 {
            let mut corrupted = buf.to_vec();
            corrupted[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify_crc16(&corrupted), "bit {bit} flip went undetected");
        }
    }

    #[test]
    fn too_short_buffers_never_verify() {
        assert!(!verify_crc8(&[]));
        assert!(!verify_crc16(&[0x12]));
    }
}
