//! crates/protocol/src/wire/file_entry_decode.rs
//!
//! Field-level decoders, the duals of [`super::file_entry`].

use std::io::Read;

use crate::codec::{read_byte, read_int};
use crate::error::ProtocolResult;
use crate::version::ProtocolVersion;
use crate::wire::file_entry::{
    XMIT_RDEV_MINOR_IS_SMALL, XMIT_SAME_RDEV_MAJOR, XMIT_SAME_RDEV_PRE28,
};

/// Maps a wire mode to its in-memory form; the inverse of
/// [`super::file_entry::to_wire_mode`].
pub const fn from_wire_mode(mode: u32) -> u32 {
    mode
}

/// Splits the single pre-28 device word back into major/minor.
pub const fn split_rdev(rdev: u32) -> (u32, u32) {
    (rdev >> 8, rdev & 0xFF)
}

/// Reads the device fields not elided by `flags`.
///
/// `prev` supplies the elided halves: the full pair before protocol 28,
/// the major from 28 on.
pub fn decode_rdev<R: Read + ?Sized>(
    r: &mut R,
    flags: u16,
    prev: (u32, u32),
    protocol: ProtocolVersion,
) -> ProtocolResult<(u32, u32)> {
    if !protocol.has_split_rdev() {
        if flags & XMIT_SAME_RDEV_PRE28 != 0 {
            return Ok(prev);
        }
        return Ok(split_rdev(read_int(r)? as u32));
    }
    let major = if flags & XMIT_SAME_RDEV_MAJOR != 0 {
        prev.0
    } else {
        read_int(r)? as u32
    };
    let minor = if flags & XMIT_RDEV_MINOR_IS_SMALL != 0 {
        u32::from(read_byte(r)?)
    } else {
        read_int(r)? as u32
    };
    Ok((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::file_entry::{calculate_device_flags, combine_rdev, encode_rdev};
    use std::io::Cursor;

    #[test]
    fn split_inverts_combine_for_byte_minors() {
        for (major, minor) in [(8, 0), (8, 1), (1, 255), (136, 7)] {
            assert_eq!(split_rdev(combine_rdev(major, minor)), (major, minor));
        }
    }

    #[test]
    fn rdev_roundtrip_across_protocols() {
        for protocol in [
            ProtocolVersion::V26,
            ProtocolVersion::V27,
            ProtocolVersion::V28,
            ProtocolVersion::V29,
        ] {
            let (major, minor) = (8, 17);
            let flags = calculate_device_flags(major, minor, (0, 0), 0, protocol);
            let mut buf = Vec::new();
            encode_rdev(&mut buf, major, minor, flags, protocol).unwrap();
            let mut cursor = Cursor::new(&buf);
            let decoded = decode_rdev(&mut cursor, flags, (0, 0), protocol).unwrap();
            assert_eq!(decoded, (major, minor), "protocol {protocol}");
            assert_eq!(cursor.position() as usize, buf.len());
        }
    }

    #[test]
    fn rdev_same_major_elides_field() {
        let protocol = ProtocolVersion::V29;
        let flags = calculate_device_flags(8, 300, (8, 1), 8, protocol);
        let mut buf = Vec::new();
        encode_rdev(&mut buf, 8, 300, flags, protocol).unwrap();
        // Only the 32-bit minor travels.
        assert_eq!(buf.len(), 4);
        let decoded = decode_rdev(&mut Cursor::new(&buf), flags, (8, 0), protocol).unwrap();
        assert_eq!(decoded, (8, 300));
    }

    #[test]
    fn rdev_pre28_same_pair_is_empty() {
        let protocol = ProtocolVersion::V27;
        let flags = calculate_device_flags(8, 1, (8, 1), 0, protocol);
        let mut buf = Vec::new();
        encode_rdev(&mut buf, 8, 1, flags, protocol).unwrap();
        assert!(buf.is_empty());
        let decoded = decode_rdev(&mut Cursor::new(&buf), flags, (8, 1), protocol).unwrap();
        assert_eq!(decoded, (8, 1));
    }
}
