//! crates/protocol/src/wire/file_entry.rs
//!
//! Entry flag bits and field encoders.
//!
//! Every entry starts with a flag byte; protocol 28 added an optional
//! second byte, announced by [`XMIT_EXTENDED_FLAGS`] in the first. The
//! `SAME_*` bits elide fields that repeat the previous entry's value. A
//! real entry must never encode as a bare zero byte - that is the stream
//! terminator - so the writer sets a harmless filler bit when nothing else
//! is on.

use std::io::Write;

use crate::codec::{write_byte, write_int};
use crate::error::ProtocolResult;
use crate::version::ProtocolVersion;

/// Entry is a user-specified transfer root (harmless filler on non-dirs).
pub const XMIT_TOP_DIR: u16 = 1 << 0;
/// Mode equals the previous entry's.
pub const XMIT_SAME_MODE: u16 = 1 << 1;
/// A second flag byte follows (protocol >= 28).
pub const XMIT_EXTENDED_FLAGS: u16 = 1 << 2;
/// Device numbers equal the previous entry's (protocols < 28 only, where
/// the extended-flags bit is never on the wire).
pub const XMIT_SAME_RDEV_PRE28: u16 = XMIT_EXTENDED_FLAGS;
/// Uid equals the previous entry's.
pub const XMIT_SAME_UID: u16 = 1 << 3;
/// Gid equals the previous entry's.
pub const XMIT_SAME_GID: u16 = 1 << 4;
/// Name shares a prefix with the previous entry's.
pub const XMIT_SAME_NAME: u16 = 1 << 5;
/// Name suffix length needs a full int.
pub const XMIT_LONG_NAME: u16 = 1 << 6;
/// Modification time equals the previous entry's.
pub const XMIT_SAME_TIME: u16 = 1 << 7;
/// Device major equals the previous entry's (protocol >= 28).
pub const XMIT_SAME_RDEV_MAJOR: u16 = 1 << 8;
/// A hard-link key follows.
pub const XMIT_HAS_IDEV_DATA: u16 = 1 << 9;
/// Hard-link device equals the previous entry's (protocol >= 28).
pub const XMIT_SAME_DEV: u16 = 1 << 10;
/// Device minor fits in one byte (protocol >= 28).
pub const XMIT_RDEV_MINOR_IS_SMALL: u16 = 1 << 11;

/// Maps an in-memory mode to its wire form.
///
/// The wire pins the symlink type to `0o120000`; entry modes already use
/// the canonical POSIX values, so this is the identity mapping here and
/// exists to mark the boundary where a platform with different native
/// values would convert.
pub const fn to_wire_mode(mode: u32) -> u32 {
    mode
}

/// Combines major/minor into the single pre-28 device word.
///
/// The legacy encoding is the classic 8-bit split; minors above 255 do not
/// survive it, which is the historical behavior of those protocols.
pub const fn combine_rdev(major: u32, minor: u32) -> u32 {
    (major << 8) | (minor & 0xFF)
}

/// Writes the device fields not elided by `flags`.
pub fn encode_rdev<W: Write + ?Sized>(
    w: &mut W,
    major: u32,
    minor: u32,
    flags: u16,
    protocol: ProtocolVersion,
) -> ProtocolResult<()> {
    if !protocol.has_split_rdev() {
        if flags & XMIT_SAME_RDEV_PRE28 == 0 {
            write_int(w, combine_rdev(major, minor) as i32)?;
        }
        return Ok(());
    }
    if flags & XMIT_SAME_RDEV_MAJOR == 0 {
        write_int(w, major as i32)?;
    }
    if flags & XMIT_RDEV_MINOR_IS_SMALL != 0 {
        write_byte(w, minor as u8)?;
    } else {
        write_int(w, minor as i32)?;
    }
    Ok(())
}

/// Computes the device-related flag bits for an entry.
pub fn calculate_device_flags(
    major: u32,
    minor: u32,
    prev: (u32, u32),
    prev_major: u32,
    protocol: ProtocolVersion,
) -> u16 {
    if !protocol.has_split_rdev() {
        if (major, minor) == prev {
            return XMIT_SAME_RDEV_PRE28;
        }
        return 0;
    }
    let mut flags = 0;
    if major == prev_major {
        flags |= XMIT_SAME_RDEV_MAJOR;
    }
    if minor <= 0xFF {
        flags |= XMIT_RDEV_MINOR_IS_SMALL;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre28_flag_aliases_extended_bit() {
        assert_eq!(XMIT_SAME_RDEV_PRE28, XMIT_EXTENDED_FLAGS);
    }

    #[test]
    fn combine_rdev_uses_classic_split() {
        assert_eq!(combine_rdev(8, 1), 0x801);
        assert_eq!(combine_rdev(0, 255), 255);
    }

    #[test]
    fn device_flags_same_major() {
        let flags = calculate_device_flags(8, 300, (0, 0), 8, ProtocolVersion::V28);
        assert_ne!(flags & XMIT_SAME_RDEV_MAJOR, 0);
        assert_eq!(flags & XMIT_RDEV_MINOR_IS_SMALL, 0);
    }

    #[test]
    fn device_flags_small_minor() {
        let flags = calculate_device_flags(8, 5, (0, 0), 0, ProtocolVersion::V29);
        assert_eq!(flags & XMIT_SAME_RDEV_MAJOR, 0);
        assert_ne!(flags & XMIT_RDEV_MINOR_IS_SMALL, 0);
    }

    #[test]
    fn device_flags_pre28_same_pair() {
        let flags = calculate_device_flags(8, 1, (8, 1), 0, ProtocolVersion::V27);
        assert_eq!(flags, XMIT_SAME_RDEV_PRE28);
        let flags = calculate_device_flags(8, 2, (8, 1), 0, ProtocolVersion::V27);
        assert_eq!(flags, 0);
    }
}
