//! crates/protocol/src/version.rs
//!
//! Protocol version numbers and the capability cutoffs between them.

use std::fmt;

use crate::MD4_SUM_LENGTH;
use crate::error::{ProtocolError, ProtocolResult};

/// A negotiated protocol version.
///
/// The file-list framing changed several times over the protocol's history;
/// the capability methods below encode the cutoffs this crate honors:
///
/// - 21: full-width MD4 checksums (2 truncated bytes before).
/// - 26: 64-bit hard-link keys (two 32-bit words before).
/// - 28: two-byte extended entry flags and the split major/minor device
///   encoding (a single combined word before).
/// - 29: directory-aware sort order and the matching duplicate rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(u8);

impl ProtocolVersion {
    /// Protocol 20.
    pub const V20: Self = Self(20);
    /// Protocol 21.
    pub const V21: Self = Self(21);
    /// Protocol 22.
    pub const V22: Self = Self(22);
    /// Protocol 23.
    pub const V23: Self = Self(23);
    /// Protocol 24.
    pub const V24: Self = Self(24);
    /// Protocol 25.
    pub const V25: Self = Self(25);
    /// Protocol 26.
    pub const V26: Self = Self(26);
    /// Protocol 27.
    pub const V27: Self = Self(27);
    /// Protocol 28.
    pub const V28: Self = Self(28);
    /// Protocol 29.
    pub const V29: Self = Self(29);

    /// Oldest version this implementation speaks.
    pub const OLDEST: Self = Self::V20;
    /// Newest version this implementation speaks.
    pub const NEWEST: Self = Self::V29;

    /// Validates a raw version number from negotiation.
    pub const fn new(raw: u8) -> ProtocolResult<Self> {
        if raw >= Self::OLDEST.0 && raw <= Self::NEWEST.0 {
            Ok(Self(raw))
        } else {
            Err(ProtocolError::UnsupportedVersion(raw))
        }
    }

    /// Raw version number.
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Entry flags may occupy two bytes (protocol >= 28).
    pub const fn has_extended_flags(self) -> bool {
        self.0 >= 28
    }

    /// Device numbers travel as separate major/minor fields (protocol >= 28).
    pub const fn has_split_rdev(self) -> bool {
        self.0 >= 28
    }

    /// Hard-link keys are 64-bit dev/ino pairs (protocol >= 26).
    pub const fn has_wide_hardlink_keys(self) -> bool {
        self.0 >= 26
    }

    /// Directories sort with an assumed trailing slash, after same-named
    /// non-directories, and `.` sorts first (protocol >= 29).
    pub const fn sorts_directories_specially(self) -> bool {
        self.0 >= 29
    }

    /// Width of the per-file checksum carried when checksumming is on.
    pub const fn checksum_len(self) -> usize {
        if self.0 < 21 { 2 } else { MD4_SUM_LENGTH }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
