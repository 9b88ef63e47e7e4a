#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Wire protocol and in-memory model for the file list.
//!
//! A transfer's file list travels as a delta-compressed byte stream: each
//! entry is encoded relative to the previous one (shared name prefixes,
//! repeated modes, uids, timestamps), framed by a per-entry flag byte and
//! terminated by a zero byte. Both peers then sort their copy with the same
//! path-aware comparator and resolve duplicates identically, so an index
//! into the list means the same entry on either side.
//!
//! The crate is organized the way the stream is layered:
//!
//! - [`codec`] — little-endian channel primitives (`read_int`,
//!   `write_longint`, ...).
//! - [`wire`] — per-entry flag bits and field encodings.
//! - [`flist`] — the [`flist::FileEntry`] model, the [`flist::FileList`]
//!   container, the name comparator, the sort/duplicate cleaner, the
//!   cursor-chasing lookup, and the high-level
//!   [`flist::FileListWriter`]/[`flist::FileListReader`] pair that owns the
//!   delta state.
//!
//! Protocol versions 20 through 29 are supported; see [`ProtocolVersion`]
//! for the capability cutoffs.

pub mod codec;
mod error;
pub mod flist;
mod version;
pub mod wire;

pub use codec::{
    read_buf, read_byte, read_int, read_longint, read_shortint, write_buf, write_byte, write_int,
    write_longint, write_shortint,
};
pub use error::{ProtocolError, ProtocolResult};
pub use version::ProtocolVersion;

/// Upper bound for any path, name, or symlink target carried on the wire.
pub const MAXPATHLEN: usize = 4096;

/// Width of a full-file MD4 checksum.
pub const MD4_SUM_LENGTH: usize = 16;
