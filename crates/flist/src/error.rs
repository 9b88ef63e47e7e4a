//! crates/flist/src/error.rs
//!
//! Error types for file-list generation.

use std::io;

use thiserror::Error;

/// Result type for file-list operations.
pub type FileListResult<T> = Result<T, FileListError>;

/// Latched I/O-error bit: a general read/stat failure was skipped over.
pub const IOERR_GENERAL: i32 = 1 << 0;
/// Latched I/O-error bit: an entry vanished between readdir and stat.
pub const IOERR_VANISHED: i32 = 1 << 1;

/// Errors that abort file-list generation.
///
/// Most per-entry failures do not surface here; they latch a bit into the
/// list's `io_error` statistics and the entry is skipped. These variants
/// are the fatal cases.
#[derive(Debug, Error)]
pub enum FileListError {
    /// I/O error outside the per-entry latching paths.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// Wire-level failure while streaming the list.
    #[error("protocol error: {0}")]
    Protocol(
        #[from]
        #[source]
        protocol::ProtocolError,
    ),
    /// Failure loading or exchanging filter rules.
    #[error("filter error: {0}")]
    Filter(
        #[from]
        #[source]
        filters::FilterError,
    ),
    /// A `..` component inside the active part of a relative-mode path.
    #[error("found \"..\" dir in relative path: {0}")]
    UnsafeRelativePath(String),
    /// A root argument overflowed the path bound during normalization.
    #[error("path too long: {0}")]
    PathTooLong(String),
}
