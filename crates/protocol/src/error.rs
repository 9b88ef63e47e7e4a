//! crates/protocol/src/error.rs
//!
//! Error types for protocol encoding and decoding.

use std::io;

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding the file-list stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// I/O error on the peer channel.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// A received length or name exceeded its protocol bound. Fatal on the
    /// receiving side: the delta state can no longer be trusted.
    #[error("overflow in {context}: {value} exceeds {limit}")]
    Overflow {
        /// Which field overflowed.
        context: &'static str,
        /// The offending value.
        value: u64,
        /// The bound it violated.
        limit: u64,
    },
    /// A received name was not valid UTF-8.
    #[error("received name is not valid UTF-8")]
    InvalidName(#[from] std::string::FromUtf8Error),
    /// The peer requested a protocol version outside the supported range.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
}
