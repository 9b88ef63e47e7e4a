//! crates/filters/src/error.rs
//!
//! Error types for rule loading and exchange.

use std::io;

use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while loading, compiling, or exchanging rules.
#[derive(Debug, Error)]
pub enum FilterError {
    /// I/O error reading a rule file.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// Wire-level error while exchanging the rule list.
    #[error("protocol error: {0}")]
    Protocol(
        #[from]
        #[source]
        protocol::ProtocolError,
    ),
    /// A pattern exceeded the path length bound.
    #[error("pattern of {len} bytes exceeds the {limit}-byte limit")]
    PatternTooLong {
        /// Length of the offending pattern.
        len: usize,
        /// The bound it violated.
        limit: usize,
    },
}
