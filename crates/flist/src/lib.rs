#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! File-list generation and traversal.
//!
//! The sender walks its root arguments, filters every name through the
//! server and user rule lists, and records each accepted entry - streaming
//! it to the peer at the same time when a channel is given. The receiver
//! reconstitutes the stream, then both sides sort and de-duplicate their
//! copy identically so an index into the list means the same entry
//! everywhere.
//!
//! Entry points:
//!
//! - [`send_file_list`] - walk roots and stream the list to a writer.
//! - [`build_file_list`] - the same walk with no peer.
//! - [`recv_file_list`] - decode, sort, and clean a received list.
//! - [`get_dirlist`] - one-directory scan for the receiver's delete pass.
//!
//! All configuration travels in an explicit [`FileListOptions`] value;
//! per-entry filesystem failures latch [`IOERR_GENERAL`]/[`IOERR_VANISHED`]
//! bits into the list's statistics rather than aborting the walk.

mod error;
mod options;
mod stat;
mod walk;

pub use error::{FileListError, FileListResult, IOERR_GENERAL, IOERR_VANISHED};
pub use options::{FileListOptions, OneFileSystem};
pub use walk::{build_file_list, get_dirlist, recv_file_list, send_file_list};

// The entry and list types come from the protocol crate; re-export them so
// builder callers need only this crate.
pub use protocol::flist::{FileEntry, FileList, FlistStats, HardLinkKey};
