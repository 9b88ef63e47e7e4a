//! crates/protocol/src/flist/mod.rs
//!
//! The file-list model: entries, the list container, the path-aware
//! comparator, the sort/duplicate cleaner, the cursor-chasing lookup, and
//! the streaming writer/reader pair.

pub mod clean;
pub mod compare;
pub mod entry;
mod find;
pub mod list;
pub mod mode;
pub mod name;
pub mod pool;
mod reader;
mod writer;

pub use clean::{CleanOptions, sort_and_clean_file_list, sort_file_list};
pub use compare::compare_file_entries;
pub use entry::{
    FLAG_HLINKED, FLAG_LENGTH64, FLAG_MOUNT_DIR, FLAG_TOP_DIR, FLAG_XFER_DIR, FileEntry,
    HardLinkKey,
};
pub use list::{FileList, FlistStats};
pub use pool::DirnamePool;
pub use reader::FileListReader;
pub use writer::FileListWriter;
