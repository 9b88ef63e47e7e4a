//! crates/protocol/src/wire/mod.rs
//!
//! Per-entry wire encodings: the `XMIT_*` flag bits and the field-level
//! encoders/decoders the file-list writer and reader are built from.

pub mod file_entry;
pub mod file_entry_decode;
