//! crates/protocol/src/flist/writer.rs
//!
//! Sender side of the file-list stream.
//!
//! The writer keeps the previous entry's metadata and name between calls
//! and elides whatever repeats, setting the matching `XMIT_SAME_*` bit
//! instead. The stream ends with a single zero byte, which also resets the
//! receiver's delta state, so the writer resets its own at the same point.

use std::io::Write;

use super::entry::{FLAG_TOP_DIR, FileEntry};
use super::mode;
use crate::codec::{write_buf, write_byte, write_int, write_longint, write_shortint};
use crate::error::ProtocolResult;
use crate::version::ProtocolVersion;
use crate::wire::file_entry::{
    XMIT_EXTENDED_FLAGS, XMIT_HAS_IDEV_DATA, XMIT_LONG_NAME, XMIT_SAME_DEV, XMIT_SAME_GID,
    XMIT_SAME_MODE, XMIT_SAME_NAME, XMIT_SAME_TIME, XMIT_SAME_UID, XMIT_TOP_DIR,
    calculate_device_flags, encode_rdev, to_wire_mode,
};

/// Streams file-list entries with delta compression.
#[derive(Debug)]
pub struct FileListWriter {
    protocol: ProtocolVersion,
    preserve_uid: bool,
    preserve_gid: bool,
    preserve_links: bool,
    preserve_devices: bool,
    preserve_specials: bool,
    preserve_hard_links: bool,
    always_checksum: bool,
    prev_modtime: i64,
    prev_mode: u32,
    prev_dev: u64,
    prev_rdev: (u32, u32),
    prev_rdev_major: u32,
    prev_uid: u32,
    prev_gid: u32,
    prev_name: Vec<u8>,
}

impl FileListWriter {
    /// Creates a writer for `protocol` with every option off.
    pub fn new(protocol: ProtocolVersion) -> Self {
        Self {
            protocol,
            preserve_uid: false,
            preserve_gid: false,
            preserve_links: false,
            preserve_devices: false,
            preserve_specials: false,
            preserve_hard_links: false,
            always_checksum: false,
            prev_modtime: 0,
            prev_mode: 0,
            prev_dev: 0,
            prev_rdev: (0, 0),
            prev_rdev_major: 0,
            prev_uid: 0,
            prev_gid: 0,
            prev_name: Vec::new(),
        }
    }

    /// Transmit uid fields.
    pub const fn with_preserve_uid(mut self, on: bool) -> Self {
        self.preserve_uid = on;
        self
    }

    /// Transmit gid fields.
    pub const fn with_preserve_gid(mut self, on: bool) -> Self {
        self.preserve_gid = on;
        self
    }

    /// Transmit symlink targets.
    pub const fn with_preserve_links(mut self, on: bool) -> Self {
        self.preserve_links = on;
        self
    }

    /// Transmit device numbers for block/char devices.
    pub const fn with_preserve_devices(mut self, on: bool) -> Self {
        self.preserve_devices = on;
        self
    }

    /// Transmit device fields for FIFOs and sockets too.
    pub const fn with_preserve_specials(mut self, on: bool) -> Self {
        self.preserve_specials = on;
        self
    }

    /// Transmit hard-link keys. Before protocol 28 every regular entry
    /// must then carry a key, since the receiver infers their presence.
    pub const fn with_preserve_hard_links(mut self, on: bool) -> Self {
        self.preserve_hard_links = on;
        self
    }

    /// Transmit full-file checksums.
    pub const fn with_checksums(mut self, on: bool) -> Self {
        self.always_checksum = on;
        self
    }

    /// Negotiated protocol version.
    pub const fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Encodes one entry.
    pub fn write_entry<W: Write + ?Sized>(
        &mut self,
        w: &mut W,
        file: &FileEntry,
    ) -> ProtocolResult<()> {
        let fname = file.full_name();
        let name = fname.as_bytes();
        let mode = file.mode();

        let mut flags = file.flags() & FLAG_TOP_DIR; // FLAG_TOP_DIR == XMIT_TOP_DIR

        if mode == self.prev_mode {
            flags |= XMIT_SAME_MODE;
        } else {
            self.prev_mode = mode;
        }

        let device_entry = (self.preserve_devices && mode::is_device(mode))
            || (self.preserve_specials && mode::is_special(mode));
        let rdev = file.rdev_major().zip(file.rdev_minor()).unwrap_or((0, 0));
        if device_entry {
            flags |= calculate_device_flags(
                rdev.0,
                rdev.1,
                self.prev_rdev,
                self.prev_rdev_major,
                self.protocol,
            );
            self.prev_rdev = rdev;
            self.prev_rdev_major = rdev.0;
        } else if !self.protocol.has_split_rdev() {
            self.prev_rdev = (0, 0);
        }

        let uid = file.uid().unwrap_or(0);
        if self.preserve_uid {
            if uid == self.prev_uid {
                flags |= XMIT_SAME_UID;
            } else {
                self.prev_uid = uid;
            }
        }
        let gid = file.gid().unwrap_or(0);
        if self.preserve_gid {
            if gid == self.prev_gid {
                flags |= XMIT_SAME_GID;
            } else {
                self.prev_gid = gid;
            }
        }
        if file.modtime() == self.prev_modtime {
            flags |= XMIT_SAME_TIME;
        } else {
            self.prev_modtime = file.modtime();
        }

        let idev = if self.preserve_hard_links {
            file.hardlink_key().filter(|key| key.dev != 0)
        } else {
            None
        };
        if let Some(key) = idev {
            if key.dev == self.prev_dev {
                if self.protocol.has_extended_flags() {
                    flags |= XMIT_SAME_DEV;
                }
            } else {
                self.prev_dev = key.dev;
            }
            flags |= XMIT_HAS_IDEV_DATA;
        }

        let mut l1 = 0;
        while l1 < self.prev_name.len().min(name.len()).min(255) && self.prev_name[l1] == name[l1]
        {
            l1 += 1;
        }
        let suffix = &name[l1..];
        let l2 = suffix.len();
        if l1 > 0 {
            flags |= XMIT_SAME_NAME;
        }
        if l2 > 255 {
            flags |= XMIT_LONG_NAME;
        }

        // A real entry must never encode as a zero flag byte (that is the
        // terminator). XMIT_TOP_DIR has no meaning on a non-dir and
        // XMIT_LONG_NAME merely widens the length field, so either one is
        // safe filler.
        if self.protocol.has_extended_flags() {
            if flags == 0 && !mode::is_dir(mode) {
                flags |= XMIT_TOP_DIR;
            }
            if flags & 0xFF00 != 0 || flags == 0 {
                flags |= XMIT_EXTENDED_FLAGS;
                write_shortint(w, flags)?;
            } else {
                write_byte(w, flags as u8)?;
            }
        } else {
            if flags & 0xFF == 0 {
                flags |= if mode::is_dir(mode) {
                    XMIT_LONG_NAME
                } else {
                    XMIT_TOP_DIR
                };
            }
            write_byte(w, flags as u8)?;
        }

        if flags & XMIT_SAME_NAME != 0 {
            write_byte(w, l1 as u8)?;
        }
        if flags & XMIT_LONG_NAME != 0 {
            write_int(w, l2 as i32)?;
        } else {
            write_byte(w, l2 as u8)?;
        }
        write_buf(w, suffix)?;

        write_longint(w, file.size() as i64)?;
        if flags & XMIT_SAME_TIME == 0 {
            write_int(w, file.modtime() as i32)?;
        }
        if flags & XMIT_SAME_MODE == 0 {
            write_int(w, to_wire_mode(mode) as i32)?;
        }
        if self.preserve_uid && flags & XMIT_SAME_UID == 0 {
            write_int(w, uid as i32)?;
        }
        if self.preserve_gid && flags & XMIT_SAME_GID == 0 {
            write_int(w, gid as i32)?;
        }
        if device_entry {
            encode_rdev(w, rdev.0, rdev.1, flags, self.protocol)?;
        }

        if self.preserve_links && mode::is_symlink(mode) {
            let target = file.symlink_target().unwrap_or("");
            write_int(w, target.len() as i32)?;
            write_buf(w, target.as_bytes())?;
        }

        if let Some(key) = idev {
            if self.protocol.has_wide_hardlink_keys() {
                if flags & XMIT_SAME_DEV == 0 {
                    write_longint(w, key.dev as i64)?;
                }
                write_longint(w, key.ino as i64)?;
            } else {
                write_int(w, key.dev as i32)?;
                write_int(w, key.ino as i32)?;
            }
        }

        if self.always_checksum
            && (mode::is_regular(mode) || !self.protocol.has_extended_flags())
        {
            // Non-regular entries before protocol 28 carry a null sum.
            let mut sum = vec![0u8; self.protocol.checksum_len()];
            if mode::is_regular(mode) {
                if let Some(bytes) = file.checksum() {
                    let n = bytes.len().min(sum.len());
                    sum[..n].copy_from_slice(&bytes[..n]);
                }
            }
            write_buf(w, &sum)?;
        }

        self.prev_name = name.to_vec();
        Ok(())
    }

    /// Writes the stream terminator, resets the delta state, and forwards
    /// the latched I/O-error word when one is given.
    pub fn write_end<W: Write + ?Sized>(
        &mut self,
        w: &mut W,
        io_error: Option<i32>,
    ) -> ProtocolResult<()> {
        write_byte(w, 0)?;
        self.reset();
        if let Some(error) = io_error {
            write_int(w, error)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.prev_modtime = 0;
        self.prev_mode = 0;
        self.prev_dev = 0;
        self.prev_rdev = (0, 0);
        self.prev_rdev_major = 0;
        self.prev_uid = 0;
        self.prev_gid = 0;
        self.prev_name.clear();
    }
}
