//! crates/protocol/src/flist/reader.rs
//!
//! Receiver side of the file-list stream.
//!
//! The reader mirrors the writer's delta state and reconstitutes each
//! entry from whatever fields actually arrived. Names are reassembled from
//! the shared prefix plus the transmitted suffix, then cleaned; dirnames
//! are interned so a run of entries in one directory shares a single
//! allocation. A zero flag byte ends the stream and resets the state.

use std::io::Read;

use super::entry::{FLAG_HLINKED, FLAG_LENGTH64, FLAG_TOP_DIR, FLAG_XFER_DIR, FileEntry,
    HardLinkKey};
use super::mode;
use super::name::{clean_fname, file_depth, split_dirname};
use super::pool::DirnamePool;
use crate::MAXPATHLEN;
use crate::codec::{read_buf, read_byte, read_int, read_longint};
use crate::error::{ProtocolError, ProtocolResult};
use crate::version::ProtocolVersion;
use crate::wire::file_entry::{
    XMIT_EXTENDED_FLAGS, XMIT_HAS_IDEV_DATA, XMIT_LONG_NAME, XMIT_SAME_DEV, XMIT_SAME_GID,
    XMIT_SAME_MODE, XMIT_SAME_NAME, XMIT_SAME_TIME, XMIT_SAME_UID, XMIT_TOP_DIR,
};
use crate::wire::file_entry_decode::{decode_rdev, from_wire_mode};

/// Decodes the file-list stream entry by entry.
#[derive(Debug)]
pub struct FileListReader {
    protocol: ProtocolVersion,
    preserve_uid: bool,
    preserve_gid: bool,
    preserve_links: bool,
    preserve_devices: bool,
    preserve_specials: bool,
    preserve_hard_links: bool,
    always_checksum: bool,
    recurse: bool,
    relative_paths: bool,
    prev_modtime: i64,
    prev_mode: u32,
    prev_dev: u64,
    prev_rdev: (u32, u32),
    prev_rdev_major: u32,
    prev_uid: u32,
    prev_gid: u32,
    prev_name: Vec<u8>,
    pool: DirnamePool,
    in_del_hier: bool,
    del_hier_name_len: usize,
}

impl FileListReader {
    /// Creates a reader for `protocol` with every option off.
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
            recurse: false,
            relative_paths: false,
            prev_modtime: 0,
            prev_mode: 0,
            prev_dev: 0,
            prev_rdev: (0, 0),
            prev_rdev_major: 0,
            prev_uid: 0,
            prev_gid: 0,
            prev_name: Vec::new(),
            pool: DirnamePool::new(),
            in_del_hier: false,
            del_hier_name_len: 0,
        }
    }

    /// Expect uid fields.
    pub const fn with_preserve_uid(mut self, on: bool) -> Self {
        self.preserve_uid = on;
        self
    }

    /// Expect gid fields.
    pub const fn with_preserve_gid(mut self, on: bool) -> Self {
        self.preserve_gid = on;
        self
    }

    /// Expect symlink targets.
    pub const fn with_preserve_links(mut self, on: bool) -> Self {
        self.preserve_links = on;
        self
    }

    /// Expect device numbers for block/char devices.
    pub const fn with_preserve_devices(mut self, on: bool) -> Self {
        self.preserve_devices = on;
        self
    }

    /// Expect device fields for FIFOs and sockets too.
    pub const fn with_preserve_specials(mut self, on: bool) -> Self {
        self.preserve_specials = on;
        self
    }

    /// Expect hard-link keys.
    pub const fn with_preserve_hard_links(mut self, on: bool) -> Self {
        self.preserve_hard_links = on;
        self
    }

    /// Expect full-file checksums.
    pub const fn with_checksums(mut self, on: bool) -> Self {
        self.always_checksum = on;
        self
    }

    /// The transfer is recursive; directories below a transfer root get
    /// the transfer-dir flag.
    pub const fn with_recurse(mut self, on: bool) -> Self {
        self.recurse = on;
        self
    }

    /// Names arrived in relative-paths form, which narrows the
    /// transfer-root hierarchy test.
    pub const fn with_relative_paths(mut self, on: bool) -> Self {
        self.relative_paths = on;
        self
    }

    /// Negotiated protocol version.
    pub const fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Decodes the next entry, or `None` at the stream terminator.
    pub fn read_entry<R: Read + ?Sized>(
        &mut self,
        r: &mut R,
    ) -> ProtocolResult<Option<FileEntry>> {
        let flag_low = read_byte(r)?;
        if flag_low == 0 {
            self.reset();
            return Ok(None);
        }
        let mut flags = u16::from(flag_low);
        if self.protocol.has_extended_flags() && flags & XMIT_EXTENDED_FLAGS != 0 {
            flags |= u16::from(read_byte(r)?) << 8;
        }

        let mut l1 = if flags & XMIT_SAME_NAME != 0 {
            usize::from(read_byte(r)?)
        } else {
            0
        };
        let l2 = if flags & XMIT_LONG_NAME != 0 {
            let value = read_int(r)?;
            if value < 0 {
                return Err(ProtocolError::Overflow {
                    context: "name suffix length",
                    value: value as u64,
                    limit: MAXPATHLEN as u64,
                });
            }
            value as usize
        } else {
            usize::from(read_byte(r)?)
        };
        if l2 >= MAXPATHLEN - l1 {
            return Err(ProtocolError::Overflow {
                context: "name suffix length",
                value: l2 as u64,
                limit: (MAXPATHLEN - l1) as u64,
            });
        }
        l1 = l1.min(self.prev_name.len());

        let mut raw_name = Vec::with_capacity(l1 + l2);
        raw_name.extend_from_slice(&self.prev_name[..l1]);
        raw_name.resize(l1 + l2, 0);
        read_buf(r, &mut raw_name[l1..])?;
        self.prev_name = raw_name.clone();

        let cleaned = clean_fname(&String::from_utf8(raw_name.clone())?);
        let (dirname, basename) = split_dirname(&cleaned);
        let dirname = dirname.map(|d| self.pool.intern(d));
        let basename = basename.to_owned();

        let mut size = read_longint(r)? as u64;
        if flags & XMIT_SAME_TIME == 0 {
            self.prev_modtime = i64::from(read_int(r)?);
        }
        if flags & XMIT_SAME_MODE == 0 {
            self.prev_mode = from_wire_mode(read_int(r)? as u32);
        }
        let mode = self.prev_mode;

        if self.preserve_uid && flags & XMIT_SAME_UID == 0 {
            self.prev_uid = read_int(r)? as u32;
        }
        if self.preserve_gid && flags & XMIT_SAME_GID == 0 {
            self.prev_gid = read_int(r)? as u32;
        }

        let device_entry = (self.preserve_devices && mode::is_device(mode))
            || (self.preserve_specials && mode::is_special(mode));
        let mut rdev = None;
        if device_entry {
            let prev = if self.protocol.has_split_rdev() {
                (self.prev_rdev_major, 0)
            } else {
                self.prev_rdev
            };
            let pair = decode_rdev(r, flags, prev, self.protocol)?;
            self.prev_rdev = pair;
            self.prev_rdev_major = pair.0;
            rdev = Some(pair);
            size = 0;
        } else if !self.protocol.has_split_rdev() {
            self.prev_rdev = (0, 0);
        }

        let symlink_target = if self.preserve_links && mode::is_symlink(mode) {
            let len = read_int(r)?;
            if len < 0 || len as usize >= MAXPATHLEN {
                return Err(ProtocolError::Overflow {
                    context: "symlink target length",
                    value: len as u64,
                    limit: MAXPATHLEN as u64,
                });
            }
            let mut target = vec![0u8; len as usize];
            read_buf(r, &mut target)?;
            Some(String::from_utf8(target)?)
        } else {
            None
        };

        let mut entry_flags: u16 = 0;
        let mut hardlink = None;
        if self.preserve_hard_links {
            // Before protocol 28 every regular entry carries a key.
            let has_idev = flags & XMIT_HAS_IDEV_DATA != 0
                || (!self.protocol.has_extended_flags() && mode::is_regular(mode));
            if has_idev {
                let key = if self.protocol.has_wide_hardlink_keys() {
                    if flags & XMIT_SAME_DEV == 0 {
                        self.prev_dev = read_longint(r)? as u64;
                    }
                    HardLinkKey {
                        dev: self.prev_dev,
                        ino: read_longint(r)? as u64,
                    }
                } else {
                    HardLinkKey {
                        dev: u64::from(read_int(r)? as u32),
                        ino: u64::from(read_int(r)? as u32),
                    }
                };
                hardlink = Some(key);
                entry_flags |= FLAG_HLINKED;
            }
        }

        let checksum = if self.always_checksum
            && (mode::is_regular(mode) || !self.protocol.has_extended_flags())
        {
            let mut sum = vec![0u8; self.protocol.checksum_len()];
            read_buf(r, &mut sum)?;
            // Before protocol 28 non-regular entries carry a null sum;
            // nothing keeps it.
            mode::is_regular(mode).then_some(sum)
        } else {
            None
        };

        let mut depth = file_depth(dirname.as_deref());
        if mode::is_dir(mode) {
            if basename == "." {
                depth -= 1;
            }
            if flags & XMIT_TOP_DIR != 0 {
                self.in_del_hier = self.recurse;
                self.del_hier_name_len = if depth == 0 { 0 } else { l1 + l2 };
                if self.relative_paths
                    && self.del_hier_name_len > 2
                    && raw_name.get(self.del_hier_name_len - 1) == Some(&b'.')
                    && raw_name.get(self.del_hier_name_len - 2) == Some(&b'/')
                {
                    self.del_hier_name_len -= 2;
                }
                entry_flags |= FLAG_TOP_DIR | FLAG_XFER_DIR;
            } else if self.in_del_hier {
                if !self.relative_paths
                    || self.del_hier_name_len == 0
                    || (l1 >= self.del_hier_name_len
                        && raw_name.get(self.del_hier_name_len) == Some(&b'/'))
                {
                    entry_flags |= FLAG_XFER_DIR;
                } else {
                    self.in_del_hier = false;
                }
            }
        }
        if size > u64::from(u32::MAX) && mode::is_regular(mode) {
            entry_flags |= FLAG_LENGTH64;
        }

        Ok(Some(FileEntry {
            flags: entry_flags,
            mode,
            modtime: self.prev_modtime,
            size,
            uid: self.preserve_uid.then_some(self.prev_uid),
            gid: self.preserve_gid.then_some(self.prev_gid),
            rdev,
            dirname,
            basename,
            symlink_target,
            hardlink,
            checksum,
            depth,
        }))
    }

    /// Reads the latched I/O-error word the sender appends after the
    /// terminator.
    pub fn read_io_error<R: Read + ?Sized>(&self, r: &mut R) -> ProtocolResult<i32> {
        read_int(r)
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
        self.in_del_hier = false;
        self.del_hier_name_len = 0;
    }
}
