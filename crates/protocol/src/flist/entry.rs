//! crates/protocol/src/flist/entry.rs
//!
//! The in-memory file record.
//!
//! An entry stores its name split into a pool-shared dirname and a
//! non-empty basename; a dirname of `None` means the entry sits in the
//! transfer root, and a basename of exactly `.` marks a
//! user-named transfer root. Optional metadata (ownership, device numbers, symlink target,
//! hard-link key, checksum) is carried only when the matching preserve
//! option put it there.
//!
//! A *cleared* entry is one the duplicate cleaner logically removed: its
//! basename becomes empty and its `depth`/`size` slots are reused as
//! forward/backward distances to the nearest active neighbors, which the
//! lookup chases and lazily tightens.

use std::path::Path;
use std::sync::Arc;

use super::mode;
use super::name::{file_depth, split_dirname};

/// Entry is a user-specified transfer root.
pub const FLAG_TOP_DIR: u16 = 1 << 0;
/// Entry participates in recursion/deletion below a transfer root.
pub const FLAG_XFER_DIR: u16 = 1 << 1;
/// Directory is a mount point that must not be descended.
pub const FLAG_MOUNT_DIR: u16 = 1 << 2;
/// Entry carries a hard-link key.
pub const FLAG_HLINKED: u16 = 1 << 3;
/// Entry's length needed more than 32 bits.
pub const FLAG_LENGTH64: u16 = 1 << 4;

/// Device/inode pair used downstream to group hard links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HardLinkKey {
    /// Device the inode lives on.
    pub dev: u64,
    /// Inode number.
    pub ino: u64,
}

/// One file-list record.
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub(crate) flags: u16,
    pub(crate) mode: u32,
    pub(crate) modtime: i64,
    pub(crate) size: u64,
    pub(crate) uid: Option<u32>,
    pub(crate) gid: Option<u32>,
    pub(crate) rdev: Option<(u32, u32)>,
    pub(crate) dirname: Option<Arc<str>>,
    pub(crate) basename: String,
    pub(crate) symlink_target: Option<String>,
    pub(crate) hardlink: Option<HardLinkKey>,
    pub(crate) checksum: Option<Vec<u8>>,
    pub(crate) depth: i32,
}

impl FileEntry {
    fn with_mode(path: &Path, mode: u32) -> Self {
        let name = path.to_string_lossy();
        let (dirname, basename) = split_dirname(&name);
        let mut entry = Self {
            flags: 0,
            mode,
            modtime: 0,
            size: 0,
            uid: None,
            gid: None,
            rdev: None,
            dirname: dirname.map(Arc::from),
            basename: basename.to_owned(),
            symlink_target: None,
            hardlink: None,
            checksum: None,
            depth: 0,
        };
        entry.recompute_depth();
        entry
    }

    /// Creates an entry with an explicit mode word; the builder's entry
    /// point when the type comes from a stat call.
    pub fn from_mode(path: impl AsRef<Path>, mode: u32) -> Self {
        Self::with_mode(path.as_ref(), mode)
    }

    /// Creates a regular-file entry.
    pub fn new_file(path: impl AsRef<Path>, size: u64, perms: u32) -> Self {
        let mut entry = Self::with_mode(path.as_ref(), mode::S_IFREG | perms);
        entry.size = size;
        if size > u64::from(u32::MAX) {
            entry.flags |= FLAG_LENGTH64;
        }
        entry
    }

    /// Creates a directory entry.
    pub fn new_directory(path: impl AsRef<Path>, perms: u32) -> Self {
        Self::with_mode(path.as_ref(), mode::S_IFDIR | perms)
    }

    /// Creates a symlink entry pointing at `target`.
    pub fn new_symlink(path: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        let mut entry = Self::with_mode(path.as_ref(), mode::S_IFLNK | 0o777);
        entry.symlink_target = Some(target.as_ref().to_string_lossy().into_owned());
        entry
    }

    /// Creates a block-device entry.
    pub fn new_block_device(path: impl AsRef<Path>, perms: u32, major: u32, minor: u32) -> Self {
        let mut entry = Self::with_mode(path.as_ref(), mode::S_IFBLK | perms);
        entry.rdev = Some((major, minor));
        entry
    }

    /// Creates a character-device entry.
    pub fn new_char_device(path: impl AsRef<Path>, perms: u32, major: u32, minor: u32) -> Self {
        let mut entry = Self::with_mode(path.as_ref(), mode::S_IFCHR | perms);
        entry.rdev = Some((major, minor));
        entry
    }

    /// Creates a FIFO entry.
    pub fn new_fifo(path: impl AsRef<Path>, perms: u32) -> Self {
        Self::with_mode(path.as_ref(), mode::S_IFIFO | perms)
    }

    /// Creates a socket entry.
    pub fn new_socket(path: impl AsRef<Path>, perms: u32) -> Self {
        Self::with_mode(path.as_ref(), mode::S_IFSOCK | perms)
    }

    pub(crate) fn recompute_depth(&mut self) {
        self.depth = file_depth(self.dirname.as_deref());
        if self.is_dir() && self.basename == "." {
            self.depth -= 1;
        }
    }

    /// Mode word (type and permission bits).
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    /// Modification time, seconds since the epoch.
    pub const fn modtime(&self) -> i64 {
        self.modtime
    }

    /// Sets the modification time.
    pub fn set_mtime(&mut self, secs: i64) {
        self.modtime = secs;
    }

    /// Length in bytes (0 for non-regular entries on the wire).
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Sets the length in bytes.
    pub fn set_size(&mut self, size: u64) {
        self.size = size;
        if size > u64::from(u32::MAX) {
            self.flags |= FLAG_LENGTH64;
        } else {
            self.flags &= !FLAG_LENGTH64;
        }
    }

    /// Owner uid, when ownership is being preserved.
    pub const fn uid(&self) -> Option<u32> {
        self.uid
    }

    /// Sets the owner uid.
    pub fn set_uid(&mut self, uid: u32) {
        self.uid = Some(uid);
    }

    /// Group gid, when group ownership is being preserved.
    pub const fn gid(&self) -> Option<u32> {
        self.gid
    }

    /// Sets the group gid.
    pub fn set_gid(&mut self, gid: u32) {
        self.gid = Some(gid);
    }

    /// Device major number for device/special entries.
    pub fn rdev_major(&self) -> Option<u32> {
        self.rdev.map(|(major, _)| major)
    }

    /// Device minor number for device/special entries.
    pub fn rdev_minor(&self) -> Option<u32> {
        self.rdev.map(|(_, minor)| minor)
    }

    /// Records the device pair for a device/special entry.
    pub fn set_rdev(&mut self, major: u32, minor: u32) {
        self.rdev = Some((major, minor));
    }

    /// Symlink target, when the entry is a symlink.
    pub fn symlink_target(&self) -> Option<&str> {
        self.symlink_target.as_deref()
    }

    /// Records the symlink target.
    pub fn set_symlink_target(&mut self, target: impl Into<String>) {
        self.symlink_target = Some(target.into());
    }

    /// Hard-link grouping key, when one was recorded.
    pub const fn hardlink_key(&self) -> Option<HardLinkKey> {
        self.hardlink
    }

    /// Records a hard-link grouping key.
    pub fn set_hardlink_key(&mut self, key: HardLinkKey) {
        self.hardlink = Some(key);
        self.flags |= FLAG_HLINKED;
    }

    /// Full-file checksum bytes, when checksumming was requested.
    pub fn checksum(&self) -> Option<&[u8]> {
        self.checksum.as_deref()
    }

    /// Records a full-file checksum.
    pub fn set_checksum(&mut self, sum: Vec<u8>) {
        self.checksum = Some(sum);
    }

    /// Entry flag bits (`FLAG_*`).
    pub const fn flags(&self) -> u16 {
        self.flags
    }

    /// Sets the given flag bits.
    pub fn add_flags(&mut self, flags: u16) {
        self.flags |= flags;
    }

    /// True when the given flag bits are all set.
    pub const fn has_flags(&self, flags: u16) -> bool {
        self.flags & flags == flags
    }

    /// Dirname component; `None` for entries in the transfer root.
    pub fn dirname(&self) -> Option<&str> {
        self.dirname.as_deref()
    }

    pub(crate) fn set_dirname(&mut self, dirname: Option<Arc<str>>) {
        self.dirname = dirname;
        self.recompute_depth();
    }

    /// Basename component; never empty for an active entry.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Full name as the peers know it: `dirname/basename`.
    pub fn full_name(&self) -> String {
        match &self.dirname {
            Some(dirname) => format!("{dirname}/{}", self.basename),
            None => self.basename.clone(),
        }
    }

    /// Dirname element count plus one; `.` roots count as depth zero.
    pub const fn depth(&self) -> i32 {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: i32) {
        self.depth = depth;
    }

    /// True for directory entries.
    pub const fn is_dir(&self) -> bool {
        mode::is_dir(self.mode)
    }

    /// True for regular-file entries.
    pub const fn is_regular(&self) -> bool {
        mode::is_regular(self.mode)
    }

    /// True for symlink entries.
    pub const fn is_symlink(&self) -> bool {
        mode::is_symlink(self.mode)
    }

    /// True for block/character device entries.
    pub const fn is_device(&self) -> bool {
        mode::is_device(self.mode)
    }

    /// True for block-device entries.
    pub const fn is_block_device(&self) -> bool {
        self.mode & mode::S_IFMT == mode::S_IFBLK
    }

    /// True for character-device entries.
    pub const fn is_char_device(&self) -> bool {
        self.mode & mode::S_IFMT == mode::S_IFCHR
    }

    /// True for FIFO/socket entries.
    pub const fn is_special(&self) -> bool {
        mode::is_special(self.mode)
    }

    /// True while the entry has not been cleared by the duplicate cleaner.
    pub fn is_active(&self) -> bool {
        !self.basename.is_empty()
    }

    /// Logically removes the entry, leaving unit skip cursors behind.
    pub(crate) fn clear(&mut self) {
        *self = Self {
            flags: 0,
            mode: 0,
            modtime: 0,
            size: 1,
            uid: None,
            gid: None,
            rdev: None,
            dirname: None,
            basename: String::new(),
            symlink_target: None,
            hardlink: None,
            checksum: None,
            depth: 1,
        };
    }

    /// Distance forward to the next possibly-active slot (cleared entries).
    pub(crate) const fn skip_forward(&self) -> isize {
        self.depth as isize
    }

    pub(crate) fn set_skip_forward(&mut self, distance: isize) {
        self.depth = distance as i32;
    }

    /// Distance backward to the previous possibly-active slot.
    pub(crate) const fn skip_back(&self) -> isize {
        self.size as isize
    }

    pub(crate) fn set_skip_back(&mut self, distance: isize) {
        self.size = distance as u64;
    }
}
