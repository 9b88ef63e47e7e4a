//! crates/flist/src/options.rs
//!
//! The explicit context object for list generation. Every knob the walker
//! or the codec consults lives here; nothing is process-global.

use protocol::ProtocolVersion;
use protocol::flist::{FileListReader, FileListWriter};

/// How `one_file_system` treats directories on another device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OneFileSystem {
    /// Cross devices freely.
    #[default]
    Off,
    /// List the mount-point directory but do not descend into it.
    MarkMounts,
    /// Skip mount-point directories entirely.
    SkipMounts,
}

/// Configuration for building, sending, and receiving a file list.
#[derive(Clone, Debug)]
pub struct FileListOptions {
    /// Negotiated protocol version.
    pub protocol: ProtocolVersion,
    /// Descend into directories.
    pub recurse: bool,
    /// Include directories in the list at all.
    pub xfer_dirs: bool,
    /// Keep source-relative names (the `/./` convention) instead of
    /// splitting roots at their final slash.
    pub relative_paths: bool,
    /// In relative mode, synthesize entries for intermediate directories.
    pub implied_dirs: bool,
    /// Device-boundary policy for directories.
    pub one_file_system: OneFileSystem,
    /// Follow every symlink (`-L`).
    pub copy_links: bool,
    /// Follow only symlinks whose target escapes the source tree.
    pub copy_unsafe_links: bool,
    /// Follow a symlink root argument that points at a directory.
    pub copy_dirlinks: bool,
    /// Upgrade a symlink to a directory record when the destination
    /// already has a directory of that name.
    pub keep_dirlinks: bool,
    /// Carry symlink targets.
    pub preserve_links: bool,
    /// Carry hard-link keys.
    pub preserve_hard_links: bool,
    /// Carry device numbers for block/char devices.
    pub preserve_devices: bool,
    /// Carry device fields for FIFOs and sockets.
    pub preserve_specials: bool,
    /// Carry owner uids.
    pub preserve_uid: bool,
    /// Carry group gids.
    pub preserve_gid: bool,
    /// Carry full-file checksums.
    pub always_checksum: bool,
    /// Receiver drops directory chains that contain no files.
    pub prune_empty_dirs: bool,
    /// Do not forward latched I/O-error bits to the peer.
    pub ignore_errors: bool,
    /// Apply CVS-style exclusions, including per-directory `.cvsignore`
    /// files during recursion.
    pub cvs_exclude: bool,
}

impl Default for FileListOptions {
    fn default() -> Self {
        Self {
            protocol: ProtocolVersion::NEWEST,
            recurse: true,
            xfer_dirs: true,
            relative_paths: false,
            implied_dirs: true,
            one_file_system: OneFileSystem::Off,
            copy_links: false,
            copy_unsafe_links: false,
            copy_dirlinks: false,
            keep_dirlinks: false,
            preserve_links: true,
            preserve_hard_links: false,
            preserve_devices: false,
            preserve_specials: false,
            preserve_uid: false,
            preserve_gid: false,
            always_checksum: false,
            prune_empty_dirs: false,
            ignore_errors: false,
            cvs_exclude: false,
        }
    }
}

impl FileListOptions {
    /// The wire writer these options imply.
    pub fn writer(&self) -> FileListWriter {
        FileListWriter::new(self.protocol)
            .with_preserve_uid(self.preserve_uid)
            .with_preserve_gid(self.preserve_gid)
            .with_preserve_links(self.preserve_links)
            .with_preserve_devices(self.preserve_devices)
            .with_preserve_specials(self.preserve_specials)
            .with_preserve_hard_links(self.preserve_hard_links)
            .with_checksums(self.always_checksum)
    }

    /// The wire reader these options imply.
    pub fn reader(&self) -> FileListReader {
        FileListReader::new(self.protocol)
            .with_preserve_uid(self.preserve_uid)
            .with_preserve_gid(self.preserve_gid)
            .with_preserve_links(self.preserve_links)
            .with_preserve_devices(self.preserve_devices)
            .with_preserve_specials(self.preserve_specials)
            .with_preserve_hard_links(self.preserve_hard_links)
            .with_checksums(self.always_checksum)
            .with_recurse(self.recurse)
            .with_relative_paths(self.relative_paths)
    }
}
