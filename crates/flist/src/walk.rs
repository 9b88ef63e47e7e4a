//! crates/flist/src/walk.rs
//!
//! The enumerator: walks root arguments, applies filters, populates
//! entries, and optionally streams each accepted entry to the peer as it
//! is found.
//!
//! Roots are normalized first (trailing `/` becomes `/.`, a `/./` marker
//! splits off the base in relative mode, `..` in the active part of a
//! relative path is fatal). The walker never changes the process working
//! directory; the split-off base is carried explicitly and joined for
//! every filesystem call, while entry names stay relative to it exactly as
//! they travel on the wire.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use filters::{FilterSet, ParseOptions};
use logging::{debug_log, info_log};
use md4::{Digest, Md4};
use protocol::MAXPATHLEN;
use protocol::flist::name::clean_fname;
use protocol::flist::{
    CleanOptions, FLAG_MOUNT_DIR, FLAG_TOP_DIR, FileEntry, FileList, FileListWriter, HardLinkKey,
    mode, sort_and_clean_file_list, sort_file_list,
};

use crate::error::{FileListError, FileListResult, IOERR_GENERAL, IOERR_VANISHED};
use crate::options::{FileListOptions, OneFileSystem};
use crate::stat::{StatInfo, link_stat, readlink_stat, stat_follow};

/// Which rule lists apply while walking.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FilterLevel {
    /// Only the distinguished server-side list.
    ServerOnly,
    /// Server list first, then the user's list.
    All,
}

/// Where accepted entries go as they are found.
trait EntrySink {
    fn send(&mut self, entry: &FileEntry) -> FileListResult<()>;
}

/// In-memory builds: entries only land in the list.
struct NullSink;

impl EntrySink for NullSink {
    fn send(&mut self, _entry: &FileEntry) -> FileListResult<()> {
        Ok(())
    }
}

/// Streaming builds: every entry goes straight to the peer.
struct WireSink<'a, W: Write + ?Sized> {
    codec: FileListWriter,
    out: CountingWriter<'a, W>,
}

impl<W: Write + ?Sized> EntrySink for WireSink<'_, W> {
    fn send(&mut self, entry: &FileEntry) -> FileListResult<()> {
        self.codec.write_entry(&mut self.out, entry)?;
        Ok(())
    }
}

struct CountingWriter<'a, W: Write + ?Sized> {
    inner: &'a mut W,
    written: u64,
}

impl<W: Write + ?Sized> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct Walker<'a, S: EntrySink> {
    opts: FileListOptions,
    server_rules: Option<&'a FilterSet>,
    user_rules: &'a mut FilterSet,
    sink: S,
    list: FileList,
    io_error: i32,
    filter_level: FilterLevel,
    /// Base directory split off the current root; filesystem calls join
    /// it, entry names do not include it.
    flist_dir: Option<PathBuf>,
    filesystem_dev: u64,
    /// Implied-dir state: the parent path of the previous root.
    lastpath: String,
    /// Receiver-side list consulted for `keep_dirlinks` upgrades.
    dirlink_reference: Option<&'a mut FileList>,
}

impl<'a, S: EntrySink> Walker<'a, S> {
    fn new(
        opts: &FileListOptions,
        server_rules: Option<&'a FilterSet>,
        user_rules: &'a mut FilterSet,
        sink: S,
        filter_level: FilterLevel,
        dirlink_reference: Option<&'a mut FileList>,
    ) -> Self {
        Self {
            opts: opts.clone(),
            server_rules,
            user_rules,
            sink,
            list: FileList::new(),
            io_error: 0,
            filter_level,
            flist_dir: None,
            filesystem_dev: 0,
            lastpath: String::new(),
            dirlink_reference,
        }
    }

    fn into_parts(self) -> (FileList, i32, S) {
        (self.list, self.io_error, self.sink)
    }

    fn fs_path(&self, fname: &str) -> PathBuf {
        match &self.flist_dir {
            Some(base) => base.join(fname),
            None => PathBuf::from(fname),
        }
    }

    fn is_excluded(&self, fname: &str, is_dir: bool) -> bool {
        // Never exclude `.` (or the -R spelling of it), even against
        // --exclude '*'.
        if fname == "." {
            return false;
        }
        if fname.starts_with('/') && fname.ends_with("/.") {
            return false;
        }
        if let Some(server) = self.server_rules {
            if server.check(fname, is_dir) == Some(false) {
                return true;
            }
        }
        if self.filter_level != FilterLevel::All {
            return false;
        }
        self.user_rules.check(fname, is_dir) == Some(false)
    }

    /// Stats one name and builds its entry, or skips it.
    ///
    /// Per-entry failures latch an I/O-error bit and return `Ok(None)`;
    /// the list stays consistent without the entry.
    fn make_file(
        &mut self,
        fname: &str,
        stat_hint: Option<&StatInfo>,
        mut flags: u16,
    ) -> FileListResult<Option<FileEntry>> {
        let base_len = self
            .flist_dir
            .as_ref()
            .map_or(0, |base| base.as_os_str().len());
        if fname.len() + base_len >= MAXPATHLEN {
            info_log!(Misc, 1, "skipping overly long name: {fname}");
            return Ok(None);
        }
        let fname = clean_fname(fname);
        let path = self.fs_path(&fname);

        let (st, link_target) = match stat_hint.filter(|hint| mode::is_dir(hint.mode)) {
            Some(hint) => (*hint, None),
            None => {
                match readlink_stat(
                    &path,
                    &fname,
                    self.opts.copy_links,
                    self.opts.copy_dirlinks,
                    self.opts.copy_unsafe_links,
                ) {
                    Ok(pair) => pair,
                    Err(err) => {
                        // See whether filters would drop the name before
                        // reporting anything.
                        if self.is_excluded(&fname, false) || self.is_excluded(&fname, true) {
                            return Ok(None);
                        }
                        if err.kind() == io::ErrorKind::NotFound {
                            // With -L, a dangling symlink is a real error,
                            // not a vanished file.
                            let dangling_link = self.opts.copy_links
                                && fs::symlink_metadata(&path)
                                    .map(|md| md.file_type().is_symlink())
                                    .unwrap_or(false);
                            if dangling_link {
                                self.io_error |= IOERR_GENERAL;
                                info_log!(Misc, 1, "symlink has no referent: \"{fname}\"");
                            } else {
                                self.io_error |= IOERR_VANISHED;
                                info_log!(Misc, 1, "file has vanished: \"{fname}\"");
                            }
                        } else {
                            self.io_error |= IOERR_GENERAL;
                            info_log!(Misc, 1, "readlink {fname} failed: {err}");
                        }
                        return Ok(None);
                    }
                }
            }
        };

        let is_dir_entry = mode::is_dir(st.mode);
        if is_dir_entry && !self.opts.xfer_dirs {
            info_log!(Flist, 1, "skipping directory {fname}");
            return Ok(None);
        }

        // -x only affects directories: the point is not descending into a
        // mount, not refusing a symlinked file.
        if self.opts.one_file_system != OneFileSystem::Off
            && is_dir_entry
            && st.dev != self.filesystem_dev
        {
            match self.opts.one_file_system {
                OneFileSystem::SkipMounts => {
                    info_log!(Mount, 1, "skipping mount-point dir {fname}");
                    return Ok(None);
                }
                OneFileSystem::MarkMounts => flags |= FLAG_MOUNT_DIR,
                OneFileSystem::Off => {}
            }
        }

        if self.is_excluded(&fname, is_dir_entry) {
            return Ok(None);
        }

        debug_log!(Flist, 2, "make_file({fname})");

        let mut entry = FileEntry::from_mode(fname.as_str(), st.mode);
        entry.add_flags(flags);
        entry.set_mtime(st.mtime);
        if mode::is_device(st.mode) || mode::is_special(st.mode) {
            entry.set_rdev(st.rdev_major, st.rdev_minor);
        } else {
            entry.set_size(st.size);
        }
        if self.opts.preserve_uid {
            entry.set_uid(st.uid);
        }
        if self.opts.preserve_gid {
            entry.set_gid(st.gid);
        }
        if let Some(target) = link_target {
            entry.set_symlink_target(target);
        }
        if self.opts.preserve_hard_links {
            let linkable = if self.opts.protocol.has_extended_flags() {
                !is_dir_entry && st.nlink > 1
            } else {
                mode::is_regular(st.mode)
            };
            if linkable {
                entry.set_hardlink_key(HardLinkKey {
                    dev: st.dev,
                    ino: st.ino,
                });
            }
        }
        if self.opts.always_checksum && mode::is_regular(st.mode) {
            entry.set_checksum(file_checksum(&path));
        }

        // A symlink that shadows a directory already on the destination
        // may be upgraded to a directory record (--keep-dirlinks, used
        // when the receiver builds a deletion dirlist).
        if self.opts.keep_dirlinks && entry.is_symlink() {
            if let Some(reference) = self.dirlink_reference.as_deref_mut() {
                let probe = FileEntry::from_mode(fname.as_str(), mode::S_IFDIR);
                if reference.find(&probe, self.opts.protocol).is_some() {
                    if let Ok(st2) = stat_follow(&path) {
                        if mode::is_dir(st2.mode) {
                            let mut upgraded = FileEntry::from_mode(fname.as_str(), st2.mode);
                            upgraded.add_flags(flags);
                            upgraded.set_mtime(st2.mtime);
                            if self.opts.preserve_uid {
                                upgraded.set_uid(st2.uid);
                            }
                            if self.opts.preserve_gid {
                                upgraded.set_gid(st2.gid);
                            }
                            entry = upgraded;
                        }
                    }
                }
            }
        }

        if mode::is_regular(st.mode) || mode::is_symlink(st.mode) {
            self.list.stats_mut().total_size += st.size;
        }

        Ok(Some(entry))
    }

    fn send_file_name(
        &mut self,
        fname: &str,
        stat_hint: Option<&StatInfo>,
        flags: u16,
    ) -> FileListResult<Option<usize>> {
        let Some(entry) = self.make_file(fname, stat_hint, flags)? else {
            return Ok(None);
        };
        self.sink.send(&entry)?;
        self.list.push(entry);
        Ok(Some(self.list.len() - 1))
    }

    /// Lists one directory, then recurses into the entries just added.
    fn send_directory(&mut self, dir_fname: &str) -> FileListResult<()> {
        let start = self.list.len();
        let dir_path = self.fs_path(dir_fname);
        let reader = match fs::read_dir(&dir_path) {
            Ok(reader) => reader,
            Err(err) => {
                self.io_error |= IOERR_GENERAL;
                info_log!(Misc, 1, "opendir {dir_fname} failed: {err}");
                return Ok(());
            }
        };

        for item in reader {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    self.io_error |= IOERR_GENERAL;
                    info_log!(Misc, 1, "readdir({dir_fname}) failed: {err}");
                    continue;
                }
            };
            let name = item.file_name();
            let name = name.to_string_lossy();
            if name == "." || name == ".." {
                continue;
            }
            let full = if dir_fname == "/" {
                format!("/{name}")
            } else {
                format!("{dir_fname}/{name}")
            };
            if full.len() >= MAXPATHLEN {
                self.io_error |= IOERR_GENERAL;
                info_log!(Misc, 1, "cannot send long-named file \"{full}\"");
                continue;
            }
            self.send_file_name(&full, None, 0)?;
        }

        if self.opts.recurse {
            let end = self.list.len();
            for index in start..end {
                self.send_if_directory(index)?;
            }
        }
        Ok(())
    }

    fn send_if_directory(&mut self, index: usize) -> FileListResult<()> {
        let entry = self.list.entry(index);
        if !entry.is_dir() || entry.has_flags(FLAG_MOUNT_DIR) {
            return Ok(());
        }
        let fname = entry.full_name();
        if fname.len() >= MAXPATHLEN - 1 {
            self.io_error |= IOERR_GENERAL;
            info_log!(Misc, 1, "skipping long-named directory: {fname}");
            return Ok(());
        }

        // Per-directory rules scope exactly over this subtree.
        let scope = if self.opts.cvs_exclude {
            let rule_file = self.fs_path(&fname).join(".cvsignore");
            let opts = ParseOptions {
                word_split: true,
                no_prefixes: true,
                ..ParseOptions::default()
            };
            Some(self.user_rules.push_local_rules(&rule_file, &opts)?)
        } else {
            None
        };
        debug_log!(Chdir, 1, "descending into {fname}");
        let result = self.send_directory(&fname);
        if let Some(scope) = scope {
            self.user_rules.pop_local_rules(scope);
        }
        result
    }

    /// Processes one root argument.
    fn send_root(&mut self, root: &str) -> FileListResult<()> {
        self.flist_dir = None;
        let mut fbuf = root.to_owned();
        let mut is_dot_dir = false;

        if !self.opts.relative_paths {
            let len = fbuf.len();
            if len == 0 || fbuf.ends_with('/') {
                if len == 2 && fbuf.starts_with('.') {
                    // Turn "./" into just "." rather than "./."
                    fbuf.truncate(1);
                } else {
                    if len + 1 >= MAXPATHLEN {
                        return Err(FileListError::PathTooLong(fbuf));
                    }
                    fbuf.push('.');
                }
                is_dot_dir = true;
            } else if len > 1
                && fbuf.ends_with("..")
                && (len == 2 || fbuf.as_bytes()[len - 3] == b'/')
            {
                if len + 2 >= MAXPATHLEN {
                    return Err(FileListError::PathTooLong(fbuf));
                }
                fbuf.push_str("/.");
                is_dot_dir = true;
            } else {
                is_dot_dir =
                    fbuf.ends_with('.') && (len == 1 || fbuf.as_bytes()[len - 2] == b'/');
            }
        }

        let st = match link_stat(
            &PathBuf::from(&fbuf),
            self.opts.copy_links,
            self.opts.copy_dirlinks,
        ) {
            Ok(st) => st,
            Err(err) => {
                self.io_error |= IOERR_GENERAL;
                info_log!(Misc, 1, "link_stat {fbuf} failed: {err}");
                return Ok(());
            }
        };

        if mode::is_dir(st.mode) && !self.opts.xfer_dirs {
            info_log!(Flist, 1, "skipping directory {fbuf}");
            return Ok(());
        }

        let mut dir: Option<String> = None;
        let mut fname: String;
        if self.opts.relative_paths {
            if let Some(pos) = fbuf.find("/./") {
                dir = Some(if pos == 0 {
                    "/".to_owned()
                } else {
                    fbuf[..pos].to_owned()
                });
                fname = fbuf[pos + 3..].to_owned();
            } else {
                fname = fbuf.clone();
            }
            // Get rid of trailing "/" and "/.".
            let len = {
                let bytes = fname.as_bytes();
                let mut len = bytes.len();
                while len > 0 {
                    if bytes[len - 1] == b'/' {
                        is_dot_dir = true;
                        len -= 1;
                        if len == 0 && dir.is_none() {
                            len += 1;
                            break;
                        }
                    } else if len >= 2 && bytes[len - 1] == b'.' && bytes[len - 2] == b'/' {
                        is_dot_dir = true;
                        len -= 2;
                        if len == 0 && dir.is_none() {
                            len += 1;
                            break;
                        }
                    } else {
                        break;
                    }
                }
                len
            };
            fname.truncate(len);
            if fname == "/" {
                fname.push('.');
            }
            // Reject a ".." dir in the active part of the path.
            if fname.split('/').any(|segment| segment == "..") {
                return Err(FileListError::UnsafeRelativePath(fbuf));
            }
        } else {
            match fbuf.rfind('/') {
                Some(0) => {
                    dir = Some("/".to_owned());
                    fname = fbuf[1..].to_owned();
                }
                Some(pos) => {
                    dir = Some(fbuf[..pos].to_owned());
                    fname = fbuf[pos + 1..].to_owned();
                }
                None => fname = fbuf.clone(),
            }
        }

        if fname.is_empty() {
            fname = ".".to_owned();
        }

        if let Some(dir) = dir.filter(|dir| !dir.is_empty()) {
            debug_log!(Chdir, 1, "using base directory {dir}");
            self.flist_dir = Some(PathBuf::from(dir));
        }

        // Send the implied directories between the transfer root and this
        // name, so the receiver can give the intermediate dirs the right
        // attributes. Parents shared with the previous root are not
        // repeated.
        if self.opts.implied_dirs {
            if let Some(last_slash) = fname.rfind('/') {
                if last_slash > 0 {
                    let fb = fname.as_bytes();
                    let lp = self.lastpath.as_bytes();
                    let mut i = 0;
                    let mut slash_pos = 0;
                    while i < fb.len() && i < lp.len() && fb[i] == lp[i] {
                        if fb[i] == b'/' {
                            slash_pos = i;
                        }
                        i += 1;
                    }
                    if i != last_slash || (i < lp.len() && lp[i] != b'/') {
                        let save_copy_links = self.opts.copy_links;
                        let save_xfer_dirs = self.opts.xfer_dirs;
                        self.opts.copy_links = save_copy_links || self.opts.copy_unsafe_links;
                        self.opts.xfer_dirs = true;
                        let mut from = slash_pos + 1;
                        while let Some(next) = fname[from..].find('/').map(|pos| pos + from) {
                            self.send_file_name(&fname[..next], None, 0)?;
                            from = next + 1;
                        }
                        self.opts.copy_links = save_copy_links;
                        self.opts.xfer_dirs = save_xfer_dirs;
                        self.lastpath = fname[..last_slash].to_owned();
                    }
                }
            }
        }

        if self.opts.one_file_system != OneFileSystem::Off {
            self.filesystem_dev = st.dev;
        }

        if self.opts.recurse || (self.opts.xfer_dirs && is_dot_dir) {
            if let Some(index) = self.send_file_name(&fname, Some(&st), FLAG_TOP_DIR)? {
                self.send_if_directory(index)?;
            }
        } else {
            self.send_file_name(&fname, Some(&st), 0)?;
        }

        self.flist_dir = None;
        Ok(())
    }
}

/// MD4 of a file's contents; read failures yield a null sum.
fn file_checksum(path: &std::path::Path) -> Vec<u8> {
    let mut hasher = Md4::new();
    let Ok(mut file) = fs::File::open(path) else {
        return vec![0; protocol::MD4_SUM_LENGTH];
    };
    let mut buf = [0u8; 64 * 1024];
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(_) => return vec![0; protocol::MD4_SUM_LENGTH],
        }
    }
    hasher.finalize().to_vec()
}

/// Builds the list for `roots` and streams it to `w`, terminator and
/// latched I/O-error word included.
///
/// The result is sorted but keeps duplicates, so the receiving side may
/// ask for any name it likes regardless of how duplicates get resolved.
pub fn send_file_list<W: Write + ?Sized>(
    w: &mut W,
    roots: &[impl AsRef<str>],
    opts: &FileListOptions,
    server_rules: Option<&FilterSet>,
    user_rules: &mut FilterSet,
) -> FileListResult<FileList> {
    info_log!(Flist, 1, "building file list");
    let started = Instant::now();

    let sink = WireSink {
        codec: opts.writer(),
        out: CountingWriter { inner: w, written: 0 },
    };
    let mut walker = Walker::new(opts, server_rules, user_rules, sink, FilterLevel::All, None);
    for root in roots {
        walker.send_root(root.as_ref())?;
    }
    let (mut list, io_error, mut sink) = walker.into_parts();
    let reported = if opts.ignore_errors { 0 } else { io_error };
    sink.codec.write_end(&mut sink.out, Some(reported))?;
    let wire_bytes = sink.out.written;

    sort_file_list(&mut list, opts.protocol);
    let count = list.len();
    let stats = list.stats_mut();
    stats.build_time = started.elapsed();
    stats.io_error = io_error;
    stats.wire_bytes = wire_bytes;
    stats.file_count = count;
    info_log!(Flist, 2, "send_file_list done");
    Ok(list)
}

/// Builds the list for `roots` in memory, without a peer.
pub fn build_file_list(
    roots: &[impl AsRef<str>],
    opts: &FileListOptions,
    server_rules: Option<&FilterSet>,
    user_rules: &mut FilterSet,
) -> FileListResult<FileList> {
    info_log!(Flist, 1, "building file list");
    let started = Instant::now();

    let mut walker = Walker::new(
        opts,
        server_rules,
        user_rules,
        NullSink,
        FilterLevel::All,
        None,
    );
    for root in roots {
        walker.send_root(root.as_ref())?;
    }
    let (mut list, io_error, NullSink) = walker.into_parts();

    sort_file_list(&mut list, opts.protocol);
    let count = list.len();
    let stats = list.stats_mut();
    stats.build_time = started.elapsed();
    stats.io_error = io_error;
    stats.file_count = count;
    Ok(list)
}

/// Receives a list from `r`, then sorts and de-duplicates it so both
/// peers share one index space.
pub fn recv_file_list<R: Read + ?Sized>(
    r: &mut R,
    opts: &FileListOptions,
    server_rules: Option<&FilterSet>,
    user_rules: &FilterSet,
) -> FileListResult<FileList> {
    info_log!(Flist, 1, "receiving file list");
    let started = Instant::now();

    let mut reader = opts.reader();
    let mut list = FileList::new();
    while let Some(entry) = reader.read_entry(r)? {
        if entry.is_regular() || entry.is_symlink() {
            list.stats_mut().total_size += entry.size();
        }
        debug_log!(Flist, 2, "recv_file_name({})", entry.full_name());
        list.push(entry);
    }
    let peer_io_error = reader.read_io_error(r)?;
    if !opts.ignore_errors {
        list.stats_mut().io_error |= peer_io_error;
    }

    let excluded = |name: &str, is_dir: bool| {
        server_rules.is_some_and(|server| server.check(name, is_dir) == Some(false))
            || user_rules.check(name, is_dir) == Some(false)
    };
    sort_and_clean_file_list(
        &mut list,
        opts.protocol,
        &CleanOptions {
            strip_root: opts.relative_paths,
            remove_duplicates: true,
            prune_empty_dirs: opts.prune_empty_dirs,
            is_excluded: Some(&excluded),
        },
    );
    let count = list.len();
    let stats = list.stats_mut();
    stats.transfer_time = started.elapsed();
    stats.file_count = count;
    info_log!(Flist, 2, "recv_file_list done");
    Ok(list)
}

/// Non-recursive scan of one directory, for the receiver's delete pass.
///
/// With `ignore_filter_rules` only the server-side list applies. A
/// `reference` list enables the `keep_dirlinks` symlink upgrade against
/// the main transfer list.
pub fn get_dirlist(
    dirname: &str,
    opts: &FileListOptions,
    server_rules: Option<&FilterSet>,
    user_rules: &mut FilterSet,
    ignore_filter_rules: bool,
    reference: Option<&mut FileList>,
) -> FileListResult<FileList> {
    let mut dir_opts = opts.clone();
    dir_opts.recurse = false;
    dir_opts.xfer_dirs = true;

    let level = if ignore_filter_rules {
        FilterLevel::ServerOnly
    } else {
        FilterLevel::All
    };
    let mut walker = Walker::new(&dir_opts, server_rules, user_rules, NullSink, level, reference);
    walker.send_directory(dirname)?;
    let (mut list, io_error, NullSink) = walker.into_parts();

    sort_file_list(&mut list, opts.protocol);
    let count = list.len();
    let stats = list.stats_mut();
    stats.io_error = io_error;
    stats.file_count = count;
    Ok(list)
}
