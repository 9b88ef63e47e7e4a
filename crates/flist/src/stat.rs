//! crates/flist/src/stat.rs
//!
//! Stat plumbing: platform metadata normalized to canonical modes, the
//! symlink-policy ladder, and the unsafe-symlink test.

use std::fs;
use std::io;
use std::path::Path;

use protocol::flist::mode;

/// Normalized stat result.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StatInfo {
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
    pub uid: u32,
    pub gid: u32,
    pub dev: u64,
    pub ino: u64,
    pub nlink: u64,
    pub rdev_major: u32,
    pub rdev_minor: u32,
}

#[cfg(unix)]
fn stat_info(md: &fs::Metadata) -> StatInfo {
    use std::os::unix::fs::MetadataExt;

    let raw = md.mode();
    let fmt = match raw & 0o170000 {
        0o140000 => mode::S_IFSOCK,
        0o120000 => mode::S_IFLNK,
        0o100000 => mode::S_IFREG,
        0o060000 => mode::S_IFBLK,
        0o040000 => mode::S_IFDIR,
        0o020000 => mode::S_IFCHR,
        _ => mode::S_IFIFO,
    };
    StatInfo {
        mode: fmt | (raw & 0o7777),
        size: md.size(),
        mtime: md.mtime(),
        uid: md.uid(),
        gid: md.gid(),
        dev: md.dev(),
        ino: md.ino(),
        nlink: md.nlink(),
        rdev_major: dev_major(md.rdev()),
        rdev_minor: dev_minor(md.rdev()),
    }
}

#[cfg(not(unix))]
fn stat_info(md: &fs::Metadata) -> StatInfo {
    let file_mode = if md.is_dir() {
        mode::S_IFDIR | 0o755
    } else if md.is_symlink() {
        mode::S_IFLNK | 0o777
    } else {
        mode::S_IFREG | 0o644
    };
    StatInfo {
        mode: file_mode,
        size: md.len(),
        mtime: md
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs() as i64),
        nlink: 1,
        ..StatInfo::default()
    }
}

/// Extracts the major number from a packed device word (glibc layout).
#[cfg(unix)]
const fn dev_major(dev: u64) -> u32 {
    (((dev >> 32) & 0xFFFF_F000) | ((dev >> 8) & 0xFFF)) as u32
}

/// Extracts the minor number from a packed device word (glibc layout).
#[cfg(unix)]
const fn dev_minor(dev: u64) -> u32 {
    (((dev >> 12) & 0xFFFF_FF00) | (dev & 0xFF)) as u32
}

pub(crate) fn stat_follow(path: &Path) -> io::Result<StatInfo> {
    Ok(stat_info(&fs::metadata(path)?))
}

fn lstat(path: &Path) -> io::Result<StatInfo> {
    Ok(stat_info(&fs::symlink_metadata(path)?))
}

/// Stats `path` honoring the basic symlink policy: follow everything with
/// `copy_links`; with `follow_dirlinks`, a symlink whose referent is a
/// directory is reported as that directory.
pub(crate) fn link_stat(
    path: &Path,
    copy_links: bool,
    follow_dirlinks: bool,
) -> io::Result<StatInfo> {
    if copy_links {
        return stat_follow(path);
    }
    let st = lstat(path)?;
    if follow_dirlinks && mode::is_symlink(st.mode) {
        if let Ok(st2) = stat_follow(path) {
            if mode::is_dir(st2.mode) {
                return Ok(st2);
            }
        }
    }
    Ok(st)
}

/// Stats a tree entry and captures the symlink target when there is one.
///
/// With `copy_unsafe_links`, a symlink whose target escapes the tree is
/// statted through instead of kept as a link.
pub(crate) fn readlink_stat(
    path: &Path,
    fname: &str,
    copy_links: bool,
    copy_dirlinks: bool,
    copy_unsafe_links: bool,
) -> io::Result<(StatInfo, Option<String>)> {
    let st = link_stat(path, copy_links, copy_dirlinks)?;
    if !mode::is_symlink(st.mode) {
        return Ok((st, None));
    }
    let target = fs::read_link(path)?.to_string_lossy().into_owned();
    if copy_unsafe_links && unsafe_symlink(&target, fname) {
        logging::info_log!(Misc, 2, "copying unsafe symlink \"{fname}\" -> \"{target}\"");
        return Ok((stat_follow(path)?, None));
    }
    Ok((st, Some(target)))
}

/// True when following `dest` from the location of `src` could leave the
/// tree rooted where `src`'s walk began.
pub(crate) fn unsafe_symlink(dest: &str, src: &str) -> bool {
    // All absolute and null symlinks are unsafe.
    if dest.is_empty() || dest.starts_with('/') {
        return true;
    }

    // Depth of the link's directory inside the tree is the safety margin.
    let mut depth = 0i32;
    if let Some(parent) = src.rsplit_once('/').map(|(dir, _)| dir) {
        for segment in parent.split('/') {
            match segment {
                ".." => depth = 0,
                "." | "" => {}
                _ => depth += 1,
            }
        }
    }

    let segments: Vec<&str> = dest.split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        let last = i == segments.len() - 1;
        match *segment {
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            "." | "" => {}
            _ if !last => depth += 1,
            _ => {}
        }
    }
    depth < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_and_empty_targets_are_unsafe() {
        assert!(unsafe_symlink("/etc/passwd", "a/b"));
        assert!(unsafe_symlink("", "a/b"));
    }

    #[test]
    fn sibling_targets_are_safe() {
        assert!(!unsafe_symlink("other", "dir/link"));
        assert!(!unsafe_symlink("sub/file", "dir/link"));
    }

    #[test]
    fn climbing_past_the_root_is_unsafe() {
        assert!(unsafe_symlink("../outside", "link"));
        assert!(unsafe_symlink("../../x", "dir/link"));
        assert!(!unsafe_symlink("../inside", "dir/link"));
    }

    #[test]
    fn dot_segments_do_not_add_depth() {
        assert!(!unsafe_symlink("./same", "dir/link"));
        assert!(unsafe_symlink("./../../x", "dir/link"));
    }

    #[cfg(unix)]
    #[test]
    fn stat_normalizes_regular_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("f");
        fs::write(&path, b"abc").expect("write");

        let st = link_stat(&path, false, false).expect("stat");
        assert!(mode::is_regular(st.mode));
        assert_eq!(st.size, 3);
        assert!(st.nlink >= 1);
    }

    #[cfg(unix)]
    #[test]
    fn link_stat_reports_symlinks_without_copy_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("t");
        fs::write(&target, b"x").expect("write");
        let link = dir.path().join("l");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");

        let st = link_stat(&link, false, false).expect("lstat");
        assert!(mode::is_symlink(st.mode));
        let st = link_stat(&link, true, false).expect("stat");
        assert!(mode::is_regular(st.mode));
    }

    #[cfg(unix)]
    #[test]
    fn follow_dirlinks_promotes_directory_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");
        let link = dir.path().join("l");
        std::os::unix::fs::symlink(&sub, &link).expect("symlink");

        let st = link_stat(&link, false, true).expect("stat");
        assert!(mode::is_dir(st.mode));
    }
}
