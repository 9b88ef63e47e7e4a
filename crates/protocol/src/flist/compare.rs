//! crates/protocol/src/flist/compare.rs
//!
//! The path-aware name comparator.
//!
//! Two entries compare as if each were the byte string
//! `dirname + "/" + basename`. Three deviations apply from protocol 29 on:
//! directories are compared with an assumed trailing slash (so a directory
//! sorts immediately before its own contents), a directory of any name
//! sorts after a non-directory at the same depth, and a directory named
//! `.` sorts before everything else. The walk is a small state machine
//! that feeds each side's dirname, a joining slash, the basename, and the
//! optional trailing slash without ever materializing the joined string.

use std::cmp::Ordering;

use super::entry::FileEntry;
use crate::version::ProtocolVersion;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Dir,
    Slash,
    Base,
    Trailing,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Path,
    Item,
}

struct Side<'a> {
    bytes: &'a [u8],
    state: State,
    kind: Kind,
}

const fn current(bytes: &[u8]) -> u8 {
    match bytes.first() {
        Some(byte) => *byte,
        None => 0,
    }
}

fn advance(bytes: &mut &[u8]) {
    if !bytes.is_empty() {
        *bytes = &bytes[1..];
    }
}

fn start<'a>(file: &'a FileEntry, skip_dirname: bool, path_kind: Kind) -> Side<'a> {
    if file.dirname().is_none() || skip_dirname {
        let kind = if file.is_dir() { path_kind } else { Kind::Item };
        let bytes = file.basename().as_bytes();
        if kind == Kind::Path && bytes == b"." {
            Side {
                bytes: b"",
                state: State::Trailing,
                kind: Kind::Item,
            }
        } else {
            Side {
                bytes,
                state: State::Base,
                kind,
            }
        }
    } else {
        Side {
            bytes: file.dirname().unwrap_or("").as_bytes(),
            state: State::Dir,
            kind: path_kind,
        }
    }
}

/// Advances an exhausted side to its next piece of the joined name.
fn refill<'a>(side: &mut Side<'a>, file: &'a FileEntry, path_kind: Kind) {
    match side.state {
        State::Dir => {
            side.state = State::Slash;
            side.bytes = b"/";
        }
        State::Slash => {
            side.kind = if file.is_dir() { path_kind } else { Kind::Item };
            side.bytes = file.basename().as_bytes();
            if side.kind == Kind::Path && side.bytes == b"." {
                side.kind = Kind::Item;
                side.state = State::Trailing;
                side.bytes = b"";
            } else {
                side.state = State::Base;
            }
        }
        State::Base => {
            side.state = State::Trailing;
            if side.kind == Kind::Path {
                side.bytes = b"/";
            } else {
                side.kind = Kind::Item;
            }
        }
        State::Trailing => {
            side.kind = Kind::Item;
        }
    }
}

const fn kind_order(kind: Kind) -> Ordering {
    match kind {
        Kind::Path => Ordering::Greater,
        Kind::Item => Ordering::Less,
    }
}

/// Total order over entries under `protocol`'s sorting rules.
///
/// An inactive (cleared) entry sorts after any active one.
pub fn compare_file_entries(
    f1: &FileEntry,
    f2: &FileEntry,
    protocol: ProtocolVersion,
) -> Ordering {
    if !f1.is_active() {
        return if f2.is_active() {
            Ordering::Greater
        } else {
            Ordering::Equal
        };
    }
    if !f2.is_active() {
        return Ordering::Less;
    }

    let path_kind = if protocol.sorts_directories_specially() {
        Kind::Path
    } else {
        Kind::Item
    };

    // Equal dirnames walk identically through the Dir and Slash states, so
    // both sides may start directly at their basenames.
    let same_dir = f1.dirname() == f2.dirname() && f1.dirname().is_some();
    let mut s1 = start(f1, same_dir, path_kind);
    let mut s2 = start(f2, same_dir, path_kind);

    if s1.kind != s2.kind {
        return kind_order(s1.kind);
    }

    loop {
        if s1.bytes.is_empty() {
            refill(&mut s1, f1, path_kind);
            if !s2.bytes.is_empty() && s1.kind != s2.kind {
                return kind_order(s1.kind);
            }
        }
        if s2.bytes.is_empty() {
            if s2.state == State::Trailing && s1.bytes.is_empty() {
                return Ordering::Equal;
            }
            refill(&mut s2, f2, path_kind);
            if s1.kind != s2.kind {
                return kind_order(s1.kind);
            }
        }
        let dif = i32::from(current(s1.bytes)) - i32::from(current(s2.bytes));
        advance(&mut s1.bytes);
        advance(&mut s2.bytes);
        if dif != 0 {
            return if dif < 0 {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
    }
}
