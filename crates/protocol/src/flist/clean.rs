//! crates/protocol/src/flist/clean.rs
//!
//! Sorting, duplicate elimination, root stripping, and empty-directory
//! pruning.
//!
//! Duplicate names corrupt the pipelined transfer, so after sorting the
//! receiver keeps exactly one entry per name. When a directory collides
//! with a non-directory the directory wins (its contents may follow in the
//! list); otherwise the earlier entry wins. Dropped entries are cleared in
//! place, leaving skip cursors for the lookup, and the `TOP_DIR`/`XFER_DIR`
//! flags of the loser are merged onto the survivor so a user-named root is
//! never forgotten.

use std::cmp::Ordering;

use logging::debug_log;

use super::compare::compare_file_entries;
use super::entry::{FLAG_TOP_DIR, FLAG_XFER_DIR};
use super::list::FileList;
use super::mode::S_IFREG;
use crate::version::ProtocolVersion;

/// Which cleanup passes to run.
#[derive(Default)]
pub struct CleanOptions<'a> {
    /// Strip leading slashes off every dirname (relative-paths receive).
    pub strip_root: bool,
    /// Clear all but one entry per name; also enables pruning.
    pub remove_duplicates: bool,
    /// Clear directory chains that contain no non-directory entries.
    pub prune_empty_dirs: bool,
    /// Exclusion test consulted by the prune pass: directories the filter
    /// rules exclude keep their parent chains alive.
    pub is_excluded: Option<&'a dyn Fn(&str, bool) -> bool>,
}

/// Sorts the list without removing duplicates (the sender's clean).
///
/// Keeping duplicates lets the receiver ask for any name it likes, so the
/// duplicate policy can evolve without breaking older peers.
pub fn sort_file_list(list: &mut FileList, protocol: ProtocolVersion) {
    sort_and_clean_file_list(list, protocol, &CleanOptions::default());
}

/// Sorts the list and runs the configured cleanup passes.
pub fn sort_and_clean_file_list(
    list: &mut FileList,
    protocol: ProtocolVersion,
    opts: &CleanOptions<'_>,
) {
    let count = list.files.len();
    if count == 0 {
        list.high = -1;
        return;
    }

    list.files
        .sort_by(|a, b| compare_file_entries(a, b, protocol));

    let mut prev_i = 0usize;
    if opts.remove_duplicates {
        for (i, file) in list.files.iter().enumerate() {
            if file.is_active() {
                prev_i = i;
                break;
            }
        }
    }
    list.low = prev_i as isize;

    let mut i = if opts.remove_duplicates { prev_i } else { count };
    loop {
        i += 1;
        if i >= count {
            break;
        }
        if !list.files[i].is_active() {
            continue;
        }
        let collision =
            if compare_file_entries(&list.files[i], &list.files[prev_i], protocol)
                == Ordering::Equal
            {
                Some(prev_i)
            } else if protocol.sorts_directories_specially() && list.files[i].is_dir() {
                // From protocol 29 a directory never compares equal to a
                // same-named non-directory, so probe for one explicitly.
                list.high = prev_i as isize;
                let mut probe = list.files[i].clone();
                probe.set_mode(S_IFREG);
                list.find(&probe, protocol)
            } else {
                None
            };

        if let Some(j) = collision {
            let (keep, drop) = if list.files[i].is_dir() != list.files[j].is_dir() {
                if list.files[i].is_dir() { (i, j) } else { (j, i) }
            } else {
                (j, i)
            };
            debug_log!(
                Dup,
                1,
                "removing duplicate name {} from file list ({drop})",
                list.files[i].full_name()
            );
            let merged = list.files[drop].flags() & (FLAG_TOP_DIR | FLAG_XFER_DIR);
            list.files[keep].add_flags(merged);
            list.files[drop].clear();

            if keep == i {
                if list.low == drop as isize {
                    let mut j = drop + 1;
                    while j < i && !list.files[j].is_active() {
                        j += 1;
                    }
                    list.low = j as isize;
                }
                prev_i = i;
            }
        } else {
            prev_i = i;
        }
    }
    list.high = if opts.remove_duplicates {
        prev_i as isize
    } else {
        count as isize - 1
    };

    if opts.strip_root {
        // Leading slashes come off only after sorting, so absolute and
        // relative spellings of the same tree sorted identically.
        for file in &mut list.files[list.low as usize..=list.high.max(list.low) as usize] {
            let Some(dirname) = file.dirname() else {
                continue;
            };
            if !dirname.starts_with('/') {
                continue;
            }
            let stripped = dirname.trim_start_matches('/');
            let replacement = if stripped.is_empty() {
                None
            } else {
                Some(stripped.into())
            };
            file.set_dirname(replacement);
        }
    }

    if opts.prune_empty_dirs && opts.remove_duplicates {
        prune_empty_directory_chains(list, opts);
    }
}

/// Second pass for `prune_empty_dirs`.
///
/// Walking the sorted list, each directory is put on a pending chain by
/// overloading its `depth` as a negated link to its predecessor. Any
/// non-directory (or excluded directory) redeems the chain above it,
/// restoring real depths; chains still pending when the walk leaves their
/// subtree are cleared.
fn prune_empty_directory_chains(list: &mut FileList, opts: &CleanOptions<'_>) {
    let low = list.low as usize;
    let high = list.high as usize;
    let mut prev_depth = 0i32;
    let mut prev_i = 0usize;

    for i in low..=high {
        let file = &list.files[i];
        if file.is_dir() && file.depth() != 0 {
            // Dump pending empty dirs when coming back down.
            let depth = file.depth();
            let mut j = prev_depth;
            while j >= depth {
                let link = list.files[prev_i].depth();
                if link >= 0 {
                    break;
                }
                list.files[prev_i].clear();
                prev_i = (-link - 1) as usize;
                j -= 1;
            }
            prev_depth = depth;
            let name = list.files[i].full_name();
            if opts
                .is_excluded
                .is_some_and(|excluded| excluded(&name, true))
            {
                redeem_chain(list, &mut prev_i, prev_depth - 1);
            } else {
                list.files[i].set_depth(-(prev_i as i32) - 1);
            }
            prev_i = i;
        } else {
            redeem_chain(list, &mut prev_i, prev_depth);
        }
    }

    // Clear whatever chains are still pending.
    loop {
        let link = list.files[prev_i].depth();
        if link >= 0 {
            break;
        }
        list.files[prev_i].clear();
        prev_i = (-link - 1) as usize;
    }

    let mut new_low = low;
    while new_low <= high && !list.files[new_low].is_active() {
        new_low += 1;
    }
    list.low = new_low as isize;
    let mut new_high = high as isize;
    while new_high >= list.low && !list.files[new_high as usize].is_active() {
        new_high -= 1;
    }
    list.high = new_high;
}

/// Restores real depths along the pending chain ending at `prev_i`.
fn redeem_chain(list: &mut FileList, prev_i: &mut usize, start_depth: i32) {
    let mut j = start_depth;
    loop {
        let link = list.files[*prev_i].depth();
        if link >= 0 {
            break;
        }
        list.files[*prev_i].set_depth(j);
        *prev_i = (-link - 1) as usize;
        j -= 1;
    }
}
