//! crates/protocol/src/flist/find.rs
//!
//! Binary search over a cleaned list.
//!
//! The sorted vector still contains cleared slots, so a probe that lands
//! on one follows the slot's forward-distance cursor to the next active
//! entry. Chains of stale cursors are collapsed as they are traversed, so
//! the next probe through the same slot is O(1). When the forward chase
//! leaves the window, the backward cursor from the midpoint is chased
//! instead and the window's top is pulled down to an active entry.

use std::cmp::Ordering;

use super::compare::compare_file_entries;
use super::entry::FileEntry;
use super::list::FileList;
use crate::version::ProtocolVersion;

impl FileList {
    /// Looks up an entry with the same name as `target`.
    ///
    /// Before protocol 29 a name match additionally requires the
    /// directory-ness of both sides to agree; from 29 on the comparator
    /// itself keeps directories and non-directories apart.
    pub fn find(&mut self, target: &FileEntry, protocol: ProtocolVersion) -> Option<usize> {
        let mut low = self.low;
        let mut high = self.high;

        while low <= high {
            let mid = ((low + high) / 2) as usize;
            let mid_up;
            if self.files[mid].is_active() {
                mid_up = mid;
            } else {
                let mut up = mid as isize + self.files[mid].skip_forward();
                if !self.files[up as usize].is_active() {
                    loop {
                        up += self.files[up as usize].skip_forward();
                        if self.files[up as usize].is_active() {
                            break;
                        }
                    }
                    self.files[mid].set_skip_forward(up - mid as isize);
                }
                if up > high {
                    // Nothing active left above mid: pull high down to an
                    // active entry below and keep going.
                    let mut down = mid as isize - self.files[mid].skip_back();
                    if !self.files[down as usize].is_active() {
                        loop {
                            down -= self.files[down as usize].skip_back();
                            if self.files[down as usize].is_active() {
                                break;
                            }
                        }
                        self.files[mid].set_skip_back(mid as isize - down);
                    }
                    high = down;
                    continue;
                }
                mid_up = up as usize;
            }

            match compare_file_entries(&self.files[mid_up], target, protocol) {
                Ordering::Equal => {
                    if !protocol.sorts_directories_specially()
                        && self.files[mid_up].is_dir() != target.is_dir()
                    {
                        return None;
                    }
                    return Some(mid_up);
                }
                Ordering::Less => low = mid_up as isize + 1,
                Ordering::Greater => high = mid as isize - 1,
            }
        }
        None
    }
}
