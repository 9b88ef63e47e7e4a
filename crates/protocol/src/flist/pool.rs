//! crates/protocol/src/flist/pool.rs
//!
//! Dirname sharing for file-list entries.
//!
//! Consecutive entries overwhelmingly live in the same directory, so the
//! list's pool keeps one copy of each dirname and points every record at
//! it: the pool hands back a clone of the previous `Arc<str>` allocation
//! whenever the dirname repeats.

use std::sync::Arc;

/// Interns dirnames, reusing the most recent allocation on repeats.
#[derive(Debug, Default)]
pub struct DirnamePool {
    last: Option<Arc<str>>,
}

impl DirnamePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a shared allocation for `dirname`.
    pub fn intern(&mut self, dirname: &str) -> Arc<str> {
        if let Some(last) = &self.last {
            if **last == *dirname {
                return Arc::clone(last);
            }
        }
        let shared: Arc<str> = Arc::from(dirname);
        self.last = Some(Arc::clone(&shared));
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_dirnames_share_one_allocation() {
        let mut pool = DirnamePool::new();
        let a = pool.intern("src/module");
        let b = pool.intern("src/module");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_dirname_breaks_the_run() {
        let mut pool = DirnamePool::new();
        let a = pool.intern("src");
        let _other = pool.intern("tests");
        let c = pool.intern("src");
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(&*c, "src");
    }
}
