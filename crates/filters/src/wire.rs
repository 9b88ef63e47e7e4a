//! crates/filters/src/wire.rs
//!
//! Exchange of the rule list with the peer.
//!
//! The stream is a sequence of length-prefixed textual patterns followed
//! by a zero length. Includes always travel with their `+ ` prefix, and an
//! exclude whose literal text begins with `+ ` or `- ` gets an explicit
//! `- ` prefix so it cannot be misparsed; directory-only rules re-append
//! the slash that compilation stripped.

use std::io::{Read, Write};

use protocol::{MAXPATHLEN, read_buf, read_int, write_buf, write_int};

use crate::error::{FilterError, FilterResult};
use crate::parse::{ParseOptions, parse_rules};
use crate::rule::FilterRule;
use crate::set::FilterSet;

/// Sends `set`'s rules.
///
/// A non-recursive listing limits itself to one level by injecting an
/// exclude for `/*/*` ahead of the stream; that rule also stays in the
/// local set, mirroring what the peer will apply.
pub fn write_rule_list<W: Write + ?Sized>(
    w: &mut W,
    set: &mut FilterSet,
    list_only: bool,
    recurse: bool,
) -> FilterResult<()> {
    if list_only && !recurse {
        set.add_rule(&FilterRule::exclude("/*/*"))?;
    }

    for rule in set.rules() {
        let text = rule.wire_pattern();
        let len = text.len();
        if len == 0 || len >= MAXPATHLEN {
            continue;
        }
        if rule.include {
            write_int(w, (len + 2) as i32)?;
            write_buf(w, b"+ ")?;
        } else if text.starts_with("- ") || text.starts_with("+ ") {
            write_int(w, (len + 2) as i32)?;
            write_buf(w, b"- ")?;
        } else {
            write_int(w, len as i32)?;
        }
        write_buf(w, text.as_bytes())?;
    }

    write_int(w, 0)?;
    Ok(())
}

/// Receives a rule list and appends it to `set`.
pub fn read_rule_list<R: Read + ?Sized>(r: &mut R, set: &mut FilterSet) -> FilterResult<()> {
    loop {
        let len = read_int(r)?;
        if len == 0 {
            return Ok(());
        }
        if len < 0 || len as usize > MAXPATHLEN {
            return Err(FilterError::PatternTooLong {
                len: len.max(0) as usize,
                limit: MAXPATHLEN,
            });
        }
        let mut line = vec![0u8; len as usize];
        read_buf(r, &mut line)?;
        let line = String::from_utf8_lossy(&line);
        for rule in parse_rules(&line, &ParseOptions::default()) {
            set.add_rule(&rule)?;
        }
    }
}
