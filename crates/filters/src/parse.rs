//! crates/filters/src/parse.rs
//!
//! The rule loader: single patterns, whitespace-split token lists, and
//! rule files.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::FilterResult;
use crate::rule::FilterRule;

/// How pattern text is interpreted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Split the text on whitespace into one pattern per token.
    pub word_split: bool,
    /// Do not honor `+ `/`- ` prefixes (they become pattern text).
    pub no_prefixes: bool,
    /// Unprefixed patterns include instead of exclude.
    pub default_include: bool,
    /// Rule files are NUL-delimited instead of line-delimited.
    pub eol_nulls: bool,
}

/// Returns the next token and the remainder.
///
/// A token runs to the next whitespace, except that a leading `+ ` or
/// `- ` (when prefixes are honored) stays attached to the word after it.
fn next_token<'a>(text: &'a str, opts: &ParseOptions) -> Option<(&'a str, &'a str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let mut end = 0;
    if !opts.no_prefixes
        && (bytes[0] == b'+' || bytes[0] == b'-')
        && bytes.get(1) == Some(&b' ')
    {
        end = 2;
    }
    while end < bytes.len() && !bytes[end].is_ascii_whitespace() {
        end += 1;
    }
    Some((&text[..end], &text[end..]))
}

/// Splits an optional `+ `/`- ` prefix off one token.
fn parse_token(token: &str, opts: &ParseOptions) -> FilterRule {
    if token == "!" {
        return FilterRule::clear();
    }
    if !opts.no_prefixes {
        if let Some(rest) = token.strip_prefix("+ ") {
            return FilterRule::include(rest);
        }
        if let Some(rest) = token.strip_prefix("- ") {
            return FilterRule::exclude(rest);
        }
    }
    if opts.default_include {
        FilterRule::include(token)
    } else {
        FilterRule::exclude(token)
    }
}

/// Parses pattern text into rules.
///
/// In word-split mode the text yields one rule per whitespace-separated
/// token and a bare `!` token resets the list; otherwise the whole text is
/// a single pattern.
pub fn parse_rules(text: &str, opts: &ParseOptions) -> Vec<FilterRule> {
    let mut rules = Vec::new();
    if opts.word_split {
        let mut rest = text;
        while let Some((token, remainder)) = next_token(rest, opts) {
            rules.push(parse_token(token, opts));
            rest = remainder;
        }
    } else if !text.is_empty() {
        rules.push(parse_token(text, opts));
    }
    rules
}

/// Reads rules from a file, one pattern per line.
///
/// Lines beginning with `#` or `;` are comments. A path of `-` reads
/// standard input. Separators are `\n`/`\r`, or NUL when
/// [`ParseOptions::eol_nulls`] is set.
pub fn read_rules_file(path: &Path, opts: &ParseOptions) -> FilterResult<Vec<FilterRule>> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().lock().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(path)?
    };

    let mut rules = Vec::new();
    let lines = bytes.split(|&b| {
        if opts.eol_nulls {
            b == 0
        } else {
            b == b'\n' || b == b'\r'
        }
    });
    for line in lines {
        if line.is_empty() || line[0] == b';' || line[0] == b'#' {
            continue;
        }
        let line = String::from_utf8_lossy(line);
        rules.extend(parse_rules(&line, opts));
    }
    Ok(rules)
}
