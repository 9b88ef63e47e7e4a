//! crates/filters/src/cvs.rs
//!
//! CVS-style default exclusions.
//!
//! The base token list comes from the CVS manual; the user can extend it
//! through `$HOME/.cvsignore` and the `CVSIGNORE` environment variable.
//! All of these sources are word-split with prefix handling disabled, so
//! a literal `+` or `-` in a token stays pattern text.

use std::env;
use std::path::Path;

use crate::error::FilterResult;
use crate::parse::{ParseOptions, parse_rules, read_rules_file};
use crate::rule::FilterRule;

const DEFAULT_CVSIGNORE: &str = "RCS SCCS CVS CVS.adm RCSLOG cvslog.* tags TAGS \
     .make.state .nse_depinfo *~ #* .#* ,* _$* *$ \
     *.old *.bak *.BAK *.orig *.rej .del-* \
     *.a *.olb *.o *.obj *.so *.exe \
     *.Z *.elc *.ln core \
     .svn/";

const CVS_PARSE: ParseOptions = ParseOptions {
    word_split: true,
    no_prefixes: true,
    default_include: false,
    eol_nulls: false,
};

/// The built-in CVS ignore tokens.
pub fn cvs_default_patterns() -> impl Iterator<Item = &'static str> {
    DEFAULT_CVSIGNORE.split_ascii_whitespace()
}

/// Builds the full CVS exclusion rule list.
///
/// With `read_env_sources` the user's `$HOME/.cvsignore` and the
/// `CVSIGNORE` environment variable are appended after the defaults, in
/// that order.
pub fn cvs_exclusion_rules(read_env_sources: bool) -> FilterResult<Vec<FilterRule>> {
    let mut rules = parse_rules(DEFAULT_CVSIGNORE, &CVS_PARSE);
    if read_env_sources {
        if let Some(home) = env::var_os("HOME") {
            let user_file = Path::new(&home).join(".cvsignore");
            if user_file.exists() {
                rules.extend(read_rules_file(&user_file, &CVS_PARSE)?);
            }
        }
        if let Ok(extra) = env::var("CVSIGNORE") {
            rules.extend(parse_rules(&extra, &CVS_PARSE));
        }
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::FilterAction;

    #[test]
    fn defaults_cover_the_classic_tokens() {
        let patterns: Vec<&str> = cvs_default_patterns().collect();
        for expected in ["RCS", "CVS", "core", "*.o", "*.bak", "*~", ".svn/"] {
            assert!(patterns.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn default_rules_are_all_excludes() {
        let rules = cvs_exclusion_rules(false).expect("rules");
        assert_eq!(rules.len(), cvs_default_patterns().count());
        assert!(rules.iter().all(|r| r.action() == FilterAction::Exclude));
    }
}
