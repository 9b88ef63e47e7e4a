#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Ordered include/exclude rule engine.
//!
//! A transfer carries an ordered list of filter rules; every candidate
//! name is checked against the list and the first matching rule decides
//! whether the name stays in the file list. Patterns use shell globbing
//! where `*` stops at slashes and `**` does not, a leading `/` anchors a
//! pattern at the transfer root, and a trailing `/` restricts it to
//! directories.
//!
//! - [`FilterRule`] / [`FilterSet`] - rules as stated and the compiled,
//!   ordered list that evaluates them.
//! - [`parse_rules`] / [`read_rules_file`] - the loader: prefix handling,
//!   word splitting, the `!` reset token, comment lines.
//! - [`cvs_default_patterns`] / [`cvs_exclusion_rules`] - the CVS-style
//!   default exclusions.
//! - [`wire`] - sending the rule list to the peer and reconstituting it.
//! - [`wildmatch`] - the underlying glob matcher.

mod cvs;
mod error;
mod parse;
mod rule;
mod set;
mod wildmatch;
pub mod wire;

pub use cvs::{cvs_default_patterns, cvs_exclusion_rules};
pub use error::{FilterError, FilterResult};
pub use parse::{ParseOptions, parse_rules, read_rules_file};
pub use rule::{FilterAction, FilterRule};
pub use set::{FilterSet, LocalScope};
pub use wildmatch::wildmatch;
