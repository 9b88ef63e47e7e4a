//! crates/filters/src/set.rs
//!
//! The ordered rule list and its per-directory local scopes.
//!
//! Rules are evaluated in order and the first match decides; no match
//! keeps the name. Per-directory rule files are pushed as the walker
//! descends and popped on the way back up; local rules sit in front of
//! the main list so the deepest directory's rules are consulted first.

use std::path::Path;

use logging::debug_log;

use crate::cvs::cvs_exclusion_rules;
use crate::error::FilterResult;
use crate::parse::{ParseOptions, read_rules_file};
use crate::rule::{CompiledRule, FilterAction, FilterRule};

/// Token pairing a [`FilterSet::push_local_rules`] with its pop.
#[derive(Debug)]
#[must_use = "local rules must be popped when leaving the directory"]
pub struct LocalScope {
    count: usize,
}

/// An ordered include/exclude rule list.
#[derive(Debug, Default)]
pub struct FilterSet {
    rules: Vec<CompiledRule>,
    local: Vec<CompiledRule>,
    working_dir: String,
    anchor_prefix: Option<String>,
}

impl FilterSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            local: Vec::new(),
            working_dir: "/".to_owned(),
            anchor_prefix: None,
        }
    }

    /// Compiles `rules` into a set.
    pub fn from_rules(rules: impl IntoIterator<Item = FilterRule>) -> FilterResult<Self> {
        let mut set = Self::new();
        for rule in rules {
            set.add_rule(&rule)?;
        }
        Ok(set)
    }

    /// Compiles `rules` and appends the CVS exclusion defaults.
    ///
    /// With `read_env_sources` the user's `$HOME/.cvsignore` file and the
    /// `CVSIGNORE` environment variable are consulted as well.
    pub fn from_rules_with_cvs(
        rules: impl IntoIterator<Item = FilterRule>,
        read_env_sources: bool,
    ) -> FilterResult<Self> {
        let mut set = Self::from_rules(rules)?;
        for rule in cvs_exclusion_rules(read_env_sources)? {
            set.add_rule(&rule)?;
        }
        Ok(set)
    }

    /// Directory names are absolutized against this for absolute-rooted
    /// rules. Defaults to `/`.
    pub fn set_working_dir(&mut self, dir: impl Into<String>) {
        self.working_dir = dir.into();
    }

    /// Builder form of [`Self::set_working_dir`].
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.set_working_dir(dir);
        self
    }

    /// Sets the absolute prefix prepended to anchored rules added from
    /// here on; rules added under a prefix match against absolute names.
    pub fn set_anchor_prefix(&mut self, prefix: Option<String>) {
        self.anchor_prefix = prefix;
    }

    /// Appends one rule; a clear rule resets the list.
    pub fn add_rule(&mut self, rule: &FilterRule) -> FilterResult<()> {
        match rule.action() {
            FilterAction::Clear => {
                debug_log!(Filter, 1, "clearing filter list");
                self.rules.clear();
            }
            FilterAction::Include | FilterAction::Exclude => {
                let compiled = CompiledRule::compile(
                    rule.pattern(),
                    rule.action() == FilterAction::Include,
                    self.anchor_prefix.as_deref(),
                )?;
                debug_log!(
                    Filter,
                    2,
                    "add rule {} ({})",
                    rule.pattern(),
                    if compiled.include { "include" } else { "exclude" }
                );
                self.rules.push(compiled);
            }
        }
        Ok(())
    }

    /// Appends several rules.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = FilterRule>) -> FilterResult<()> {
        for rule in rules {
            self.add_rule(&rule)?;
        }
        Ok(())
    }

    /// True when no rules are loaded.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.local.is_empty()
    }

    /// Number of rules, local scopes included.
    pub fn len(&self) -> usize {
        self.rules.len() + self.local.len()
    }

    /// First-match verdict for `name`: `Some(true)` keep, `Some(false)`
    /// drop, `None` when no rule matches.
    pub fn check(&self, name: &str, is_dir: bool) -> Option<bool> {
        for rule in self.local.iter().chain(&self.rules) {
            if rule.matches(name, is_dir, &self.working_dir) {
                debug_log!(
                    Filter,
                    1,
                    "{} {} {} because of pattern {}{}",
                    if rule.include { "including" } else { "excluding" },
                    if is_dir { "directory" } else { "file" },
                    name,
                    rule.pattern,
                    if rule.directory_only { "/" } else { "" }
                );
                return Some(rule.include);
            }
        }
        None
    }

    /// True unless an exclude rule is the first match for `path`.
    pub fn allows(&self, path: &Path, is_dir: bool) -> bool {
        self.check(&path.to_string_lossy(), is_dir) != Some(false)
    }

    /// Reads a per-directory rule file and puts its rules in front of the
    /// list. A missing file pushes an empty scope. The returned token must
    /// be handed back to [`Self::pop_local_rules`] when leaving the
    /// directory.
    pub fn push_local_rules(
        &mut self,
        file: &Path,
        opts: &ParseOptions,
    ) -> FilterResult<LocalScope> {
        if !file.exists() {
            return Ok(LocalScope { count: 0 });
        }
        let mut compiled = Vec::new();
        for rule in read_rules_file(file, opts)? {
            match rule.action() {
                FilterAction::Clear => compiled.clear(),
                FilterAction::Include | FilterAction::Exclude => {
                    compiled.push(CompiledRule::compile(
                        rule.pattern(),
                        rule.action() == FilterAction::Include,
                        self.anchor_prefix.as_deref(),
                    )?);
                }
            }
        }
        debug_log!(
            Filter,
            2,
            "pushed {} local rules from {}",
            compiled.len(),
            file.display()
        );
        let count = compiled.len();
        self.local.splice(0..0, compiled);
        Ok(LocalScope { count })
    }

    /// Removes the rules a matching push added.
    pub fn pop_local_rules(&mut self, scope: LocalScope) {
        self.local.drain(0..scope.count);
    }

    pub(crate) fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }
}
