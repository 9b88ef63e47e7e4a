#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Verbosity flag system for info and debug output control.
//!
//! rsync's diagnostic output is governed by two families of flags:
//! `--info=FLAGS` and `--debug=FLAGS`, each carrying a small numeric level
//! per category. The classic `-v`/`-vv`/`-vvv` options are shorthands that
//! raise a fixed set of those levels. This crate models that system for the
//! file-list subsystem: a [`VerbosityConfig`] holds the per-flag levels,
//! [`init`] installs it for the current thread, and the [`info_log!`] /
//! [`debug_log!`] macros emit [`DiagnosticEvent`]s that pass the filter.
//!
//! Events are collected in a thread-local sink so library callers (and
//! tests) can drain and render them however they like; the optional
//! `tracing` feature forwards every accepted event to the `tracing`
//! ecosystem as well.

use std::cell::RefCell;
use std::fmt;

/// Info message categories used by the file-list subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InfoFlag {
    /// File-list building and transfer mentions.
    Flist,
    /// Miscellaneous informational messages.
    Misc,
    /// Mount-point skipping mentions.
    Mount,
    /// Per-file name output.
    Name,
    /// Mentions of skipped entries.
    Skip,
    /// Statistics at the end of a run.
    Stats,
}

/// Debug message categories used by the file-list subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebugFlag {
    /// Directory-change tracking in the walker.
    Chdir,
    /// Duplicate-removal decisions in the cleaner.
    Dup,
    /// Filter rule compilation and match decisions.
    Filter,
    /// File-list entry construction and wire traffic.
    Flist,
}

/// Per-flag levels for the info family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfoLevels {
    /// Level for [`InfoFlag::Flist`].
    pub flist: u8,
    /// Level for [`InfoFlag::Misc`].
    pub misc: u8,
    /// Level for [`InfoFlag::Mount`].
    pub mount: u8,
    /// Level for [`InfoFlag::Name`].
    pub name: u8,
    /// Level for [`InfoFlag::Skip`].
    pub skip: u8,
    /// Level for [`InfoFlag::Stats`].
    pub stats: u8,
}

impl InfoLevels {
    /// Returns the configured level for `flag`.
    pub const fn level(&self, flag: InfoFlag) -> u8 {
        match flag {
            InfoFlag::Flist => self.flist,
            InfoFlag::Misc => self.misc,
            InfoFlag::Mount => self.mount,
            InfoFlag::Name => self.name,
            InfoFlag::Skip => self.skip,
            InfoFlag::Stats => self.stats,
        }
    }
}

/// Per-flag levels for the debug family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugLevels {
    /// Level for [`DebugFlag::Chdir`].
    pub chdir: u8,
    /// Level for [`DebugFlag::Dup`].
    pub dup: u8,
    /// Level for [`DebugFlag::Filter`].
    pub filter: u8,
    /// Level for [`DebugFlag::Flist`].
    pub flist: u8,
}

impl DebugLevels {
    /// Returns the configured level for `flag`.
    pub const fn level(&self, flag: DebugFlag) -> u8 {
        match flag {
            DebugFlag::Chdir => self.chdir,
            DebugFlag::Dup => self.dup,
            DebugFlag::Filter => self.filter,
            DebugFlag::Flist => self.flist,
        }
    }
}

/// Complete verbosity configuration: one level per flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Info flag levels.
    pub info: InfoLevels,
    /// Debug flag levels.
    pub debug: DebugLevels,
}

impl VerbosityConfig {
    /// Builds the configuration implied by a `-v` count.
    ///
    /// Level 0 (`--quiet` territory) leaves everything off. Level 1
    /// enables the basic info categories. Level 2 raises `misc`/`name`,
    /// adds the secondary info categories, and switches the debug
    /// categories on. Higher levels keep raising everything by one.
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();
        if level >= 1 {
            config.info.flist = 1;
            config.info.misc = 1;
            config.info.name = 1;
            config.info.stats = 1;
        }
        if level >= 2 {
            config.info.misc = 2;
            config.info.name = 2;
            config.info.mount = 1;
            config.info.skip = 1;
            config.debug.chdir = 1;
            config.debug.dup = 1;
            config.debug.filter = 1;
            config.debug.flist = 1;
        }
        if level >= 3 {
            let bump = level - 2;
            config.info.flist += bump;
            config.info.misc += bump;
            config.info.name = 2;
            config.debug.chdir += bump;
            config.debug.dup += bump;
            config.debug.filter += bump;
            config.debug.flist += bump;
        }
        config
    }
}

/// One accepted diagnostic message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticEvent {
    /// Which flag family and category produced the event.
    pub source: EventSource,
    /// The message level the event was emitted at.
    pub level: u8,
    /// Rendered message text.
    pub message: String,
}

/// Origin of a [`DiagnosticEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSource {
    /// An `info_log!` message.
    Info(InfoFlag),
    /// A `debug_log!` message.
    Debug(DebugFlag),
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            EventSource::Info(flag) => write!(f, "[info:{flag:?}] {}", self.message),
            EventSource::Debug(flag) => write!(f, "[debug:{flag:?}] {}", self.message),
        }
    }
}

thread_local! {
    static CONFIG: RefCell<VerbosityConfig> = RefCell::new(VerbosityConfig::default());
    static EVENTS: RefCell<Vec<DiagnosticEvent>> = const { RefCell::new(Vec::new()) };
}

/// Installs `config` as the current thread's verbosity configuration.
pub fn init(config: VerbosityConfig) {
    CONFIG.with(|c| *c.borrow_mut() = config);
}

/// Returns the current thread's verbosity configuration.
pub fn current_config() -> VerbosityConfig {
    CONFIG.with(|c| *c.borrow())
}

/// True when `flag` is enabled at `level` or above.
pub fn info_gte(flag: InfoFlag, level: u8) -> bool {
    CONFIG.with(|c| c.borrow().info.level(flag) >= level)
}

/// True when `flag` is enabled at `level` or above.
pub fn debug_gte(flag: DebugFlag, level: u8) -> bool {
    CONFIG.with(|c| c.borrow().debug.level(flag) >= level)
}

/// Removes and returns every event accepted so far on this thread.
pub fn drain_events() -> Vec<DiagnosticEvent> {
    EVENTS.with(|e| std::mem::take(&mut *e.borrow_mut()))
}

/// Macro plumbing; use [`info_log!`] instead.
#[doc(hidden)]
pub fn __emit_info(flag: InfoFlag, level: u8, message: String) {
    #[cfg(feature = "tracing")]
    tracing::info!(flag = ?flag, level, "{message}");
    EVENTS.with(|e| {
        e.borrow_mut().push(DiagnosticEvent {
            source: EventSource::Info(flag),
            level,
            message,
        });
    });
}

/// Macro plumbing; use [`debug_log!`] instead.
#[doc(hidden)]
pub fn __emit_debug(flag: DebugFlag, level: u8, message: String) {
    #[cfg(feature = "tracing")]
    tracing::debug!(flag = ?flag, level, "{message}");
    EVENTS.with(|e| {
        e.borrow_mut().push(DiagnosticEvent {
            source: EventSource::Debug(flag),
            level,
            message,
        });
    });
}

/// Emits an info message when its category is enabled at the given level.
///
/// ```
/// use logging::{InfoFlag, VerbosityConfig, drain_events, info_log, init};
///
/// init(VerbosityConfig::from_verbose_level(1));
/// drain_events();
/// info_log!(Flist, 1, "building file list");
/// assert_eq!(drain_events().len(), 1);
/// ```
#[macro_export]
macro_rules! info_log {
    ($flag:ident, $level:expr, $($arg:tt)*) => {
        if $crate::info_gte($crate::InfoFlag::$flag, $level) {
            $crate::__emit_info($crate::InfoFlag::$flag, $level, format!($($arg)*));
        }
    };
}

/// Emits a debug message when its category is enabled at the given level.
#[macro_export]
macro_rules! debug_log {
    ($flag:ident, $level:expr, $($arg:tt)*) => {
        if $crate::debug_gte($crate::DebugFlag::$flag, $level) {
            $crate::__emit_debug($crate::DebugFlag::$flag, $level, format!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_suppresses_everything() {
        init(VerbosityConfig::default());
        drain_events();

        info_log!(Flist, 1, "quiet");
        debug_log!(Filter, 1, "quiet");

        assert!(drain_events().is_empty());
    }

    #[test]
    fn verbose_level_1_enables_basic_info() {
        let config = VerbosityConfig::from_verbose_level(1);

        assert_eq!(config.info.flist, 1);
        assert_eq!(config.info.misc, 1);
        assert_eq!(config.info.name, 1);
        assert_eq!(config.info.stats, 1);
        assert_eq!(config.info.mount, 0);
        assert_eq!(config.debug.filter, 0);
    }

    #[test]
    fn verbose_level_2_enables_debug() {
        let config = VerbosityConfig::from_verbose_level(2);

        assert_eq!(config.info.misc, 2);
        assert_eq!(config.info.name, 2);
        assert_eq!(config.info.mount, 1);
        assert_eq!(config.debug.dup, 1);
        assert_eq!(config.debug.flist, 1);
    }

    #[test]
    fn message_filtering_respects_levels() {
        init(VerbosityConfig::from_verbose_level(1));
        drain_events();

        info_log!(Name, 1, "kept");
        info_log!(Name, 2, "dropped");
        debug_log!(Flist, 1, "dropped");

        let events = drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "kept");
        assert_eq!(events[0].source, EventSource::Info(InfoFlag::Name));
    }

    #[test]
    fn display_includes_category() {
        let event = DiagnosticEvent {
            source: EventSource::Debug(DebugFlag::Dup),
            level: 1,
            message: "removing duplicate".to_owned(),
        };
        assert_eq!(event.to_string(), "[debug:Dup] removing duplicate");
    }
}
