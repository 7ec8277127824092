//! Core logging types: outcome entries, status, and the [`Log`] trait.
use std::fmt;

/// Outcome of a feature or dotfile for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Feature name or dotfile path.
    pub name: String,
    /// How the item was handled.
    pub status: Status,
    /// Optional detail message (e.g., why an item was left alone).
    pub message: Option<String>,
}

/// How a feature or dotfile was handled during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Blacklisted feature or ignored dotfile.
    Disabled,
    /// Already present or unchanged; nothing to do.
    Ignored,
    /// Installed or placed during this run.
    Installed,
    /// Deprecated dotfile removed from the home directory.
    Removed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disabled => "disabled",
            Self::Ignored => "ignored",
            Self::Installed => "installed",
            Self::Removed => "removed",
        })
    }
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) is the console and file backend; tests
/// substitute recorders to observe what the engine reports.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record an outcome for the summary.
    fn record(&self, name: &str, status: Status, message: Option<&str>);
}
