//! The production [`Log`]: tracing events plus a run summary.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::types::{Entry, Log, Status};
use super::utils::{STAGE_TARGET, log_file_path};

/// Logs through [`tracing`] and remembers every recorded outcome.
///
/// Console and log file output are configured by
/// [`init_subscriber`](super::init_subscriber); without it, messages go
/// nowhere but outcomes are still collected.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<Entry>>,
    log_file: PathBuf,
}

impl Logger {
    /// A logger for a run of `command`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Where this run's log file is written.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_file
    }

    /// Every outcome recorded so far, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded outcomes per status.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for entry in self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            *counts.entry(entry.status).or_default() += 1;
        }
        counts
    }

    /// Print what this run changed or skipped, then the totals.
    ///
    /// Unchanged items are only counted.
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");
        for entry in &entries {
            let (mark, colour) = match entry.status {
                Status::Installed => ("+", "\x1b[32m"),
                Status::Removed => ("-", "\x1b[36m"),
                Status::Disabled => ("x", "\x1b[2m"),
                Status::Ignored => continue,
            };
            let detail = entry
                .message
                .as_deref()
                .map(|m| format!(" ({m})"))
                .unwrap_or_default();
            self.info(&format!("{colour}{mark} {}{detail}\x1b[0m", entry.name));
        }

        let counts = self.counts();
        let count = |status: Status| counts.get(&status).copied().unwrap_or(0);
        println!();
        self.info(&format!(
            "{} installed, {} removed, {} unchanged, {} disabled",
            count(Status::Installed),
            count(Status::Removed),
            count(Status::Ignored),
            count(Status::Disabled),
        ));
        if self.log_file.exists() {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", self.log_file.display()));
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn record(&self, name: &str, status: Status, message: Option<&str>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
    }
}
