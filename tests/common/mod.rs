// Shared helpers for integration tests.
//
// Provides an executor that records every command instead of running it, a
// log that keeps output in memory, and a temporary dotfiles repository.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use dotfiles_features::config::{Configuration, Facts};
use dotfiles_features::error::ExecError;
use dotfiles_features::exec::{ExecResult, Executor, Invocation};
use dotfiles_features::logging::{Entry, Log, Status};
use dotfiles_features::platform::{Distribution, Platform, Version};

/// An [`Executor`] that records command lines and fails those with a
/// configured prefix.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
    failing: Vec<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command line starting with `prefix` exit with status 1.
    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    /// The recorded command lines, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecResult, ExecError> {
        let line = invocation.command_line();
        let fails = self.failing.iter().any(|p| line.starts_with(p.as_str()));
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
        Ok(if fails {
            ExecResult::failed(1)
        } else {
            ExecResult::ok("")
        })
    }
}

/// A [`Log`] that keeps `level: message` lines and recorded outcomes.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
    entries: Mutex<Vec<Entry>>,
}

impl MemoryLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names recorded with `status`, in order.
    pub fn recorded(&self, status: Status) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.status == status)
            .map(|e| e.name)
            .collect()
    }

    fn push(&self, level: &str, msg: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{level}: {msg}"));
    }
}

impl Log for MemoryLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
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

/// A Debian 12 host.
pub fn debian() -> Platform {
    Platform::new(
        Distribution::new("Debian GNU/Linux", ["debian"]),
        Version::from(vec![12]),
    )
}

/// An Ubuntu 22.04 host, which is also Debian-like.
pub fn ubuntu() -> Platform {
    Platform::new(
        Distribution::new("Ubuntu", ["ubuntu", "debian"]),
        Version::from(vec![22, 4]),
    )
}

/// Resolve `content` as a single configuration source for `platform`.
pub fn resolve(content: &str, platform: &Platform) -> Configuration {
    let mut configuration = Configuration::new(Facts::for_platform(platform));
    configuration
        .merge_str(content, Path::new("configuration.conf"))
        .expect("resolve configuration");
    configuration
}

/// A dotfiles repository in a temporary directory.
#[derive(Debug)]
pub struct TestRepo {
    dir: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("repo/home")).expect("create home dir");
        Self { dir }
    }

    /// The repository root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    /// A scratch home directory next to the repository.
    pub fn target(&self) -> PathBuf {
        self.dir.path().join("target")
    }

    /// Write `content` to `relative` below the repository root.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write file");
        self
    }
}
