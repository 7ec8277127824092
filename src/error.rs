//! Domain-specific error types for the provisioner.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`FeatureError`]) while command handlers and feature callbacks work with
//! [`anyhow::Error`] and convert via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotfilesError
//! ├── Config(ConfigError)    : configuration sources, guards, reserved names
//! ├── Feature(FeatureError)  : registration and dependency resolution
//! ├── Exec(ExecError)        : external command execution
//! └── Platform(PlatformError): host detection
//! ```
//!
//! Every variant is fatal for the run except a command failure requested in
//! soft-check mode, which never becomes an error in the first place.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the provisioner.
#[derive(Error, Debug)]
pub enum DotfilesError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Feature registration or dependency error.
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// External command error.
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Platform detection error.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Errors that arise while reading and resolving configuration sources.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source defines the section reserved for the fact environment.
    #[error("the section [{section}] in {} is reserved", source_path.display())]
    ReservedSection {
        /// The configuration source that defined the section.
        source_path: PathBuf,
        /// The offending section name.
        section: String,
    },

    /// The source contains a line that cannot be interpreted.
    #[error("Invalid syntax in {} at line {line}: {message}", file.display())]
    InvalidSyntax {
        /// The configuration source.
        file: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Human-readable description of the problem.
        message: String,
    },

    /// A guard expression could not be compiled or evaluated.
    #[error(
        "invalid guard for section [{section}] in {}: `{expression}`: {message}",
        source_path.display()
    )]
    Guard {
        /// The configuration source that defined the section.
        source_path: PathBuf,
        /// Name of the guarded section.
        section: String,
        /// The expression text.
        expression: String,
        /// What went wrong.
        message: String,
    },

    /// An I/O error occurred while reading an existing source.
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from the feature registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    /// A feature with this name is already registered.
    #[error("Feature \"{0}\" added twice")]
    Duplicate(String),

    /// Some dependency names do not resolve to registered features.
    #[error(
        "Feature {feature} has unmet dependencies: {} (available features: {})",
        missing.join(", "),
        available.join(", ")
    )]
    UnmetDependencies {
        /// The dependent feature, as `name - description`.
        feature: String,
        /// Dependency names that did not resolve.
        missing: Vec<String>,
        /// All names currently known to the registry.
        available: Vec<String>,
    },

    /// The dependency graph contains a cycle.
    #[error("Feature dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// No feature with this name is registered.
    #[error("Unknown feature \"{0}\"")]
    Unknown(String),
}

/// Errors that arise when running external commands.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The requested option combination is not allowed.
    #[error("invalid run options: {0}")]
    InvalidOptions(&'static str),

    /// A substitution value cannot be represented as a shell word.
    #[error("invalid command argument: {0}")]
    InvalidArgument(String),

    /// The command has no program to run.
    #[error("empty command for {feature}")]
    EmptyCommand {
        /// The owning feature.
        feature: String,
    },

    /// The process could not be started.
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// The command line.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The command exited unsuccessfully and the caller did not ask for a
    /// soft check.
    #[error("Command {command} for {feature} failed")]
    CommandFailed {
        /// The command line.
        command: String,
        /// The owning feature.
        feature: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },
}

/// Errors that arise from platform detection.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The host could not be identified.
    #[error("The current platform is not supported: {0}")]
    DetectionFailed(String),

    /// A version string is not a dotted sequence of numbers.
    #[error("invalid version \"{0}\"")]
    InvalidVersion(String),
}
