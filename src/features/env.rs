//! The execution context handed to feature callbacks.
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLockReadGuard;

use super::feature::Feature;
use crate::config::Configuration;
use crate::error::ExecError;
use crate::exec::{Executor, Invocation, RunOptions, interpolate};
use crate::logging::Log;

/// What a command run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    /// Exited with status zero; output was not captured.
    Succeeded,
    /// Failed in soft-check mode.
    Failed,
    /// Exited with status zero; standard output as captured.
    Captured(String),
}

impl RunOutput {
    /// Whether the command succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    /// The captured output, or an empty string if nothing was captured.
    #[must_use]
    pub fn into_stdout(self) -> String {
        match self {
            Self::Captured(stdout) => stdout,
            Self::Succeeded | Self::Failed => String::new(),
        }
    }
}

/// A feature's view of the run: its identity, the shared configuration, the
/// logger, and command execution.
pub struct Env<'a> {
    feature: &'a Feature,
    executor: &'a dyn Executor,
    log: &'a dyn Log,
}

impl fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("feature", &self.feature.name())
            .field("executor", &"<dyn Executor>")
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl<'a> Env<'a> {
    pub(super) fn new(feature: &'a Feature, executor: &'a dyn Executor, log: &'a dyn Log) -> Self {
        Self {
            feature,
            executor,
            log,
        }
    }

    /// The feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.feature.name()
    }

    /// The feature description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.feature.description()
    }

    /// The resolved configuration.
    pub fn configuration(&self) -> RwLockReadGuard<'a, Configuration> {
        self.feature.configuration()
    }

    /// The dotfile source directory.
    #[must_use]
    pub fn source(&self) -> PathBuf {
        self.feature.source()
    }

    /// The logger.
    #[must_use]
    pub fn log(&self) -> &'a dyn Log {
        self.log
    }

    /// Run a command.
    ///
    /// Every argument has its `${token}` references replaced by the
    /// shell-quoted values in `substitutions`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid `options`, an empty command, a process
    /// that cannot be started, or, unless `options.check` is set, a non-zero
    /// exit. In soft-check mode a program that does not exist counts as a
    /// failed run rather than an error.
    pub fn execute<S: AsRef<str>>(
        &self,
        args: &[S],
        options: RunOptions,
        substitutions: &[(&str, &str)],
    ) -> Result<RunOutput, ExecError> {
        options.validate()?;
        let args = args
            .iter()
            .map(|arg| interpolate(arg.as_ref(), substitutions))
            .collect::<Result<Vec<_>, _>>()?;
        if args.is_empty() {
            return Err(ExecError::EmptyCommand {
                feature: self.name().to_string(),
            });
        }

        let invocation = Invocation {
            args,
            interactive: options.interactive,
            output: options.output_mode(),
        };
        let command = invocation.command_line();
        self.log.debug(&format!("{}: {command}", self.name()));

        let result = match self.executor.execute(&invocation) {
            Ok(result) => result,
            Err(ExecError::Spawn { source, .. })
                if options.check && source.kind() == ErrorKind::NotFound =>
            {
                self.log.debug(&format!("{}: {command}: not found", self.name()));
                return Ok(RunOutput::Failed);
            }
            Err(e) => return Err(e),
        };

        if result.success {
            Ok(if options.capture {
                RunOutput::Captured(result.stdout)
            } else {
                RunOutput::Succeeded
            })
        } else if options.check {
            Ok(RunOutput::Failed)
        } else {
            Err(ExecError::CommandFailed {
                command,
                feature: self.name().to_string(),
                code: result.code,
            })
        }
    }

    /// Run a command interactively with output shown; failure is an error.
    ///
    /// # Errors
    ///
    /// See [`Env::execute`].
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<(), ExecError> {
        self.run_with(args, &[])
    }

    /// [`Env::run`] with `${token}` substitutions.
    ///
    /// # Errors
    ///
    /// See [`Env::execute`].
    pub fn run_with<S: AsRef<str>>(
        &self,
        args: &[S],
        substitutions: &[(&str, &str)],
    ) -> Result<(), ExecError> {
        self.execute(args, RunOptions::default(), substitutions)
            .map(|_| ())
    }

    /// Run a command silently without input and report whether it
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error only if the command cannot be started for a reason
    /// other than the program not existing.
    pub fn probe<S: AsRef<str>>(&self, args: &[S]) -> Result<bool, ExecError> {
        self.probe_with(args, &[])
    }

    /// [`Env::probe`] with `${token}` substitutions.
    ///
    /// # Errors
    ///
    /// See [`Env::probe`].
    pub fn probe_with<S: AsRef<str>>(
        &self,
        args: &[S],
        substitutions: &[(&str, &str)],
    ) -> Result<bool, ExecError> {
        self.execute(args, RunOptions::probe(), substitutions)
            .map(|output| output.succeeded())
    }

    /// Run a command without input and return its standard output.
    ///
    /// # Errors
    ///
    /// See [`Env::execute`].
    pub fn capture<S: AsRef<str>>(&self, args: &[S]) -> Result<String, ExecError> {
        self.execute(args, RunOptions::capture(), &[])
            .map(RunOutput::into_stdout)
    }
}
