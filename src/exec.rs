//! External command execution.
//!
//! Feature callbacks never spawn processes directly: they go through an
//! [`Executor`] so the lifecycle engine can be driven against a mock.
use std::borrow::Cow;
use std::process::{Command, Output, Stdio};

use crate::error::ExecError;

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output (empty unless output was captured).
    pub stdout: String,
    /// Captured standard error (empty unless output was captured).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
}

impl ExecResult {
    /// A successful result with the given standard output.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// A failed result with the given exit code.
    #[must_use]
    pub const fn failed(code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            success: false,
            code: Some(code),
        }
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Where the standard output and error of a command go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Shown on the terminal.
    Inherit,
    /// Collected and returned.
    Capture,
    /// Discarded.
    Silent,
}

/// How a feature wants a command run.
///
/// `check` turns a non-zero exit into a `false` result instead of an error.
/// `check` and `capture` are mutually exclusive, as are `capture` and
/// `silent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunOptions {
    /// Report failure as a value instead of an error.
    pub check: bool,
    /// Capture and return standard output.
    pub capture: bool,
    /// Connect standard input to the terminal; otherwise `/dev/null`.
    pub interactive: bool,
    /// Discard all output.
    pub silent: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            check: false,
            capture: false,
            interactive: true,
            silent: false,
        }
    }
}

impl RunOptions {
    /// Options for a presence probe: soft failure, no input, no output.
    #[must_use]
    pub const fn probe() -> Self {
        Self {
            check: true,
            capture: false,
            interactive: false,
            silent: true,
        }
    }

    /// Options for reading a command's output without input.
    #[must_use]
    pub const fn capture() -> Self {
        Self {
            check: false,
            capture: true,
            interactive: false,
            silent: false,
        }
    }

    /// Reject invalid combinations.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::InvalidOptions`] for `check` with `capture` or
    /// `capture` with `silent`.
    pub const fn validate(&self) -> Result<(), ExecError> {
        if self.check && self.capture {
            return Err(ExecError::InvalidOptions(
                "check and capture are mutually exclusive",
            ));
        }
        if self.capture && self.silent {
            return Err(ExecError::InvalidOptions(
                "capture and silent are mutually exclusive",
            ));
        }
        Ok(())
    }

    /// The output handling these options ask for.
    #[must_use]
    pub const fn output_mode(&self) -> OutputMode {
        if self.capture {
            OutputMode::Capture
        } else if self.silent {
            OutputMode::Silent
        } else {
            OutputMode::Inherit
        }
    }
}

/// A fully interpolated command ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its arguments.
    pub args: Vec<String>,
    /// Whether standard input is inherited.
    pub interactive: bool,
    /// Output handling.
    pub output: OutputMode,
}

impl Invocation {
    /// The command line, for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Runs external commands.
#[cfg_attr(test, mockall::automock)]
pub trait Executor {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit is not an error at this level; it is reported through
    /// [`ExecResult::success`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    fn execute(&self, invocation: &Invocation) -> Result<ExecResult, ExecError>;
}

/// Runs commands on the host with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecResult, ExecError> {
        let Some((program, args)) = invocation.args.split_first() else {
            return Err(ExecError::InvalidArgument("empty command".to_string()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(if invocation.interactive {
            Stdio::inherit()
        } else {
            Stdio::null()
        });
        let (stdout, stderr) = match invocation.output {
            OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
            OutputMode::Capture => (Stdio::piped(), Stdio::piped()),
            OutputMode::Silent => (Stdio::null(), Stdio::null()),
        };
        cmd.stdout(stdout).stderr(stderr);

        let output = cmd.output().map_err(|source| ExecError::Spawn {
            command: invocation.command_line(),
            source,
        })?;
        Ok(ExecResult::from(output))
    }
}

/// Replace every `${token}` in `arg` with the shell-quoted value bound to
/// `token` in `substitutions`. Unknown tokens are left untouched.
///
/// # Examples
///
/// ```
/// use dotfiles_features::exec::interpolate;
///
/// let arg = interpolate("${name}", &[("name", "vim")]).unwrap();
/// assert_eq!(arg, "vim");
/// let arg = interpolate("${dir}", &[("dir", "my dir")]).unwrap();
/// assert_eq!(shlex::split(&arg), Some(vec!["my dir".to_string()]));
/// assert_eq!(interpolate("${other}", &[]).unwrap(), "${other}");
/// ```
///
/// # Errors
///
/// Returns [`ExecError::InvalidArgument`] if a value cannot be quoted (it
/// contains a NUL byte).
pub fn interpolate(arg: &str, substitutions: &[(&str, &str)]) -> Result<String, ExecError> {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(start) = rest.find("${") {
        let (before, token_start) = rest.split_at(start);
        out.push_str(before);
        let body = token_start.get(2..).unwrap_or_default();
        match body.find('}') {
            Some(end) if end > 0 => {
                let name = body.get(..end).unwrap_or_default();
                let after = body.get(end + 1..).unwrap_or_default();
                match substitutions.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(&quote(value)?),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = after;
            }
            _ => {
                out.push_str("${");
                rest = body;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn quote(value: &str) -> Result<Cow<'_, str>, ExecError> {
    shlex::try_quote(value)
        .map_err(|e| ExecError::InvalidArgument(format!("{value:?}: {e}")))
}

/// Run a command outside of any feature, allowing failure.
///
/// # Errors
///
/// Returns an error if the process cannot be started.
pub fn run_unchecked(program: &str, args: &[&str]) -> Result<ExecResult, ExecError> {
    let mut all = vec![program.to_string()];
    all.extend(args.iter().map(ToString::to_string));
    SystemExecutor.execute(&Invocation {
        args: all,
        interactive: false,
        output: OutputMode::Capture,
    })
}
