//! Tracing subscriber: console formatter and log file layer.
use std::fmt;
use std::fs::{self, File};
use std::io::Write as _;
use std::sync::{Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use super::utils::{STAGE_TARGET, header_time, line_time, log_dir, log_file_path, plain};

/// Environment variable overriding the console filter (`EnvFilter` syntax).
pub const LOG_ENV: &str = "DOTFILES_LOG";

/// How an event is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    Error,
    Warn,
    Info,
    Debug,
}

impl Kind {
    fn of(event: &Event<'_>) -> Self {
        let metadata = event.metadata();
        match *metadata.level() {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO if metadata.target() == STAGE_TARGET => Self::Stage,
            Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }

    fn console_line(self, msg: &str) -> String {
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Self::Error => format!("\x1b[31mERROR\x1b[0m {msg}"),
            Self::Warn => format!("\x1b[33mWARN\x1b[0m  {msg}"),
            Self::Info => format!("  {msg}"),
            Self::Debug => format!("  \x1b[2m{msg}\x1b[0m"),
        }
    }

    fn file_line(self, time: &str, msg: &str) -> String {
        let msg = plain(msg);
        match self {
            Self::Stage => format!("[{time}] ==> {msg}"),
            Self::Error => format!("[{time}]     [error] {msg}"),
            Self::Warn => format!("[{time}]     [warn] {msg}"),
            Self::Info => format!("[{time}]     {msg}"),
            Self::Debug => format!("[{time}]     [debug] {msg}"),
        }
    }
}

/// Collects the `message` field of an event.
#[derive(Default)]
struct Message(String);

impl Message {
    fn of(event: &Event<'_>) -> String {
        let mut message = Self::default();
        event.record(&mut message);
        message.0
    }
}

impl Visit for Message {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Appends every event to the command's log file, escapes stripped and
/// each line timestamped.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<File>,
}

impl FileLayer {
    /// Truncate the log file of `command` and write a run header.
    ///
    /// Returns `None` when the log directory or file cannot be created; the
    /// run then logs to the console only.
    pub(super) fn open(command: &str) -> Option<Self> {
        fs::create_dir_all(log_dir()).ok()?;
        let mut file = File::create(log_file_path(command)).ok()?;
        let version = option_env!("DOTFILES_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
        writeln!(file, "# dotfiles {command} {version}, {}", header_time()).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: Subscriber> Layer<S> for FileLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let line = Kind::of(event).file_line(&line_time(), &Message::of(event));
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(file, "{line}");
    }
}

/// Console output: stage headers, indented messages, dimmed debug.
struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        writeln!(writer, "{}", Kind::of(event).console_line(&Message::of(event)))
    }
}

/// Install the global subscriber for a run of `command`.
///
/// The console shows `info` and above (`debug` with `verbose`) unless
/// [`LOG_ENV`] selects otherwise; warnings and errors go to standard error.
/// The log file at `$XDG_CACHE_HOME/dotfiles/<command>.log` receives every
/// event from `debug` up. Call once, before anything logs.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, filter::LevelFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _,
    };

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console = tracing_subscriber::fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(writer)
        .with_filter(filter);
    let file = FileLayer::open(command).map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry().with(console).with(file).init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;
    use crate::logging::TEST_ENV_MUTEX;

    #[test]
    fn console_lines() {
        let lines: Vec<String> = [
            (Kind::Stage, "Installing features"),
            (Kind::Info, "installing: Vi IMproved (vim)"),
            (Kind::Debug, "ignoring: Git (git)"),
            (Kind::Warn, ".bashrc: regular file exists"),
        ]
        .into_iter()
        .map(|(kind, msg)| plain(&kind.console_line(msg)))
        .collect();
        insta::assert_snapshot!(lines.join("\n"), @r"
        ==> Installing features
          installing: Vi IMproved (vim)
          ignoring: Git (git)
        WARN  .bashrc: regular file exists
        ");
    }

    #[test]
    fn file_lines_are_plain_and_tagged() {
        insta::assert_snapshot!(
            Kind::Stage.file_line("10:00:00", "\x1b[1mSummary\x1b[0m"),
            @"[10:00:00] ==> Summary"
        );
        insta::assert_snapshot!(
            Kind::Debug.file_line("10:00:01", "curl: which curl"),
            @"[10:00:01]     [debug] curl: which curl"
        );
        insta::assert_snapshot!(
            Kind::Error.file_line("10:00:02", "Command false for pip failed"),
            @"[10:00:02]     [error] Command false for pip failed"
        );
    }

    #[test]
    #[allow(unsafe_code)]
    fn open_writes_header() {
        let _lock = TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let tmp = tempfile::tempdir().unwrap();
        // SAFETY: Protected by TEST_ENV_MUTEX; restored before the lock is released.
        unsafe {
            std::env::set_var("XDG_CACHE_HOME", tmp.path());
        }
        let layer = FileLayer::open("config");
        unsafe {
            std::env::remove_var("XDG_CACHE_HOME");
        }
        assert!(layer.is_some());
        let contents = fs::read_to_string(tmp.path().join("dotfiles/config.log")).unwrap();
        assert!(contents.starts_with("# dotfiles config "), "{contents}");
    }

    #[test]
    fn stage_target_is_recognised() {
        #[derive(Default)]
        struct Kinds(Arc<Mutex<Vec<(Kind, String)>>>);

        impl<S: Subscriber> Layer<S> for Kinds {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                self.0
                    .lock()
                    .unwrap()
                    .push((Kind::of(event), Message::of(event)));
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Kinds(Arc::clone(&seen)));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "dotfiles::stage", "Copying files");
            tracing::info!("installing {}", "vim");
        });
        assert_eq!(
            *seen.lock().unwrap(),
            [
                (Kind::Stage, "Copying files".to_string()),
                (Kind::Info, "installing vim".to_string()),
            ]
        );
    }
}
