//! Log file placement, escape stripping and timestamps.
use std::path::PathBuf;

/// Target of stage header events.
pub(super) const STAGE_TARGET: &str = "dotfiles::stage";

const ESC: char = '\x1b';

/// The directory holding one log file per command:
/// `$XDG_CACHE_HOME/dotfiles`, falling back to `~/.cache/dotfiles`.
pub(super) fn log_dir() -> PathBuf {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".cache"))
        })
        .unwrap_or_else(|| PathBuf::from(".cache"));
    cache.join("dotfiles")
}

/// The log file written for `command`.
pub(super) fn log_file_path(command: &str) -> PathBuf {
    log_dir().join(format!("{command}.log"))
}

/// `text` without terminal escape sequences.
///
/// A CSI sequence (`ESC [` parameters and a final byte in `@`..=`~`) is
/// dropped whole; any other escape drops the escape and the byte after it.
pub(super) fn plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != ESC {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            let _ = chars.by_ref().find(|c| ('@'..='~').contains(c));
        }
    }
    out
}

/// The local date and time for a log file header.
pub(super) fn header_time() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}

/// The local time of day for a log line.
pub(super) fn line_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::TEST_ENV_MUTEX;

    #[test]
    fn plain_drops_colour_and_cursor_sequences() {
        assert_eq!(plain("\x1b[1;34m==>\x1b[0m \x1b[1mInstalling features\x1b[0m"), "==> Installing features");
        assert_eq!(plain("\x1b[2K\x1b[1Gcurl"), "curl");
        assert_eq!(plain("\x1b7saved\x1b8"), "saved");
        assert_eq!(plain("no escapes"), "no escapes");
        assert_eq!(plain(""), "");
    }

    #[test]
    fn plain_keeps_text_after_unterminated_escape() {
        assert_eq!(plain("vim\x1b"), "vim");
        assert_eq!(plain("\x1b[31"), "");
    }

    #[test]
    fn line_time_is_hours_minutes_seconds() {
        let time = line_time();
        let fields: Vec<&str> = time.split(':').collect();
        assert_eq!(fields.len(), 3, "{time}");
        assert!(fields.iter().all(|f| f.len() == 2 && f.parse::<u8>().is_ok()));
    }

    #[test]
    fn header_time_carries_an_offset() {
        let time = header_time();
        let (_, offset) = time.rsplit_once(' ').unwrap();
        assert!(offset.starts_with('+') || offset.starts_with('-'), "{time}");
    }

    #[test]
    #[allow(unsafe_code)]
    fn log_file_lives_below_xdg_cache_home() {
        let _lock = TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // SAFETY: Protected by TEST_ENV_MUTEX; restored before the lock is released.
        unsafe {
            std::env::set_var("XDG_CACHE_HOME", "/var/cache/me");
        }
        let path = log_file_path("list");
        unsafe {
            std::env::remove_var("XDG_CACHE_HOME");
        }
        assert_eq!(path, PathBuf::from("/var/cache/me/dotfiles/list.log"));
    }
}
