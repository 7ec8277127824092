//! Dotfiles: the files below `<root>/home`, placed into the user's home
//! directory.
pub mod copy;
pub mod removed;

use anyhow::{Context as _, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

pub use copy::{CopyMethod, collect_files, place_files};
pub use removed::{clean_removed, deleted_files};

/// The dotfile source directory below the repository root.
pub const SOURCE_DIR: &str = "home";

/// Section whose bare keys are glob patterns of dotfiles to skip.
pub const IGNORED_SECTION: &str = "ignored";

/// Compile ignore patterns, matched against paths relative to the source
/// directory. `*` also matches `/`.
///
/// # Errors
///
/// Returns an error naming the first invalid pattern.
pub fn ignore_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        builder.add(Glob::new(pattern).with_context(|| format!("invalid ignore pattern {pattern}"))?);
    }
    Ok(builder.build()?)
}
