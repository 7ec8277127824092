//! `curl` and downloads of install scripts.
use std::path::Path;

use anyhow::{Context as _, Result};
use tempfile::NamedTempFile;

use super::system;
use crate::exec::RunOptions;
use crate::features::{Env, FeatureBuilder};

/// The `curl` package feature.
#[must_use]
pub fn feature() -> FeatureBuilder {
    system::package("curl", None)
}

/// A downloaded file, removed when dropped.
///
/// The file is created exclusively with owner-only permissions under a
/// random name before `curl` writes to it.
#[derive(Debug)]
pub struct Download {
    file: NamedTempFile,
}

impl Download {
    /// Where the file was written.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The path as a command argument.
    #[must_use]
    pub fn arg(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }
}

/// Fetch `url` into a temporary file owned by the returned [`Download`].
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or `curl`
/// fails.
pub fn get(env: &Env<'_>, url: &str) -> Result<Download> {
    let file = tempfile::Builder::new()
        .prefix(&format!("dotfiles-{}-", env.name()))
        .tempfile()
        .context("creating download file")?;
    let download = Download { file };
    let options = RunOptions {
        interactive: false,
        silent: true,
        ..RunOptions::default()
    };
    let target = download.arg();
    env.execute(
        &["curl", "--fail", "--output", "${target}", "--location", "${url}"],
        options,
        &[("target", target.as_str()), ("url", url)],
    )?;
    Ok(download)
}
