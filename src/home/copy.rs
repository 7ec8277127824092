//! Placing dotfiles from the repository into the home directory.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use globset::GlobSet;
use sha2::{Digest as _, Sha256};

use crate::logging::{Entry, Log, Status};

/// How dotfiles are placed in the home directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CopyMethod {
    /// Symlink each target to its source file.
    #[default]
    Link,
    /// Copy each source file to its target.
    Copy,
}

impl fmt::Display for CopyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Link => "link",
            Self::Copy => "copy",
        })
    }
}

impl CopyMethod {
    /// Whether `target` differs from what placing `source` would produce.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read.
    pub fn changed(self, source: &Path, target: &Path) -> Result<bool> {
        let Ok(metadata) = target.symlink_metadata() else {
            return Ok(true);
        };
        match self {
            Self::Link => Ok(!fs::read_link(target).is_ok_and(|link| link == source)),
            Self::Copy => {
                if metadata.is_symlink() {
                    return Ok(true);
                }
                let source_len = fs::metadata(source)
                    .with_context(|| format!("reading metadata: {}", source.display()))?
                    .len();
                if source_len != metadata.len() {
                    return Ok(true);
                }
                Ok(digest(source)? != digest(target)?)
            }
        }
    }

    /// Place `source` at `target`, creating parent directories.
    ///
    /// An existing symlink at `target` is replaced; any other existing file
    /// is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the target exists and is not a symlink, or if a
    /// file system operation fails.
    pub fn place(self, source: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent: {}", parent.display()))?;
        }
        if let Ok(metadata) = target.symlink_metadata() {
            anyhow::ensure!(
                metadata.is_symlink(),
                "refusing to replace {}",
                target.display()
            );
            fs::remove_file(target)
                .with_context(|| format!("remove existing: {}", target.display()))?;
        }

        match self {
            Self::Link => symlink(source, target),
            Self::Copy => fs::copy(source, target)
                .map(|_| ())
                .with_context(|| format!("copying {} to {}", source.display(), target.display())),
        }
    }
}

/// Every file below `source`, relative to it, sorted.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn collect_files(source: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if source.is_dir() {
        walk(source, Path::new(""), &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn walk(root: &Path, relative: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let dir = root.join(relative);
    for entry in fs::read_dir(&dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
        let path = relative.join(entry.file_name());
        if entry.path().is_dir() {
            walk(root, &path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Place every file of `source` below `target`.
///
/// Files matching `ignores` are reported [`Status::Disabled`], unchanged
/// files [`Status::Ignored`]. A regular file in the way is left alone with a
/// warning.
///
/// # Errors
///
/// Returns an error if the source cannot be read or a file cannot be placed.
pub fn place_files(
    source: &Path,
    target: &Path,
    method: CopyMethod,
    ignores: &GlobSet,
    log: &dyn Log,
) -> Result<Vec<Entry>> {
    log.stage("Copying files");

    // links must not depend on the working directory
    let source = &std::path::absolute(source)
        .with_context(|| format!("resolving {}", source.display()))?;
    let mut entries = Vec::new();
    for relative in collect_files(source)? {
        let name = relative.to_string_lossy().into_owned();
        let from = source.join(&relative);
        let to = target.join(&relative);

        let (status, message) = if ignores.is_match(&relative) {
            log.debug(&format!("disabled: {name}"));
            (Status::Disabled, None)
        } else if !method.changed(&from, &to)? {
            log.debug(&format!("ignoring: {name}"));
            (Status::Ignored, None)
        } else if is_regular_file(&to) {
            log.warn(&format!("{name} already exists in {}, leaving it alone", target.display()));
            (Status::Ignored, Some("regular file exists"))
        } else {
            log.info(&format!("installing: {name}"));
            method.place(&from, &to)?;
            (Status::Installed, None)
        };

        log.record(&name, status, message);
        entries.push(Entry {
            name,
            status,
            message: message.map(String::from),
        });
    }
    Ok(entries)
}

fn is_regular_file(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| !m.is_symlink())
}

fn digest(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Sha256::digest(&bytes).to_vec())
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(source, target).with_context(|| {
        format!(
            "creating symlink {} -> {}",
            target.display(),
            source.display()
        )
    })
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> Result<()> {
    std::os::windows::fs::symlink_file(source, target).with_context(|| {
        format!(
            "creating symlink {} -> {}",
            target.display(),
            source.display()
        )
    })
}
