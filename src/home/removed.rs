//! Removing dotfiles that were deleted from the repository.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use git2::{Delta, DiffOptions, Repository, Sort};

use super::SOURCE_DIR;
use crate::logging::{Entry, Log, Status};

/// Paths below the source directory that any non-merge commit reachable
/// from a reference deleted, relative to the source directory.
///
/// # Errors
///
/// Returns an error if `root` is not a git repository or its history cannot
/// be read.
pub fn deleted_files(root: &Path) -> Result<BTreeSet<PathBuf>> {
    let repo = Repository::open(root)
        .with_context(|| format!("opening repository {}", root.display()))?;

    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TOPOLOGICAL)?;
    walk.push_glob("*")?;
    if repo.head().is_ok() {
        walk.push_head()?;
    }

    let mut options = DiffOptions::new();
    options.pathspec(SOURCE_DIR);

    let mut deleted = BTreeSet::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        if commit.parent_count() != 1 {
            continue;
        }
        let parent = commit.parent(0)?;
        let diff = repo.diff_tree_to_tree(
            Some(&parent.tree()?),
            Some(&commit.tree()?),
            Some(&mut options),
        )?;
        for delta in diff.deltas() {
            if delta.status() != Delta::Deleted {
                continue;
            }
            if let Some(relative) = delta
                .old_file()
                .path()
                .and_then(|p| p.strip_prefix(SOURCE_DIR).ok())
            {
                deleted.insert(relative.to_path_buf());
            }
        }
    }
    Ok(deleted)
}

/// Remove deprecated dotfiles from `target`.
///
/// Files deleted from the repository history that the source directory no
/// longer contains are removed from `target` when they are symlinks. Regular
/// files are reported and kept.
///
/// # Errors
///
/// Returns an error if the history cannot be read or a symlink cannot be
/// removed.
pub fn clean_removed(root: &Path, target: &Path, log: &dyn Log) -> Result<Vec<Entry>> {
    log.stage("Removing deprecated files");

    if Repository::open(root).is_err() {
        log.debug(&format!("{} is not a git repository, skipping", root.display()));
        return Ok(Vec::new());
    }

    let source = root.join(SOURCE_DIR);
    let mut entries = Vec::new();
    for relative in deleted_files(root)? {
        if source.join(&relative).exists() {
            continue;
        }
        let path = target.join(&relative);
        let Ok(metadata) = path.symlink_metadata() else {
            continue;
        };

        let name = relative.to_string_lossy().into_owned();
        if metadata.is_symlink() {
            log.info(&format!("removing: {name}"));
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
            log.record(&name, Status::Removed, None);
            entries.push(Entry {
                name,
                status: Status::Removed,
                message: None,
            });
        } else {
            log.warn(&format!(
                "{} was removed from the repository but is not a link, keeping it",
                path.display()
            ));
            log.record(&name, Status::Ignored, Some("not a link"));
            entries.push(Entry {
                name,
                status: Status::Ignored,
                message: Some("not a link".to_string()),
            });
        }
    }
    Ok(entries)
}
