//! Command: place dotfiles, install features, remove deprecated dotfiles.
use std::path::Path;

use anyhow::Result;

use super::{CommandSetup, home_dir};
use crate::cli::{GlobalOpts, InstallOpts};
use crate::exec::{Executor, SystemExecutor};
use crate::features::install_features;
use crate::home::{IGNORED_SECTION, clean_removed, ignore_set, place_files};
use crate::logging::{Log, Logger};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if setup fails or any step of the installation fails.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Logger) -> Result<()> {
    let version = option_env!("DOTFILES_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("dotfiles {version}"));

    let mut setup = CommandSetup::init(global, log)?;
    let target = home_dir()?;
    let result = install(&mut setup, opts, &target, &SystemExecutor, log);
    log.print_summary();
    result
}

/// Place dotfiles into `target`, then install features and clean up as
/// `opts` asks.
///
/// # Errors
///
/// Returns the first failure; later steps do not run.
pub fn install(
    setup: &mut CommandSetup,
    opts: &InstallOpts,
    target: &Path,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<()> {
    log.stage(&format!("Running on {}", setup.platform.distribution));

    let ignores = {
        let configuration = setup.registry.configuration();
        let patterns: Vec<&str> = configuration.keys(IGNORED_SECTION).into_iter().collect();
        ignore_set(&patterns)?
    };
    place_files(&setup.source(), target, opts.copy_method, &ignores, log)?;

    if opts.no_install_features {
        log.debug("skipping features");
    } else {
        install_features(&mut setup.registry, executor, log)?;
    }

    if opts.no_clean {
        log.debug("skipping removal of deprecated files");
    } else {
        clean_removed(&setup.root, target, log)?;
    }
    Ok(())
}
