//! Subcommand orchestration.
pub mod config;
pub mod install;
pub mod list;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{Configuration, Facts};
use crate::error::DotfilesError;
use crate::features::{Registry, builtin};
use crate::home::SOURCE_DIR;
use crate::logging::Log;
use crate::platform::Platform;

/// The primary configuration source below the root.
pub const CONFIGURATION_FILE: &str = "configuration.conf";

/// The host-local configuration source below the root, read last.
pub const LOCAL_FILE: &str = "local.conf";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates root resolution, platform detection, configuration loading
/// and feature registration so that each command does not have to repeat
/// the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// The dotfiles repository root.
    pub root: PathBuf,
    /// The detected host.
    pub platform: Platform,
    /// The built-in features, configured for this host.
    pub registry: Registry,
}

impl CommandSetup {
    /// Resolve the root, detect the platform and load everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be determined, the platform is not
    /// supported, or the configuration fails to load.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let root = resolve_root(global)?;
        let platform = Platform::detect()?;
        Ok(Self::load(root, platform, log)?)
    }

    /// Load the configuration of `root` for `platform` and register the
    /// built-in features.
    ///
    /// # Errors
    ///
    /// Returns [`DotfilesError::Config`] if a configuration source fails to
    /// load and [`DotfilesError::Feature`] if the built-in catalogue cannot
    /// be registered.
    pub fn load(root: PathBuf, platform: Platform, log: &dyn Log) -> Result<Self, DotfilesError> {
        log.stage("Loading configuration");
        log.info(&format!(
            "platform: {} {}",
            platform.distribution, platform.version
        ));

        let sources = [root.join(CONFIGURATION_FILE), root.join(LOCAL_FILE)];
        for source in &sources {
            log.debug(&format!(
                "{} {}",
                if source.exists() { "reading" } else { "skipping missing" },
                source.display()
            ));
        }
        let configuration = Configuration::load(&sources, Facts::for_platform(&platform))?;
        log.debug(&format!(
            "{} sections",
            configuration.section_names().count()
        ));

        let mut registry = Registry::new();
        builtin::register_all(&mut registry)?;
        registry.configure(configuration, root.join(SOURCE_DIR));
        log.debug(&format!("{} features registered", registry.len()));

        Ok(Self {
            root,
            platform,
            registry,
        })
    }

    /// The dotfile source directory.
    #[must_use]
    pub fn source(&self) -> PathBuf {
        self.root.join(SOURCE_DIR)
    }
}

/// Whether `dir` looks like a dotfiles repository root.
fn is_root(dir: &Path) -> bool {
    dir.join(CONFIGURATION_FILE).exists() || dir.join(SOURCE_DIR).is_dir()
}

/// Resolve the dotfiles root directory from CLI arguments or auto-detection.
///
/// # Errors
///
/// Returns an error if the root directory cannot be determined.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    // links into home/ are made from the root, so it must be absolute
    if let Some(ref root) = global.root {
        return dunce::canonicalize(root).with_context(|| format!("resolving {}", root.display()));
    }

    if let Ok(root) = std::env::var("DOTFILES_ROOT") {
        return dunce::canonicalize(&root).with_context(|| format!("resolving {root}"));
    }

    // target/release/ or bin/ below the repository
    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        for candidate in [parent.join("../.."), parent.join("..")] {
            if is_root(&candidate) {
                return dunce::canonicalize(&candidate)
                    .with_context(|| format!("resolving {}", candidate.display()));
            }
        }
    }

    let cwd = std::env::current_dir()?;
    if is_root(&cwd) {
        return Ok(cwd);
    }

    anyhow::bail!("cannot determine dotfiles root. Use --root or set DOTFILES_ROOT env var");
}

/// The user's home directory.
///
/// # Errors
///
/// Returns an error if `HOME` (or `USERPROFILE` on Windows) is not set.
pub fn home_dir() -> Result<PathBuf> {
    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .map_err(|_| anyhow::anyhow!("neither USERPROFILE nor HOME environment variable is set"))?
    } else {
        std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?
    };
    Ok(PathBuf::from(home))
}

/// Print the version.
pub fn version() {
    let version = option_env!("DOTFILES_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    println!("dotfiles {version}");
}
