//! Command line interface.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::home::CopyMethod;

/// Top-level CLI entry point for the provisioner.
#[derive(Parser, Debug)]
#[command(
    name = "dotfiles",
    about = "Installs dotfiles and features",
    version
)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override dotfiles root directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Place dotfiles, install features and remove deprecated dotfiles
    Install(InstallOpts),
    /// List features and whether they are blacklisted, present or missing
    List,
    /// Print the resolved configuration
    Config(ConfigOpts),
    /// Print shell completions
    Completions {
        /// The shell to generate completions for.
        shell: Shell,
    },
    /// Print version information
    Version,
}

impl Command {
    /// The name used for the log file of this command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::List => "list",
            Self::Config(_) => "config",
            Self::Completions { .. } => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// How dotfiles are placed in the home directory
    #[arg(long, value_enum, default_value_t = CopyMethod::Link)]
    pub copy_method: CopyMethod,

    /// Do not install features
    #[arg(long)]
    pub no_install_features: bool,

    /// Do not remove dotfiles deleted from the repository
    #[arg(long)]
    pub no_clean: bool,
}

/// Options for the `config` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ConfigOpts {
    /// Print JSON instead of INI
    #[arg(long)]
    pub json: bool,
}
