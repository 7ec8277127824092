//! Personal environment provisioner.
//!
//! Places the dotfiles of a repository into the home directory and installs
//! declaratively registered features, all driven by INI configuration whose
//! sections are selected by guard expressions over the host's facts.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: resolve INI sources and guard expressions into a
//!   [`Configuration`](config::Configuration)
//! - **[`features`]**: the feature [`Registry`](features::Registry), the
//!   built-in catalogue, and the prepare/install/complete protocol
//! - **[`home`]**: dotfile placement and removal of deprecated dotfiles
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `list`, `config`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod features;
pub mod home;
pub mod logging;
pub mod platform;
