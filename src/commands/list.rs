//! Command: list features and their state on this host.
use std::fmt;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::exec::{Executor, SystemExecutor};
use crate::features::Registry;
use crate::logging::Log;

/// The state of a feature on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    /// Switched off by the blacklist.
    Blacklisted,
    /// Already installed.
    Present,
    /// Would be installed.
    Missing,
}

impl fmt::Display for FeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blacklisted => "blacklisted",
            Self::Present => "present",
            Self::Missing => "missing",
        })
    }
}

/// Run the list command.
///
/// # Errors
///
/// Returns an error if setup fails or a presence check fails.
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let states = classify(&setup.registry, &SystemExecutor, log)?;

    let width = setup
        .registry
        .iter()
        .map(|f| f.description().chars().count())
        .max()
        .unwrap_or(0);
    for (feature, (_, state)) in setup.registry.iter().zip(&states) {
        println!(
            "{:<width$} ({}) {state}",
            feature.description(),
            feature.name()
        );
    }
    Ok(())
}

/// Classify every feature without installing anything.
///
/// Blacklisted features are not checked for presence.
///
/// # Errors
///
/// Returns an error for an invalid registry or a failing presence check.
pub fn classify(
    registry: &Registry,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<Vec<(String, FeatureState)>> {
    registry.validate()?;
    registry
        .iter()
        .map(|feature| -> Result<(String, FeatureState)> {
            let state = if registry.is_blacklisted(feature)? {
                FeatureState::Blacklisted
            } else if feature.present(executor, log)? {
                FeatureState::Present
            } else {
                FeatureState::Missing
            };
            Ok((feature.name().to_string(), state))
        })
        .collect()
}
