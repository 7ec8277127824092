//! The three-phase install protocol: prepare, install, complete.
//!
//! 1. **Prepare** walks the live registry order. A preparer may move its
//!    feature to the front or back; the move is applied immediately and the
//!    walk continues from the next unprepared feature.
//! 2. **Install** classifies every feature in the post-prepare order as
//!    disabled (blacklisted), ignored (already present) or installed.
//! 3. **Complete** runs completers in the reverse of the post-prepare order.
//!
//! Blacklisted features take part in none of the phases beyond being
//! reported as disabled.
use std::collections::HashSet;

use anyhow::Result;

use super::feature::Placement;
use super::registry::Registry;
use crate::exec::Executor;
use crate::logging::{Log, Status};

/// The outcome for one feature of an install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureReport {
    /// Feature name.
    pub name: String,
    /// How the feature was handled.
    pub status: Status,
}

/// Run the prepare, install and complete phases over `registry`.
///
/// Returns one report per feature in install order.
///
/// # Errors
///
/// Returns an error if the registry has unmet dependencies or a dependency
/// cycle, or if any callback fails. Nothing runs after the first failure.
pub fn install_features(
    registry: &mut Registry,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<Vec<FeatureReport>> {
    registry.validate()?;

    log.stage("Installing features");
    prepare_all(registry, executor, log)?;
    let reports = install_all(registry, executor, log)?;
    complete_all(registry, executor, log)?;
    Ok(reports)
}

fn prepare_all(registry: &mut Registry, executor: &dyn Executor, log: &dyn Log) -> Result<()> {
    let mut prepared: HashSet<String> = HashSet::with_capacity(registry.len());
    let mut index = 0;

    while let Some(feature) = registry.at(index) {
        let name = feature.name().to_string();
        if !prepared.insert(name.clone()) || registry.is_blacklisted(feature)? {
            index += 1;
            continue;
        }

        log.debug(&format!("preparing {name}"));
        let placement = feature.prepare(executor, log)?;
        registry.apply(&name, placement)?;

        // A feature moved to the back leaves its successor at `index`.
        if placement != Placement::Back {
            index += 1;
        }
    }
    Ok(())
}

fn install_all(
    registry: &Registry,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Result<Vec<FeatureReport>> {
    let width = registry
        .iter()
        .map(|f| f.description().chars().count())
        .max()
        .unwrap_or(0);

    let mut reports = Vec::with_capacity(registry.len());
    for feature in registry {
        let message = format!("{:<width$} ({})", feature.description(), feature.name());
        let status = if registry.is_blacklisted(feature)? {
            log.debug(&format!("disabled: {message}"));
            Status::Disabled
        } else if feature.present(executor, log)? {
            log.debug(&format!("ignoring: {message}"));
            Status::Ignored
        } else {
            log.info(&format!("installing: {message}"));
            feature.install(executor, log)?;
            Status::Installed
        };

        log.record(feature.name(), status, None);
        reports.push(FeatureReport {
            name: feature.name().to_string(),
            status,
        });
    }
    Ok(reports)
}

fn complete_all(registry: &Registry, executor: &dyn Executor, log: &dyn Log) -> Result<()> {
    for feature in registry.iter().rev() {
        if registry.is_blacklisted(feature)? {
            continue;
        }
        log.debug(&format!("completing {}", feature.name()));
        feature.complete(executor, log)?;
    }
    Ok(())
}
