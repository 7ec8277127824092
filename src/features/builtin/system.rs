//! Packages installed with the host package manager.
//!
//! The commands come from the `[commands]` section, where `${name}` stands
//! for the package name after mapping through `[package_names]`:
//!
//! ```ini
//! [commands :: distribution == 'arch']
//! package_install = sudo pacman -S --noconfirm ${name}
//! package_check = pacman -Q ${name}
//!
//! [package_names :: distribution == 'debian']
//! python3-pip = python3-pip
//! ```
use anyhow::{Context as _, Result};

use crate::features::{Env, Feature, FeatureBuilder};

/// Section holding the package manager command templates.
pub const COMMANDS_SECTION: &str = "commands";

/// Section mapping generic package names to distribution package names.
pub const PACKAGE_NAMES_SECTION: &str = "package_names";

/// A feature installing `package` (or `binary` when no package is given).
///
/// The feature is named after the package. With an explicit package name,
/// presence is checked with `package_check`; otherwise by finding `binary`
/// on `PATH`.
#[must_use]
pub fn package(binary: &str, package: Option<&str>) -> FeatureBuilder {
    let name = package.unwrap_or(binary).to_string();
    let installed = name.clone();
    let binary = binary.to_string();
    let checked = package.map(String::from);

    Feature::builder(name.clone(), move |env| install_package(env, &installed))
        .description(name)
        .checker(move |env| match &checked {
            Some(package) => check_package(env, package),
            None => Ok(present(&binary)),
        })
}

/// Install the generic package `name` with the configured `package_install`.
///
/// # Errors
///
/// Returns an error if no install command is configured or the command
/// fails.
pub fn install_package(env: &Env<'_>, name: &str) -> Result<()> {
    let (args, package) = command(env, "package_install", name)?;
    env.run_with(&args, &[("name", package.as_str())])?;
    Ok(())
}

fn check_package(env: &Env<'_>, name: &str) -> Result<bool> {
    let (args, package) = command(env, "package_check", name)?;
    Ok(env.probe_with(&args, &[("name", package.as_str())])?)
}

/// Split the configured command `key` and map `name` to its package name.
fn command(env: &Env<'_>, key: &str, name: &str) -> Result<(Vec<String>, String)> {
    let configuration = env.configuration();
    let template = configuration
        .value(COMMANDS_SECTION, key)
        .with_context(|| format!("no [{COMMANDS_SECTION}] {key} configured for {}", env.name()))?;
    let args = shlex::split(template)
        .with_context(|| format!("cannot split [{COMMANDS_SECTION}] {key}: {template}"))?;
    let package = configuration
        .value(PACKAGE_NAMES_SECTION, name)
        .unwrap_or(name)
        .to_string();
    Ok((args, package))
}

/// Whether `binary` is found on `PATH`.
#[must_use]
pub fn present(binary: &str) -> bool {
    which::which(binary).is_ok()
}
