//! Command: print the resolved configuration.
use std::fmt::Write as _;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{ConfigOpts, GlobalOpts};
use crate::config::{Configuration, ENV_SECTION};
use crate::logging::Log;

/// Run the config command.
///
/// # Errors
///
/// Returns an error if setup fails or the configuration cannot be
/// serialized.
pub fn run(global: &GlobalOpts, opts: &ConfigOpts, log: &dyn Log) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let configuration = setup.registry.configuration();
    let rendered = if opts.json {
        serde_json::to_string_pretty(&*configuration)?
    } else {
        render_ini(&configuration)
    };
    println!("{rendered}");
    Ok(())
}

/// Render the facts and every resolved section in INI syntax.
#[must_use]
pub fn render_ini(configuration: &Configuration) -> String {
    let mut out = format!("[{ENV_SECTION}]\n");
    for (name, value) in configuration.env().iter() {
        // write! to a String is infallible.
        writeln!(out, "{name} = {value}").unwrap_or(());
    }
    for name in configuration.section_names() {
        writeln!(out, "\n[{name}]").unwrap_or(());
        for (key, value) in configuration.section(name).into_iter().flatten() {
            match value {
                Some(value) => writeln!(out, "{key} = {value}").unwrap_or(()),
                None => writeln!(out, "{key}").unwrap_or(()),
            }
        }
    }
    out
}
