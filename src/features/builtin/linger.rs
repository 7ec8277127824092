//! Lingering systemd user sessions.
use anyhow::{Context as _, Result};

use crate::features::{Env, Feature, FeatureBuilder};

/// The `linger` feature.
#[must_use]
pub fn feature() -> FeatureBuilder {
    Feature::builder("linger", |env| {
        let user = user()?;
        env.run(&["sudo", "loginctl", "enable-linger", user.as_str()])?;
        Ok(())
    })
    .description("Lingering user sessions")
    .checker(is_lingering)
}

fn is_lingering(env: &Env<'_>) -> Result<bool> {
    let user = user()?;
    let output = env.capture(&["loginctl", "show-user", user.as_str()])?;
    Ok(output.lines().any(|line| {
        line.split_once('=')
            .is_some_and(|(key, value)| key.trim() == "Linger" && value.trim() == "yes")
    }))
}

fn user() -> Result<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .context("cannot determine the current user")
}
