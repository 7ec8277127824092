//! The Python package installer.
use super::system;
use crate::features::{Feature, FeatureBuilder};

/// The `pip` feature.
#[must_use]
pub fn feature() -> FeatureBuilder {
    Feature::builder("pip", |env| system::install_package(env, "python3-pip"))
        .description("Python package installer")
        .checker(|env| Ok(env.probe(&["python3", "-m", "pip", "--version"])?))
}
