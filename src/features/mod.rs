//! Features: named installable units with dependencies and lifecycle
//! callbacks, the registry that owns them, and the install protocol.
//!
//! A run builds one [`Registry`], registers the [`builtin`] catalogue,
//! attaches the resolved configuration with [`Registry::configure`], and
//! hands the registry to [`install_features`].
pub mod builtin;
mod env;
mod feature;
pub mod graph;
pub mod lifecycle;
mod registry;

pub use env::{Env, RunOutput};
pub use feature::{
    CheckFn, CompleteFn, Dependency, Feature, FeatureBuilder, FeatureHandle, InstallFn, Placement,
    PrepareFn,
};
pub use lifecycle::{FeatureReport, install_features};
pub use registry::Registry;

/// Section whose bare keys name blacklisted features.
pub const BLACKLIST_SECTION: &str = "blacklist";
