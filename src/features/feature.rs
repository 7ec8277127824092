//! The [`Feature`] record, its builder, and the handles used to refer to it.
use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use anyhow::{Context as _, Result};

use super::env::Env;
use crate::config::Configuration;
use crate::exec::Executor;
use crate::logging::Log;

/// Installs a feature.
pub type InstallFn = Box<dyn Fn(&Env<'_>) -> Result<()>>;
/// Reports whether a feature is already present.
pub type CheckFn = Box<dyn Fn(&Env<'_>) -> Result<bool>>;
/// Runs before any feature is checked or installed; may request a new
/// position in the registry.
pub type PrepareFn = Box<dyn Fn(&Env<'_>, &mut Placement) -> Result<()>>;
/// Runs after every feature has been checked or installed.
pub type CompleteFn = Box<dyn Fn(&Env<'_>) -> Result<()>>;

/// A position change requested by a preparer.
///
/// The lifecycle engine applies the request to the live registry order as
/// soon as the preparer returns, so the rest of the prepare phase and every
/// later phase observe it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// Stay where registered.
    #[default]
    Keep,
    /// Move to the front of the registry.
    Front,
    /// Move to the back of the registry.
    Back,
}

impl Placement {
    /// Request a move to the front of the registry.
    pub const fn to_front(&mut self) {
        *self = Self::Front;
    }

    /// Request a move to the back of the registry.
    pub const fn to_back(&mut self) {
        *self = Self::Back;
    }
}

/// The name of a registered feature, returned by
/// [`Registry::register`](super::Registry::register).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureHandle(String);

impl FeatureHandle {
    pub(super) const fn new(name: String) -> Self {
        Self(name)
    }

    /// The feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dependency reference, normalised to the depended-on feature's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency(String);

impl Dependency {
    /// The depended-on feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Dependency {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Dependency {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&FeatureHandle> for Dependency {
    fn from(handle: &FeatureHandle) -> Self {
        Self(handle.0.clone())
    }
}

impl From<FeatureHandle> for Dependency {
    fn from(handle: FeatureHandle) -> Self {
        Self(handle.0)
    }
}

impl From<&Feature> for Dependency {
    fn from(feature: &Feature) -> Self {
        Self(feature.name.clone())
    }
}

/// A named, installable unit.
///
/// Features are built with [`Feature::builder`] and owned by a
/// [`Registry`](super::Registry). Presence is probed at most once and cached
/// until [`Feature::install`] runs.
pub struct Feature {
    name: String,
    description: Option<String>,
    dependencies: Vec<String>,
    installer: InstallFn,
    checker: CheckFn,
    preparer: PrepareFn,
    completer: CompleteFn,
    configuration: Arc<RwLock<Configuration>>,
    source: Arc<RwLock<PathBuf>>,
    present: Cell<Option<bool>>,
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("present", &self.present.get())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.description())
    }
}

impl Feature {
    /// Start building a feature named `name` with the given installer.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotfiles_features::features::{Feature, Registry};
    ///
    /// let mut registry = Registry::new();
    /// let curl = registry
    ///     .register(Feature::builder("curl", |env| Ok(env.run(&["sudo", "apt", "install", "curl"])?)))
    ///     .unwrap();
    /// registry
    ///     .register(
    ///         Feature::builder("rust", |_| Ok(()))
    ///             .description("The Rust programming language")
    ///             .depends_on(&curl),
    ///     )
    ///     .unwrap();
    /// assert_eq!(registry.names(), ["curl", "rust"]);
    /// ```
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        installer: impl Fn(&Env<'_>) -> Result<()> + 'static,
    ) -> FeatureBuilder {
        FeatureBuilder {
            name: name.into(),
            description: None,
            dependencies: Vec::new(),
            installer: Box::new(installer),
            checker: None,
            preparer: None,
            completer: None,
        }
    }

    /// The unique feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description, falling back to the name.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    /// Dependency names in declaration order.
    #[must_use]
    pub fn dependency_names(&self) -> &[String] {
        &self.dependencies
    }

    /// The configuration shared by every feature of the registry.
    pub fn configuration(&self) -> RwLockReadGuard<'_, Configuration> {
        self.configuration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The dotfile source directory of the current run.
    #[must_use]
    pub fn source(&self) -> PathBuf {
        self.source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The execution context handed to this feature's callbacks.
    #[must_use]
    pub fn env<'a>(&'a self, executor: &'a dyn Executor, log: &'a dyn Log) -> Env<'a> {
        Env::new(self, executor, log)
    }

    /// The cached presence, if the checker has run since the last install.
    #[must_use]
    pub fn cached_presence(&self) -> Option<bool> {
        self.present.get()
    }

    /// Whether the feature is present, running the checker on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns the checker's error.
    pub fn present(&self, executor: &dyn Executor, log: &dyn Log) -> Result<bool> {
        if let Some(present) = self.present.get() {
            return Ok(present);
        }
        let present = (self.checker)(&self.env(executor, log))
            .with_context(|| format!("checking whether {} is present", self.name))?;
        self.present.set(Some(present));
        Ok(present)
    }

    /// Run the installer, then forget the cached presence.
    ///
    /// Does not check whether the feature is already present.
    ///
    /// # Errors
    ///
    /// Returns the installer's error.
    pub fn install(&self, executor: &dyn Executor, log: &dyn Log) -> Result<()> {
        (self.installer)(&self.env(executor, log))
            .with_context(|| format!("installing {}", self.name))?;
        self.present.set(None);
        Ok(())
    }

    /// Run the preparer and return the placement it requested.
    ///
    /// # Errors
    ///
    /// Returns the preparer's error.
    pub fn prepare(&self, executor: &dyn Executor, log: &dyn Log) -> Result<Placement> {
        let mut placement = Placement::Keep;
        (self.preparer)(&self.env(executor, log), &mut placement)
            .with_context(|| format!("preparing {}", self.name))?;
        Ok(placement)
    }

    /// Run the completer.
    ///
    /// # Errors
    ///
    /// Returns the completer's error.
    pub fn complete(&self, executor: &dyn Executor, log: &dyn Log) -> Result<()> {
        (self.completer)(&self.env(executor, log))
            .with_context(|| format!("completing {}", self.name))
    }

    pub(super) fn set_checker(&mut self, checker: CheckFn) {
        self.checker = checker;
        self.present.set(None);
    }

    pub(super) fn set_preparer(&mut self, preparer: PrepareFn) {
        self.preparer = preparer;
    }

    pub(super) fn set_completer(&mut self, completer: CompleteFn) {
        self.completer = completer;
    }
}

/// Builder for [`Feature`]; finished by
/// [`Registry::register`](super::Registry::register).
pub struct FeatureBuilder {
    name: String,
    description: Option<String>,
    dependencies: Vec<String>,
    installer: InstallFn,
    checker: Option<CheckFn>,
    preparer: Option<PrepareFn>,
    completer: Option<CompleteFn>,
}

impl fmt::Debug for FeatureBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl FeatureBuilder {
    /// The name the feature will be registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the human-readable description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a dependency. Repeated declarations are ignored.
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<Dependency>) -> Self {
        let Dependency(name) = dependency.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
        self
    }

    /// Set the presence checker (default: never present).
    #[must_use]
    pub fn checker(mut self, checker: impl Fn(&Env<'_>) -> Result<bool> + 'static) -> Self {
        self.checker = Some(Box::new(checker));
        self
    }

    /// Set the preparer (default: no-op).
    #[must_use]
    pub fn preparer(
        mut self,
        preparer: impl Fn(&Env<'_>, &mut Placement) -> Result<()> + 'static,
    ) -> Self {
        self.preparer = Some(Box::new(preparer));
        self
    }

    /// Set the completer (default: no-op).
    #[must_use]
    pub fn completer(mut self, completer: impl Fn(&Env<'_>) -> Result<()> + 'static) -> Self {
        self.completer = Some(Box::new(completer));
        self
    }

    pub(super) fn build(
        self,
        configuration: Arc<RwLock<Configuration>>,
        source: Arc<RwLock<PathBuf>>,
    ) -> Feature {
        Feature {
            name: self.name,
            description: self.description,
            dependencies: self.dependencies,
            installer: self.installer,
            checker: self
                .checker
                .unwrap_or_else(|| Box::new(|_: &Env<'_>| Ok(false))),
            preparer: self
                .preparer
                .unwrap_or_else(|| Box::new(|_: &Env<'_>, _: &mut Placement| Ok(()))),
            completer: self
                .completer
                .unwrap_or_else(|| Box::new(|_: &Env<'_>| Ok(()))),
            configuration,
            source,
            present: Cell::new(None),
        }
    }
}
