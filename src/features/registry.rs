//! The ordered collection of registered features.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use anyhow::Result;

use super::BLACKLIST_SECTION;
use super::env::Env;
use super::feature::{Feature, FeatureBuilder, FeatureHandle, Placement};
use super::graph;
use crate::config::Configuration;
use crate::error::FeatureError;

/// Registered features in registration order.
///
/// Every feature shares the registry's configuration and source directory,
/// so [`Registry::configure`] updates all of them at once.
pub struct Registry {
    features: Vec<Feature>,
    configuration: Arc<RwLock<Configuration>>,
    source: Arc<RwLock<PathBuf>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("features", &self.names())
            .field("source", &self.source())
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry with an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            configuration: Arc::new(RwLock::new(Configuration::default())),
            source: Arc::new(RwLock::new(PathBuf::new())),
        }
    }

    /// Add a feature at the end of the registry.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Duplicate`] if the name is taken; the
    /// registry is left unchanged.
    pub fn register(&mut self, builder: FeatureBuilder) -> Result<FeatureHandle, FeatureError> {
        if self.get(builder.name()).is_some() {
            return Err(FeatureError::Duplicate(builder.name().to_string()));
        }
        let feature = builder.build(Arc::clone(&self.configuration), Arc::clone(&self.source));
        let handle = FeatureHandle::new(feature.name().to_string());
        self.features.push(feature);
        Ok(handle)
    }

    /// Replace the configuration and source directory seen by every feature.
    ///
    /// The shared configuration is updated in place, so guards obtained
    /// through [`Feature::configuration`] afterwards observe the new values.
    pub fn configure(&self, configuration: Configuration, source: impl Into<PathBuf>) {
        *self
            .configuration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = configuration;
        *self.source.write().unwrap_or_else(PoisonError::into_inner) = source.into();
    }

    /// The shared configuration.
    pub fn configuration(&self) -> RwLockReadGuard<'_, Configuration> {
        self.configuration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The dotfile source directory.
    #[must_use]
    pub fn source(&self) -> PathBuf {
        self.source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up a feature by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name() == name)
    }

    /// The feature at `index` in the current order.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    /// The position of `name` in the current order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name() == name)
    }

    /// Feature names in the current order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(Feature::name).collect()
    }

    /// Iterate over features in the current order.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Number of registered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no features are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Resolve `feature`'s dependencies in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::UnmetDependencies`] naming the feature, the
    /// names that did not resolve, and every registered name.
    pub fn dependencies(&self, feature: &Feature) -> Result<Vec<&Feature>, FeatureError> {
        let mut resolved = Vec::with_capacity(feature.dependency_names().len());
        let mut missing = Vec::new();
        for name in feature.dependency_names() {
            match self.get(name) {
                Some(dependency) => resolved.push(dependency),
                None => missing.push(name.clone()),
            }
        }
        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(FeatureError::UnmetDependencies {
                feature: feature.to_string(),
                missing,
                available: self.names().into_iter().map(String::from).collect(),
            })
        }
    }

    /// Whether `feature` is blacklisted: named in the `[blacklist]` section
    /// or depending, directly or transitively, on a blacklisted feature.
    ///
    /// # Errors
    ///
    /// Returns an error for unmet dependencies or a dependency cycle.
    pub fn is_blacklisted(&self, feature: &Feature) -> Result<bool, FeatureError> {
        let blacklist: BTreeSet<String> = self
            .configuration()
            .keys(BLACKLIST_SECTION)
            .into_iter()
            .map(String::from)
            .collect();
        let mut walk = BlacklistWalk {
            blacklist: &blacklist,
            path: Vec::new(),
            known: BTreeMap::new(),
        };
        self.blacklisted_along(feature, &mut walk)
    }

    fn blacklisted_along<'a>(
        &'a self,
        feature: &'a Feature,
        walk: &mut BlacklistWalk<'_, 'a>,
    ) -> Result<bool, FeatureError> {
        if let Some(&known) = walk.known.get(feature.name()) {
            return Ok(known);
        }
        if walk.path.contains(&feature.name()) {
            let mut cycle = walk.path.clone();
            cycle.push(feature.name());
            return Err(FeatureError::DependencyCycle(cycle.join(" → ")));
        }

        let mut blacklisted = walk.blacklist.contains(feature.name());
        if !blacklisted {
            walk.path.push(feature.name());
            for dependency in self.dependencies(feature)? {
                if self.blacklisted_along(dependency, walk)? {
                    blacklisted = true;
                    break;
                }
            }
            walk.path.pop();
        }
        walk.known.insert(feature.name(), blacklisted);
        Ok(blacklisted)
    }

    /// Check that every dependency resolves and that there are no cycles.
    ///
    /// # Errors
    ///
    /// Returns the first unmet dependency error in registry order, otherwise
    /// [`FeatureError::DependencyCycle`] if the graph has a cycle.
    pub fn validate(&self) -> Result<(), FeatureError> {
        for feature in &self.features {
            self.dependencies(feature)?;
        }
        let nodes: Vec<(&str, &[String])> = self
            .features
            .iter()
            .map(|f| (f.name(), f.dependency_names()))
            .collect();
        match graph::find_cycle(&nodes) {
            Some(cycle) => Err(FeatureError::DependencyCycle(cycle.join(" → "))),
            None => Ok(()),
        }
    }

    /// Move `name` to the front of the registry.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Unknown`] if no such feature is registered.
    pub fn move_to_front(&mut self, name: &str) -> Result<(), FeatureError> {
        let index = self.index_of(name)?;
        if let Some(slice) = self.features.get_mut(..=index) {
            slice.rotate_right(1);
        }
        Ok(())
    }

    /// Move `name` to the back of the registry.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Unknown`] if no such feature is registered.
    pub fn move_to_back(&mut self, name: &str) -> Result<(), FeatureError> {
        let index = self.index_of(name)?;
        if let Some(slice) = self.features.get_mut(index..) {
            slice.rotate_left(1);
        }
        Ok(())
    }

    /// Apply a preparer's placement request to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Unknown`] if no such feature is registered.
    pub fn apply(&mut self, name: &str, placement: Placement) -> Result<(), FeatureError> {
        match placement {
            Placement::Keep => self.index_of(name).map(|_| ()),
            Placement::Front => self.move_to_front(name),
            Placement::Back => self.move_to_back(name),
        }
    }

    /// Replace the presence checker of a registered feature.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Unknown`] if the handle does not belong to
    /// this registry.
    pub fn set_checker(
        &mut self,
        handle: &FeatureHandle,
        checker: impl Fn(&Env<'_>) -> Result<bool> + 'static,
    ) -> Result<(), FeatureError> {
        self.get_mut(handle.name())?.set_checker(Box::new(checker));
        Ok(())
    }

    /// Replace the preparer of a registered feature.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Unknown`] if the handle does not belong to
    /// this registry.
    pub fn set_preparer(
        &mut self,
        handle: &FeatureHandle,
        preparer: impl Fn(&Env<'_>, &mut Placement) -> Result<()> + 'static,
    ) -> Result<(), FeatureError> {
        self.get_mut(handle.name())?.set_preparer(Box::new(preparer));
        Ok(())
    }

    /// Replace the completer of a registered feature.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Unknown`] if the handle does not belong to
    /// this registry.
    pub fn set_completer(
        &mut self,
        handle: &FeatureHandle,
        completer: impl Fn(&Env<'_>) -> Result<()> + 'static,
    ) -> Result<(), FeatureError> {
        self.get_mut(handle.name())?.set_completer(Box::new(completer));
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize, FeatureError> {
        self.position(name)
            .ok_or_else(|| FeatureError::Unknown(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Feature, FeatureError> {
        self.features
            .iter_mut()
            .find(|f| f.name() == name)
            .ok_or_else(|| FeatureError::Unknown(name.to_string()))
    }
}

/// State of one blacklist query: the names on the current dependency path
/// and the answers already settled.
struct BlacklistWalk<'b, 'a> {
    blacklist: &'b BTreeSet<String>,
    path: Vec<&'a str>,
    known: BTreeMap<&'a str, bool>,
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
