//! Configuration resolution.
//!
//! A configuration is assembled from an ordered list of INI sources. A
//! section header may carry a guard after [`SEPARATOR`]:
//!
//! ```ini
//! [commands]
//! package_install = sudo apt-get install -y ${name}
//!
//! [commands :: distribution == 'arch']
//! package_install = sudo pacman -S --noconfirm ${name}
//! ```
//!
//! Within one source, every section whose guard holds is merged into the
//! section named before the separator, in file order. Each source's result is
//! then merged into the cumulative configuration, so later sources override
//! earlier ones key by key. The fact environment used for guards is exposed
//! as the reserved [`ENV_SECTION`].
pub mod guard;
pub mod ini;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::ser::SerializeMap as _;
use serde::{Serialize, Serializer};

use crate::error::ConfigError;
use crate::platform::Platform;
use guard::{Guard, Value};
use ini::RawSection;

/// Separates a section name from its guard expression.
pub const SEPARATOR: &str = "::";

/// The reserved section holding the fact environment.
pub const ENV_SECTION: &str = "env";

/// Entries of a resolved section; bare keys carry `None`.
pub type Section = BTreeMap<String, Option<String>>;

/// The named values guards are evaluated against.
///
/// # Examples
///
/// ```
/// use dotfiles_features::config::Facts;
///
/// let mut facts = Facts::new();
/// facts.insert("include", true);
/// assert!(facts.get("include").is_some_and(|v| v.truthy()));
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Facts(BTreeMap<String, Value>);

impl Facts {
    /// Create an empty fact environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard facts for a host: `distribution` and `version`.
    #[must_use]
    pub fn for_platform(platform: &Platform) -> Self {
        let mut facts = Self::new();
        facts.insert("distribution", platform.distribution.clone());
        facts.insert("version", platform.version.clone());
        facts
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a fact.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Iterate over facts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The resolved configuration: section name to entries, plus the facts.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    sections: BTreeMap<String, Section>,
    env: Facts,
}

impl Configuration {
    /// An empty configuration exposing `facts` as its environment.
    #[must_use]
    pub fn new(facts: Facts) -> Self {
        Self {
            sections: BTreeMap::new(),
            env: facts,
        }
    }

    /// Resolve `sources` in order against `facts`.
    ///
    /// Missing sources contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or parsed, defines the
    /// reserved [`ENV_SECTION`], or carries a guard that fails to compile or
    /// evaluate.
    pub fn load<P: AsRef<Path>>(sources: &[P], facts: Facts) -> Result<Self, ConfigError> {
        let mut configuration = Self::new(facts);
        for source in sources {
            configuration.merge_file(source.as_ref())?;
        }
        Ok(configuration)
    }

    /// Resolve one more source file on top of this configuration.
    ///
    /// # Errors
    ///
    /// See [`Configuration::load`].
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = ini::parse_file(path)?;
        self.merge_sections(path, &raw)
    }

    /// Resolve source text on top of this configuration. `path` names the
    /// source in error messages.
    ///
    /// # Errors
    ///
    /// See [`Configuration::load`].
    pub fn merge_str(&mut self, content: &str, path: &Path) -> Result<(), ConfigError> {
        let raw = ini::parse_str(content, path)?;
        self.merge_sections(path, &raw)
    }

    fn merge_sections(&mut self, path: &Path, raw: &[RawSection]) -> Result<(), ConfigError> {
        let resolved = resolve_source(path, raw, &self.env)?;
        for (name, entries) in resolved {
            self.sections.entry(name).or_default().extend(entries);
        }
        Ok(())
    }

    /// Entries of `name`, if any source contributed the section.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// The value of `key` in `section`.
    ///
    /// Returns `None` both for missing keys and for bare keys.
    #[must_use]
    pub fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key)?.as_deref()
    }

    /// Whether `section` contains `key`, with or without a value.
    #[must_use]
    pub fn contains_key(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// The keys of `section` as a set; empty when the section is absent.
    #[must_use]
    pub fn keys(&self, section: &str) -> BTreeSet<&str> {
        self.sections
            .get(section)
            .map(|entries| entries.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Names of all resolved sections, excluding [`ENV_SECTION`].
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// The fact environment.
    #[must_use]
    pub const fn env(&self) -> &Facts {
        &self.env
    }

    /// Look up a single fact.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len() + 1))?;
        map.serialize_entry(ENV_SECTION, &self.env)?;
        for (name, entries) in &self.sections {
            map.serialize_entry(name, entries)?;
        }
        map.end()
    }
}

/// Split a header into its section name and optional guard text.
fn split_header(header: &str) -> (&str, Option<&str>) {
    match header.split_once(SEPARATOR) {
        Some((name, expression)) => (name.trim(), Some(expression.trim())),
        None => (header.trim(), None),
    }
}

/// Merge the sections of one source whose guards hold, in file order.
fn resolve_source(
    path: &Path,
    raw: &[RawSection],
    facts: &Facts,
) -> Result<BTreeMap<String, Section>, ConfigError> {
    let mut result: BTreeMap<String, Section> = BTreeMap::new();

    for section in raw {
        let (name, expression) = split_header(&section.header);
        if name == ENV_SECTION {
            return Err(ConfigError::ReservedSection {
                source_path: path.to_path_buf(),
                section: name.to_string(),
            });
        }

        let guard_error = |message: String| ConfigError::Guard {
            source_path: path.to_path_buf(),
            section: name.to_string(),
            expression: expression.unwrap_or_default().to_string(),
            message,
        };
        let guard = match expression {
            Some(expression) => Guard::compile(expression).map_err(|e| guard_error(e.to_string()))?,
            None => Guard::always(),
        };

        if guard.evaluate(facts).map_err(|e| guard_error(e.to_string()))? {
            result
                .entry(name.to_string())
                .or_default()
                .extend(section.entries.iter().cloned());
        }
    }

    Ok(result)
}
