//! Host identity: distribution and version facts.
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::PlatformError;

/// A distribution identity.
///
/// A distribution has a display name and a path of IDs such as
/// `debian/ubuntu`. Two distributions are equal when any part of their
/// paths matches, so `ubuntu` compares equal to both `debian` and `ubuntu`.
///
/// # Examples
///
/// ```
/// use dotfiles_features::platform::Distribution;
///
/// let ubuntu = Distribution::new("Ubuntu 24.04", ["debian", "ubuntu"]);
/// assert!(ubuntu.matches_str("debian"));
/// assert!(ubuntu.matches_str("fedora/ubuntu"));
/// assert!(!ubuntu.matches_str("fedora"));
/// assert_eq!(ubuntu.identity(), "debian/ubuntu");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    name: String,
    parts: Vec<String>,
}

impl Distribution {
    /// Create a distribution from a display name and ID path parts.
    pub fn new<I, S>(name: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ID path parts.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The ID path joined with `/`.
    #[must_use]
    pub fn identity(&self) -> String {
        self.parts.join("/")
    }

    /// Whether any part of this path appears in `other`'s path.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.parts.iter().any(|p| other.parts.contains(p))
    }

    /// Whether any part of this path appears in the `/`-separated `path`.
    #[must_use]
    pub fn matches_str(&self, path: &str) -> bool {
        path.split('/').any(|p| self.parts.iter().any(|own| own == p))
    }

    /// Whether `part` is one of this distribution's IDs.
    #[must_use]
    pub fn contains(&self, part: &str) -> bool {
        self.parts.iter().any(|p| p == part)
    }
}

impl PartialEq for Distribution {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.identity())
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.identity())
    }
}

/// A version: a sequence of numbers compared component by component.
///
/// # Examples
///
/// ```
/// use dotfiles_features::platform::Version;
///
/// let a: Version = "10.1".parse().unwrap();
/// let b: Version = "10".parse().unwrap();
/// assert!(b < a);
/// assert_eq!(a.to_string(), "10.1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version(Vec<u64>);

impl Version {
    /// The numeric components.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for Version {
    fn from(components: Vec<u64>) -> Self {
        Self(components)
    }
}

impl FromStr for Version {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .split('.')
            .map(|p| p.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| PlatformError::InvalidVersion(s.to_string()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Platform information for the current host.
#[derive(Debug, Clone)]
pub struct Platform {
    /// The detected distribution.
    pub distribution: Distribution,
    /// The detected distribution version.
    pub version: Version,
}

impl Platform {
    /// Create a platform with explicit values.
    #[must_use]
    pub const fn new(distribution: Distribution, version: Version) -> Self {
        Self {
            distribution,
            version,
        }
    }

    /// Detect the current platform.
    ///
    /// Reads `/etc/os-release` first, then falls back on macOS (`sw_vers`)
    /// and Termux (`termux-info` on `PATH`).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::DetectionFailed`] if no method identifies
    /// the host.
    pub fn detect() -> Result<Self, PlatformError> {
        if let Ok(content) = std::fs::read_to_string("/etc/os-release")
            && let Some(platform) = Self::from_os_release(&content)
        {
            return Ok(platform);
        }
        if let Some(platform) = Self::detect_macos() {
            return Ok(platform);
        }
        if which::which("termux-info").is_ok() {
            return Ok(Self::new(
                Distribution::new("Termux", ["termux"]),
                Version(vec![1, 0]),
            ));
        }
        Err(PlatformError::DetectionFailed(
            "no /etc/os-release, sw_vers or termux-info".to_string(),
        ))
    }

    /// Parse the contents of an `os-release` file.
    ///
    /// The ID path is `ID_LIKE` (whitespace separated) followed by `ID`.
    /// A missing or unparseable `VERSION_ID` yields an empty version.
    /// Returns `None` when `ID` is absent.
    #[must_use]
    pub fn from_os_release(content: &str) -> Option<Self> {
        let values = parse_key_values(content, '=');
        let id = values.iter().find(|(k, _)| k == "ID").map(|(_, v)| v)?;
        let lookup = |key: &str| values.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

        let mut parts: Vec<String> = lookup("ID_LIKE")
            .map(|like| like.split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        parts.push(id.clone());

        let name = lookup("PRETTY_NAME").unwrap_or(id.as_str());
        let version = lookup("VERSION_ID")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Some(Self::new(Distribution::new(name, parts), version))
    }

    fn detect_macos() -> Option<Self> {
        if !Path::new("/usr/bin/sw_vers").exists() {
            return None;
        }
        let output = crate::exec::run_unchecked("sw_vers", &[]).ok()?;
        if !output.success {
            return None;
        }
        let values = parse_key_values(&output.stdout, ':');
        let lookup = |key: &str| values.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        Some(Self::new(
            Distribution::new(lookup("ProductName")?, ["macos"]),
            lookup("ProductVersion")?.parse().ok()?,
        ))
    }
}

/// Parse `KEY<sep>value` lines, stripping optional surrounding double quotes.
fn parse_key_values(content: &str, separator: char) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(separator)?;
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 24.04.1 LTS"
NAME="Ubuntu"
VERSION_ID="24.04"
ID=ubuntu
ID_LIKE=debian
"#;

    #[test]
    fn distribution_matches_any_part() {
        let d = Distribution::new("", ["debian", "ubuntu"]);
        assert!(d.matches_str("ubuntu"));
        assert!(d.matches_str("debian"));
        assert!(!d.matches_str("fedora"));
        assert_eq!(d, Distribution::new("x", ["ubuntu"]));
        assert_ne!(d, Distribution::new("x", ["arch"]));
    }

    #[test]
    fn distribution_display_falls_back_to_identity() {
        assert_eq!(Distribution::new("", ["a", "b"]).to_string(), "a/b");
        assert_eq!(Distribution::new("Arch", ["arch"]).to_string(), "Arch");
    }

    #[test]
    fn version_ordering_is_lexicographic() {
        let v = |s: &str| s.parse::<Version>().unwrap();
        assert!(v("10") < v("10.1"));
        assert!(v("9.9") < v("10"));
        assert!(v("10.1") > v("10.0.5"));
        assert_eq!(v("24.04"), v("24.4"));
    }

    #[test]
    fn version_parse_rejects_garbage() {
        assert!("rolling".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn os_release_with_id_like() {
        let p = Platform::from_os_release(UBUNTU).expect("should parse");
        assert_eq!(p.distribution.name(), "Ubuntu 24.04.1 LTS");
        assert_eq!(p.distribution.identity(), "debian/ubuntu");
        assert_eq!(p.version.to_string(), "24.4");
    }

    #[test]
    fn os_release_id_like_is_split_on_whitespace() {
        let content = "ID=rocky\nID_LIKE=\"rhel centos fedora\"\nVERSION_ID=\"9.3\"\n";
        let p = Platform::from_os_release(content).expect("should parse");
        assert_eq!(p.distribution.parts(), ["rhel", "centos", "fedora", "rocky"]);
    }

    #[test]
    fn os_release_without_version_has_empty_version() {
        let p = Platform::from_os_release("ID=arch\nPRETTY_NAME=\"Arch Linux\"\n")
            .expect("should parse");
        assert!(p.version.components().is_empty());
        assert!(p.distribution.contains("arch"));
    }

    #[test]
    fn os_release_without_id_is_rejected() {
        assert!(Platform::from_os_release("NAME=nothing\n").is_none());
    }
}
