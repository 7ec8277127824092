//! The features every run registers.
//!
//! Features that do not apply to a host are switched off through the
//! `[blacklist]` section, typically behind a guard:
//!
//! ```ini
//! [blacklist :: distribution != 'darwin']
//! brew
//! ```
pub mod brew;
pub mod curl;
pub mod linger;
pub mod pip;
pub mod rust;
pub mod system;

use super::Registry;
use crate::error::FeatureError;

/// Register the built-in catalogue.
///
/// # Errors
///
/// Returns [`FeatureError::Duplicate`] if a built-in name is already taken.
pub fn register_all(registry: &mut Registry) -> Result<(), FeatureError> {
    let curl = registry.register(curl::feature())?;
    registry.register(system::package("git", Some("git")))?;
    registry.register(system::package("vim", None).description("Vi IMproved"))?;
    registry.register(system::package("rg", Some("ripgrep")))?;
    registry.register(system::package("bat", Some("bat")))?;
    registry.register(pip::feature())?;
    registry.register(brew::feature(&curl))?;
    registry.register(rust::feature(&curl))?;
    registry.register(linger::feature())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn catalogue(registry: &Registry) -> String {
        registry
            .iter()
            .map(|f| {
                let deps = f.dependency_names();
                if deps.is_empty() {
                    f.to_string()
                } else {
                    format!("{f} [{}]", deps.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn catalogue_is_registered_in_order() {
        let mut registry = Registry::new();
        register_all(&mut registry).unwrap();
        insta::assert_snapshot!(catalogue(&registry), @r"
        curl - curl
        git - git
        vim - Vi IMproved
        ripgrep - ripgrep
        bat - bat
        pip - Python package installer
        brew - The Missing Package Manager for macOS [curl]
        rust - The Rust programming language [curl]
        linger - Lingering user sessions
        ");
    }

    #[test]
    fn catalogue_validates() {
        let mut registry = Registry::new();
        register_all(&mut registry).unwrap();
        registry.validate().unwrap();
    }

    #[test]
    fn registering_twice_is_rejected() {
        let mut registry = Registry::new();
        register_all(&mut registry).unwrap();
        let err = register_all(&mut registry).unwrap_err();
        assert_eq!(err, FeatureError::Duplicate("curl".to_string()));
        assert_eq!(registry.len(), 9);
    }
}
