#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for configuration resolution.
//!
//! These tests resolve INI sources from disk against platform facts, the way
//! every command loads `configuration.conf` and `local.conf`.

mod common;

use std::collections::BTreeSet;

use dotfiles_features::commands::{CONFIGURATION_FILE, CommandSetup, LOCAL_FILE};
use dotfiles_features::config::{Configuration, Facts};
use dotfiles_features::error::ConfigError;

use common::{MemoryLog, TestRepo, debian, resolve, ubuntu};

const PACKAGES: &str = "\
[commands]
package_install = generic-install ${name}

[commands :: distribution == 'debian']
package_install = sudo apt-get install -y ${name}
package_check = dpkg -s ${name}

[commands :: distribution == 'ubuntu' and version >= v('22.04')]
package_install = sudo apt install -y ${name}

[package_names :: distribution == 'debian']
bat = bat-cat
";

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

#[test]
fn guards_follow_the_distribution_family() {
    let debian = resolve(PACKAGES, &debian());
    assert_eq!(
        debian.value("commands", "package_install"),
        Some("sudo apt-get install -y ${name}")
    );

    // Ubuntu is Debian-like, so both guarded sections apply in order.
    let ubuntu = resolve(PACKAGES, &ubuntu());
    assert_eq!(
        ubuntu.value("commands", "package_install"),
        Some("sudo apt install -y ${name}")
    );
    assert_eq!(ubuntu.value("commands", "package_check"), Some("dpkg -s ${name}"));
    assert_eq!(ubuntu.value("package_names", "bat"), Some("bat-cat"));
}

#[test]
fn unmatched_guard_leaves_section_out() {
    let mut facts = Facts::new();
    facts.insert("distribution", "arch");
    facts.insert("version", "0");
    let mut configuration = Configuration::new(facts);
    configuration
        .merge_str(
            "[package_names :: distribution == 'debian']\nbat = bat-cat\n",
            std::path::Path::new("configuration.conf"),
        )
        .unwrap();
    assert!(configuration.section("package_names").is_none());
    assert_eq!(configuration.section_names().count(), 0);
}

// ---------------------------------------------------------------------------
// Sources on disk
// ---------------------------------------------------------------------------

#[test]
fn local_source_overrides_primary_source() {
    let repo = TestRepo::new()
        .with_file(CONFIGURATION_FILE, PACKAGES)
        .with_file(
            LOCAL_FILE,
            "[commands]\npackage_install = my-install ${name}\n[blacklist]\nbrew\n",
        );
    let root = repo.root();
    let configuration = Configuration::load(
        &[root.join(CONFIGURATION_FILE), root.join(LOCAL_FILE)],
        Facts::for_platform(&debian()),
    )
    .unwrap();

    assert_eq!(
        configuration.value("commands", "package_install"),
        Some("my-install ${name}")
    );
    assert_eq!(configuration.value("commands", "package_check"), Some("dpkg -s ${name}"));
    assert_eq!(configuration.keys("blacklist"), BTreeSet::from(["brew"]));
}

#[test]
fn missing_sources_resolve_to_nothing() {
    let repo = TestRepo::new();
    let root = repo.root();
    let configuration = Configuration::load(
        &[root.join(CONFIGURATION_FILE), root.join(LOCAL_FILE)],
        Facts::for_platform(&debian()),
    )
    .unwrap();
    assert_eq!(configuration.section_names().count(), 0);
    assert_eq!(configuration.env().len(), 2);
}

#[test]
fn reserved_section_names_its_source() {
    let repo = TestRepo::new().with_file(LOCAL_FILE, "[env :: distribution == 'arch']\nx = 1\n");
    let root = repo.root();
    let err = Configuration::load(
        &[root.join(CONFIGURATION_FILE), root.join(LOCAL_FILE)],
        Facts::for_platform(&debian()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ReservedSection { ref section, .. } if section == "env"));
    assert!(err.to_string().contains(LOCAL_FILE));
}

#[test]
fn syntax_error_names_file_and_line() {
    let repo = TestRepo::new().with_file(CONFIGURATION_FILE, "\n# comment\norphan = 1\n[commands]\n");
    let err = Configuration::load(&[repo.root().join(CONFIGURATION_FILE)], Facts::new())
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSyntax { line: 3, .. }), "{err}");
}

// ---------------------------------------------------------------------------
// Command setup
// ---------------------------------------------------------------------------

#[test]
fn setup_configures_the_builtin_catalogue() {
    let repo = TestRepo::new()
        .with_file(CONFIGURATION_FILE, PACKAGES)
        .with_file(LOCAL_FILE, "[blacklist]\ncurl\n");
    let log = MemoryLog::default();

    let setup = CommandSetup::load(repo.root(), debian(), &log).unwrap();

    let curl = setup.registry.get("curl").unwrap();
    assert_eq!(
        curl.configuration().value("package_names", "bat"),
        Some("bat-cat")
    );
    assert_eq!(curl.source(), repo.root().join("home"));
    // brew and rust both need curl.
    for name in ["curl", "brew", "rust"] {
        let feature = setup.registry.get(name).unwrap();
        assert!(setup.registry.is_blacklisted(feature).unwrap(), "{name}");
    }
    assert!(!setup.registry.is_blacklisted(setup.registry.get("git").unwrap()).unwrap());
    assert_eq!(log.lines()[0], "stage: Loading configuration");
}
