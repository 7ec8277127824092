#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for the feature registry and the install lifecycle.
//!
//! Features here talk to the host only through a recording executor, so the
//! order of recorded command lines is the order the lifecycle ran them in.

mod common;

use dotfiles_features::config::{Configuration, Facts};
use dotfiles_features::error::FeatureError;
use dotfiles_features::features::{Env, Feature, FeatureBuilder, Registry, install_features};
use dotfiles_features::logging::Status;

use common::{MemoryLog, RecordingExecutor, debian, resolve};

/// A feature that checks with `check <name>`, installs with
/// `install <name>` and completes with `complete <name>`.
fn tool(name: &str) -> FeatureBuilder {
    Feature::builder(name, |env: &Env<'_>| {
        env.run(&["install", env.name()])?;
        Ok(())
    })
    .checker(|env| Ok(env.probe(&["check", env.name()])?))
    .completer(|env| {
        env.run(&["complete", env.name()])?;
        Ok(())
    })
}

fn configured(registry: &Registry, content: &str) {
    registry.configure(resolve(content, &debian()), "/dotfiles/home");
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn duplicate_name_is_rejected() {
    let mut registry = Registry::new();
    registry.register(tool("git")).unwrap();
    let err = registry.register(tool("git").description("again")).unwrap_err();
    assert_eq!(err.to_string(), "Feature \"git\" added twice");
    assert_eq!(registry.names(), ["git"]);
}

#[test]
fn unmet_dependency_stops_the_run_before_anything_executes() {
    let mut registry = Registry::new();
    registry.register(tool("git")).unwrap();
    registry
        .register(tool("rust").description("Rust toolchain").depends_on("curl"))
        .unwrap();
    configured(&registry, "");
    let executor = RecordingExecutor::new();
    let log = MemoryLog::default();

    let err = install_features(&mut registry, &executor, &log).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Feature rust - Rust toolchain has unmet dependencies: curl (available features: git, rust)"
    );
    assert!(executor.calls().is_empty());
}

#[test]
fn dependency_cycle_is_reported() {
    let mut registry = Registry::new();
    registry.register(tool("a").depends_on("b")).unwrap();
    registry.register(tool("b").depends_on("a")).unwrap();
    configured(&registry, "");

    let err = registry.validate().unwrap_err();
    assert!(matches!(err, FeatureError::DependencyCycle(_)), "{err}");
    assert!(
        install_features(&mut registry, &RecordingExecutor::new(), &MemoryLog::default())
            .is_err()
    );
}

#[test]
fn blacklist_reaches_transitive_dependents_only() {
    let mut registry = Registry::new();
    registry.register(tool("curl")).unwrap();
    registry.register(tool("brew").depends_on("curl")).unwrap();
    registry.register(tool("gh").depends_on("brew")).unwrap();
    registry.register(tool("git")).unwrap();
    configured(&registry, "[blacklist]\nbrew\n");

    let blacklisted: Vec<&str> = registry
        .iter()
        .filter(|f| registry.is_blacklisted(f).unwrap())
        .map(Feature::name)
        .collect();
    assert_eq!(blacklisted, ["brew", "gh"]);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn preparer_moves_feature_to_the_front() {
    let mut registry = Registry::new();
    let p = registry.register(tool("p")).unwrap();
    let q = registry.register(tool("q").depends_on(&p)).unwrap();
    registry
        .register(tool("r").depends_on(q).preparer(|_, placement| {
            placement.to_front();
            Ok(())
        }))
        .unwrap();
    configured(&registry, "");
    let executor = RecordingExecutor::new().failing("check");
    let log = MemoryLog::default();

    let reports = install_features(&mut registry, &executor, &log).unwrap();

    let order: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, ["r", "p", "q"]);
    insta::assert_snapshot!(executor.calls().join("\n"), @r"
    check r
    install r
    check p
    install p
    check q
    install q
    complete q
    complete p
    complete r
    ");
}

#[test]
fn present_features_are_ignored_and_blacklisted_ones_disabled() {
    let mut registry = Registry::new();
    registry.register(tool("git").description("Git")).unwrap();
    registry.register(tool("vim").description("Vi IMproved")).unwrap();
    registry.register(tool("brew").description("Homebrew")).unwrap();
    configured(&registry, "[blacklist]\nbrew\n");
    let executor = RecordingExecutor::new().failing("check vim");
    let log = MemoryLog::default();

    install_features(&mut registry, &executor, &log).unwrap();

    assert_eq!(log.recorded(Status::Ignored), ["git"]);
    assert_eq!(log.recorded(Status::Installed), ["vim"]);
    assert_eq!(log.recorded(Status::Disabled), ["brew"]);
    assert!(!executor.calls().iter().any(|c| c.ends_with("brew")));
    let lines = log.lines();
    assert!(lines.contains(&"info: installing: Vi IMproved (vim)".to_string()));
    assert!(lines.contains(&"debug: ignoring: Git         (git)".to_string()));
}

#[test]
fn presence_is_checked_once_until_installed() {
    let mut registry = Registry::new();
    registry.register(tool("bat")).unwrap();
    configured(&registry, "");
    let executor = RecordingExecutor::new().failing("check");
    let log = MemoryLog::default();
    let bat = registry.get("bat").unwrap();

    assert!(!bat.present(&executor, &log).unwrap());
    assert!(!bat.present(&executor, &log).unwrap());
    assert_eq!(bat.cached_presence(), Some(false));
    bat.install(&executor, &log).unwrap();
    assert_eq!(bat.cached_presence(), None);
    assert!(!bat.present(&executor, &log).unwrap());

    assert_eq!(executor.calls(), ["check bat", "install bat", "check bat"]);
}

#[test]
fn failing_installer_aborts_the_run() {
    let mut registry = Registry::new();
    registry.register(tool("a")).unwrap();
    registry.register(tool("b")).unwrap();
    configured(&registry, "");
    let executor = RecordingExecutor::new()
        .failing("check")
        .failing("install a");
    let log = MemoryLog::default();

    let err = install_features(&mut registry, &executor, &log).unwrap_err();

    assert!(format!("{err:#}").contains("install a"), "{err:#}");
    assert_eq!(executor.calls(), ["check a", "install a"]);
}

#[test]
fn configuration_is_visible_to_callbacks() {
    let mut registry = Registry::new();
    registry
        .register(Feature::builder("pkg", |env| {
            let command = env
                .configuration()
                .value("commands", "package_install")
                .unwrap_or("false")
                .to_string();
            env.run_with(&[command.as_str(), "${name}"], &[("name", env.name())])?;
            Ok(())
        }))
        .unwrap();
    let mut configuration = Configuration::new(Facts::for_platform(&debian()));
    configuration
        .merge_str(
            "[commands :: distribution == 'debian']\npackage_install = apt-get\n",
            std::path::Path::new("configuration.conf"),
        )
        .unwrap();
    registry.configure(configuration, "/dotfiles/home");
    let executor = RecordingExecutor::new();

    install_features(&mut registry, &executor, &MemoryLog::default()).unwrap();

    assert_eq!(executor.calls(), ["apt-get pkg"]);
}
