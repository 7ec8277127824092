//! The Rust toolchain.
use super::{curl, system};
use crate::config::guard::Value;
use crate::features::{Env, Feature, FeatureBuilder, FeatureHandle};

/// The rustup bootstrap script.
pub const URL: &str = "https://sh.rustup.rs";

/// The `rust` feature.
///
/// Installs the distribution package on Termux and runs rustup everywhere
/// else.
#[must_use]
pub fn feature(curl: &FeatureHandle) -> FeatureBuilder {
    Feature::builder("rust", |env| {
        if on_termux(env) {
            return system::install_package(env, "rust");
        }
        let script = curl::get(env, URL)?;
        env.run(&[
            "sh".to_string(),
            script.arg(),
            "-y".to_string(),
            "--no-modify-path".to_string(),
        ])?;
        Ok(())
    })
    .description("The Rust programming language")
    .depends_on(curl)
    .checker(|_| Ok(system::present("rustc")))
}

fn on_termux(env: &Env<'_>) -> bool {
    matches!(
        env.configuration().fact("distribution"),
        Some(Value::Distribution(distribution)) if distribution.contains("termux")
    )
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::{Configuration, Facts};
    use crate::exec::{ExecResult, MockExecutor};
    use crate::features::Registry;
    use crate::logging::MemoryLog;
    use crate::platform::Distribution;

    fn registry(distribution: Distribution) -> Registry {
        let mut registry = Registry::new();
        let curl = registry.register(curl::feature()).unwrap();
        registry.register(feature(&curl)).unwrap();
        let mut facts = Facts::new();
        facts.insert("distribution", distribution);
        let mut configuration = Configuration::new(facts);
        configuration
            .merge_str(
                "[commands]\npackage_install = pkg install ${name}\n",
                Path::new("configuration.conf"),
            )
            .unwrap();
        registry.configure(configuration, "/src/home");
        registry
    }

    #[test]
    fn termux_installs_the_package() {
        let registry = registry(Distribution::new("Termux", ["termux"]));
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .withf(|inv| inv.args == ["pkg", "install", "rust"])
            .times(1)
            .returning(|_| Ok(ExecResult::ok("")));
        let log = MemoryLog::default();

        registry.get("rust").unwrap().install(&executor, &log).unwrap();
    }

    #[test]
    fn elsewhere_runs_rustup_without_touching_the_path() {
        let registry = registry(Distribution::new("Arch Linux", ["arch"]));
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .withf(|inv| inv.args[0] == "curl")
            .times(1)
            .returning(|_| Ok(ExecResult::ok("")));
        executor
            .expect_execute()
            .withf(|inv| {
                inv.args[0] == "sh" && inv.args[2..] == ["-y", "--no-modify-path"]
            })
            .times(1)
            .returning(|_| Ok(ExecResult::ok("")));
        let log = MemoryLog::default();

        registry.get("rust").unwrap().install(&executor, &log).unwrap();
    }
}
