//! Homebrew, the package manager for macOS.
use super::{curl, system};
use crate::features::{Feature, FeatureBuilder, FeatureHandle};

/// Homebrew's install script.
pub const URL: &str = "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

/// The `brew` feature.
///
/// Other features may install through Homebrew, so it moves itself to the
/// front of the registry while preparing.
#[must_use]
pub fn feature(curl: &FeatureHandle) -> FeatureBuilder {
    Feature::builder("brew", |env| {
        let script = curl::get(env, URL)?;
        env.run(&["bash".to_string(), script.arg()])?;
        Ok(())
    })
    .description("The Missing Package Manager for macOS")
    .depends_on(curl)
    .checker(|_| Ok(system::present("brew")))
    .preparer(|_, placement| {
        placement.to_front();
        Ok(())
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::{ExecResult, MockExecutor};
    use crate::features::{Placement, Registry};
    use crate::logging::MemoryLog;

    #[test]
    fn installs_by_running_the_downloaded_script() {
        let mut registry = Registry::new();
        let curl = registry.register(curl::feature()).unwrap();
        registry.register(feature(&curl)).unwrap();

        let mut executor = MockExecutor::new();
        let mut seq = mockall::Sequence::new();
        executor
            .expect_execute()
            .withf(|inv| inv.args.first().is_some_and(|a| a == "curl"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ExecResult::ok("")));
        executor
            .expect_execute()
            .withf(|inv| inv.args[0] == "bash" && inv.args.len() == 2 && inv.interactive)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ExecResult::ok("")));
        let log = MemoryLog::default();

        let brew = registry.get("brew").unwrap();
        brew.install(&executor, &log).unwrap();
        assert_eq!(brew.dependency_names(), ["curl"]);
    }

    #[test]
    fn prepares_to_the_front() {
        let mut registry = Registry::new();
        let curl = registry.register(curl::feature()).unwrap();
        registry.register(feature(&curl)).unwrap();
        let executor = MockExecutor::new();
        let log = MemoryLog::default();

        let placement = registry.get("brew").unwrap().prepare(&executor, &log).unwrap();
        assert_eq!(placement, Placement::Front);
    }
}
