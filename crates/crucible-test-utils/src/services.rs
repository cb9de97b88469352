//! Assembles a full [`Services`] bundle over a tempdir-backed [`InstallLayout`]/[`Registry`]
//! and an in-memory [`InMemoryRepository`], so `crucible-lifecycle` integration tests exercise
//! the real driver against fake collaborators instead of mocking the driver itself.

use std::sync::Arc;

use crucible_fetch::DefaultFetchFactory;
use crucible_hooks::HookRegistry;
use crucible_lifecycle::build_env::ProcessBuildEnv;
use crucible_lifecycle::services::Services;
use crucible_registry::{InstallLayout, Registry};
use tempfile::TempDir;

use crate::fakes::InMemoryRepository;

/// Owns the tempdir backing a test [`Services`] bundle so it outlives the test.
pub struct TestServices {
    pub dir: TempDir,
    pub services: Services,
}

impl TestServices {
    /// Builds a `Services` bundle rooted at a fresh tempdir, with `repo` as the in-memory
    /// repository. Uses the real filesystem-backed `InstallLayout`/`Registry`/`HookRegistry`
    /// and the production `DefaultFetchFactory`/`ProcessBuildEnv`, which are
    /// never reached when tests install with `InstallOptions::fake = true`.
    #[must_use]
    pub fn new(repo: InMemoryRepository) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = Arc::new(InstallLayout::new(dir.path()));
        let registry = Arc::new(Registry::new(dir.path()));
        let services = Services::new(
            layout,
            registry,
            Arc::new(repo),
            Arc::new(HookRegistry::new()),
            Arc::new(DefaultFetchFactory::default()),
            Arc::new(ProcessBuildEnv),
        );
        Self { dir, services }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::TouchFilesRecipe;
    use crate::fixtures::Fixtures;
    use crucible_lifecycle::driver::{Driver, InstallOptions};

    #[test]
    fn fake_install_populates_a_stub_prefix_and_registers_it() {
        let spec = Fixtures::leaf_spec("zlib");
        let package = Fixtures::leaf_package("zlib");
        let repo = InMemoryRepository::new()
            .with_spec(spec.clone())
            .with_package(package)
            .with_recipe("zlib", Arc::new(TouchFilesRecipe::default()));

        let test_services = TestServices::new(repo);
        let driver = Driver::new(test_services.services.clone());

        let options = InstallOptions { fake: true, ..Default::default() };
        driver.do_install(&spec, &options).unwrap();

        assert!(test_services.services.layout.check_installed(&spec));
        assert!(test_services.services.registry.is_installed(&spec.dag_hash).unwrap());
    }
}
