//! Wires a resolved [`Settings`] into a [`Services`] bundle and [`Driver`] the commands drive.
//! This is the CLI's one production wiring point — every collaborator here is the filesystem-
//! backed reference implementation.

use std::path::PathBuf;
use std::sync::Arc;

use crucible_config::{ConfigLoader, PartialSettings, Settings};
use crucible_fetch::DefaultFetchFactory;
use crucible_hooks::HookRegistry;
use crucible_lifecycle::build_env::ProcessBuildEnv;
use crucible_lifecycle::driver::Driver;
use crucible_lifecycle::services::Services;
use crucible_registry::{InstallLayout, Registry};

pub struct Context {
    pub settings: Settings,
    pub driver: Driver,
    pub recipes_dir: PathBuf,
    /// Whether `--json` was passed: commands emit machine-readable result fields on stdout
    /// instead of human-readable text, while diagnostics stay on stderr (spec C14).
    pub json: bool,
}

impl Context {
    /// Resolves settings and constructs the production
    /// `Services` bundle from them.
    ///
    /// # Errors
    /// Propagates settings resolution failure, or a missing `recipes_dir`/`specs_dir`.
    pub fn new(
        project_dir: &std::path::Path,
        recipes_dir: PathBuf,
        specs_dir: PathBuf,
        cli_overrides: PartialSettings,
        json: bool,
    ) -> anyhow::Result<Self> {
        let settings = ConfigLoader::new(project_dir).with_cli_overrides(cli_overrides).resolve()?;

        let layout = Arc::new(InstallLayout::new(&settings.install_root));
        let registry = Arc::new(Registry::new(&settings.install_root));
        let repo: Arc<dyn crucible_lifecycle::services::Repository> =
            Arc::new(crate::repo::open(recipes_dir.clone(), specs_dir, Arc::clone(&layout), Arc::clone(&registry))?);
        let hooks = Arc::new(HookRegistry::new());
        let fetch_factory = Arc::new(DefaultFetchFactory::new(settings.checksum_required));
        let build_env = Arc::new(ProcessBuildEnv);

        let services = Services::new(layout, registry, repo, hooks, fetch_factory, build_env);

        Ok(Self {
            settings,
            driver: Driver::new(services),
            recipes_dir,
            json,
        })
    }
}
