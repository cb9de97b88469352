//! The `Services` bundle: everything the driver needs at construction, injected rather than
//! reached for through process-wide state. Production wires real filesystem-backed
//! implementations; tests construct one from in-memory/tempdir fakes (see the `crucible-cli`
//! and integration-test crates).

use std::path::PathBuf;
use std::sync::Arc;

use crucible_core::spec::SpecResolver;
use crucible_core::{Package, Spec};
use crucible_fetch::FetchFactory;
use crucible_hooks::HookRegistry;
use crucible_provenance::{DependencyProvenanceLookup, RecipeSource};
use crucible_registry::{InstallLayout, Registry};

use crate::build_env::BuildEnv;
use crate::recipe::Recipe;

/// Package metadata and recipe lookup ("Repository: `get(name) → Package`..."),
/// narrowed to what this engine's driver actually calls: resolving a name to its concrete
/// dependency spec, its declared package metadata, its installable recipe, which of its
/// constraint keys the current spec satisfies, and where a dependency's own provenance snapshot
/// lives once installed.
pub trait Repository: Send + Sync {
    /// The fully-resolved dependency [`Spec`] for `name`, as the (out-of-scope) solver produced
    /// it. `None` if this repository has no such package.
    fn resolve(&self, name: &str) -> Option<Spec>;

    fn package(&self, name: &str) -> Option<Package>;

    /// The installable recipe for `name`. `None` means the package has no install method on
    /// record, which the driver surfaces as an [`crucible_core::Error::install`].
    fn recipe(&self, name: &str) -> Option<Arc<dyn Recipe>>;

    /// Which of `spec`'s package's declared constraint keys (patch/resource maps) are
    /// satisfied by this concrete spec. A minimal in-memory repository may simply return every
    /// constraint key the package declares; a real one would consult the (out-of-scope)
    /// constraint-satisfaction solver.
    fn satisfied_constraints(&self, spec: &Spec) -> Vec<String>;

    /// Where `name`@`version`'s own previously captured provenance snapshot lives, if it has
    /// one.
    fn dependency_provenance_dir(&self, name: &str, version: &str) -> Option<PathBuf>;
}

/// Adapts a [`Repository`] to the narrower traits `crucible-core`'s dependency walker and
/// `crucible-provenance`'s dumper expect, so those crates stay ignorant of the driver's
/// `Repository` shape.
pub struct RepoAdapter<'a>(pub &'a dyn Repository);

impl SpecResolver for RepoAdapter<'_> {
    fn resolve(&self, name: &str) -> Option<Spec> {
        self.0.resolve(name)
    }
}

impl RecipeSource for RepoAdapter<'_> {
    fn package_for(&self, name: &str) -> Option<Package> {
        self.0.package(name)
    }

    fn satisfied_constraints(&self, spec: &Spec) -> Vec<String> {
        self.0.satisfied_constraints(spec)
    }
}

impl DependencyProvenanceLookup for RepoAdapter<'_> {
    fn dependency_provenance_dir(&self, name: &str, version: &str) -> Option<PathBuf> {
        self.0.dependency_provenance_dir(name, version)
    }
}

/// Everything the lifecycle driver needs, grouped so the driver receives one value at
/// construction instead of reaching for process-wide state.
#[derive(Clone)]
pub struct Services {
    pub layout: Arc<InstallLayout>,
    pub registry: Arc<Registry>,
    pub repo: Arc<dyn Repository>,
    pub hooks: Arc<HookRegistry>,
    pub fetch_factory: Arc<dyn FetchFactory>,
    pub build_env: Arc<dyn BuildEnv>,
}

impl Services {
    #[must_use]
    pub fn new(
        layout: Arc<InstallLayout>,
        registry: Arc<Registry>,
        repo: Arc<dyn Repository>,
        hooks: Arc<HookRegistry>,
        fetch_factory: Arc<dyn FetchFactory>,
        build_env: Arc<dyn BuildEnv>,
    ) -> Self {
        Self {
            layout,
            registry,
            repo,
            hooks,
            fetch_factory,
            build_env,
        }
    }
}
