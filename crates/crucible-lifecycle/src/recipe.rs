//! The recipe capability trait.
//!
//! A recipe implements only `install`; every other lifecycle touchpoint — patching, environment
//! setup for itself or its dependents, extension activation — is an optional method with a
//! no-op default. `crucible-core::package` holds the data half; this is the behavior half
//! the driver invokes.

use std::path::{Path, PathBuf};

use crucible_core::{Result, Spec};

use crate::build_env::BuildContext;
use crate::env::EnvironmentModifications;

pub trait Recipe: Send + Sync {
    /// The only required capability: build and install into `ctx.prefix`.
    fn install(&self, ctx: &BuildContext<'_>) -> Result<()>;

    /// A recipe-supplied patch step, run after all file-based patches apply. No-op by default.
    fn patch(&self, _source_dir: &Path) -> Result<()> {
        Ok(())
    }

    /// Whether this recipe overrides [`patch`](Self::patch) with real behavior. Rust has no way to introspect whether a trait
    /// method keeps its default, so a recipe that overrides `patch` must also override this to
    /// `true`, or the patch applicator will never call it.
    fn has_patch_hook(&self) -> bool {
        false
    }

    /// Relative to the staged source root, the single file this recipe's file-based patches
    /// rewrite. Only consulted when the recipe declares at least one patch; recipes with no
    /// patches never have this called.
    fn patch_target_file(&self) -> PathBuf {
        PathBuf::new()
    }

    fn setup_environment(&self, _spec: &Spec, _env: &mut EnvironmentModifications) {}

    /// Defaults to delegating to `setup_environment`, matching the source's "default to self"
    /// behavior for recipes that don't distinguish their own build environment
    /// from what they hand their dependents.
    fn setup_dependent_environment(&self, dependent_spec: &Spec, env: &mut EnvironmentModifications) {
        self.setup_environment(dependent_spec, env);
    }

    fn setup_dependent_package(&self, _dependent_spec: &Spec, _dependent_prefix: &Path) {}

    /// Defaults to the standard link-tree merge; overridable for packages with an
    /// extension mechanism beyond plain file linking.
    fn activate(&self, extension_prefix: &Path, host_prefix: &Path) -> Result<()> {
        crucible_extension::activate(extension_prefix, host_prefix)
    }

    fn deactivate(&self, extension_prefix: &Path, host_prefix: &Path) -> Result<()> {
        crucible_extension::deactivate(extension_prefix, host_prefix)
    }
}
