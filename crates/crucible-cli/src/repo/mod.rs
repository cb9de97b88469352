//! A filesystem-backed [`Repository`]: recipes live one JSON document per package
//! under `<recipes_dir>/<name>/recipe.json`, concrete specs one JSON document per package under
//! `<specs_dir>/<name>.json`. This is the reference collaborator the out-of-scope solver/
//! metadata-repository would otherwise provide; `satisfied_constraints` takes the documented
//! shortcut for a minimal implementation: every constraint key the package declares is
//! considered satisfied, since constraint satisfaction itself is the solver's job.

pub mod descriptor;
pub mod shell_recipe;

use std::path::PathBuf;
use std::sync::Arc;

use crucible_core::{Error, Package, Result, Spec};
use crucible_lifecycle::recipe::Recipe;
use crucible_lifecycle::services::Repository;
use crucible_provenance::NAMESPACE;
use crucible_registry::{InstallLayout, Registry};

use descriptor::{load_package_descriptor, load_spec_file};
use shell_recipe::ShellRecipe;

pub struct FileRepository {
    recipes_dir: PathBuf,
    specs_dir: PathBuf,
    layout: Arc<InstallLayout>,
    registry: Arc<Registry>,
}

impl FileRepository {
    #[must_use]
    pub fn new(recipes_dir: PathBuf, specs_dir: PathBuf, layout: Arc<InstallLayout>, registry: Arc<Registry>) -> Self {
        Self {
            recipes_dir,
            specs_dir,
            layout,
            registry,
        }
    }

    fn recipe_dir_for(&self, name: &str) -> PathBuf {
        self.recipes_dir.join(name)
    }

    fn recipe_file_for(&self, name: &str) -> PathBuf {
        self.recipe_dir_for(name).join("recipe.json")
    }

    fn spec_file_for(&self, name: &str) -> PathBuf {
        self.specs_dir.join(format!("{name}.json"))
    }

    /// Loads and converts a package descriptor, if one exists on disk for `name`.
    ///
    /// # Errors
    /// Propagates I/O or JSON decode failures for a descriptor that exists but is malformed.
    pub fn load_package(&self, name: &str) -> Result<Option<Package>> {
        let path = self.recipe_file_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let descriptor = load_package_descriptor(&path)?;
        Ok(Some(descriptor.into_package(&self.recipe_dir_for(name))?))
    }
}

impl Repository for FileRepository {
    fn resolve(&self, name: &str) -> Option<Spec> {
        let path = self.spec_file_for(name);
        let spec_file = load_spec_file(&path).ok()?;
        Some(spec_file.into_spec())
    }

    fn package(&self, name: &str) -> Option<Package> {
        self.load_package(name).ok().flatten()
    }

    fn recipe(&self, name: &str) -> Option<Arc<dyn Recipe>> {
        let path = self.recipe_file_for(name);
        let descriptor = load_package_descriptor(&path).ok()?;
        let patch_target = descriptor.patch_target.clone();
        let phases = descriptor.phases.clone();
        Some(Arc::new(ShellRecipe::new(phases, patch_target)))
    }

    fn satisfied_constraints(&self, spec: &Spec) -> Vec<String> {
        let Some(package) = self.package(&spec.name) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = package.patches.keys().cloned().collect();
        keys.extend(package.resources.keys().cloned());
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    fn dependency_provenance_dir(&self, name: &str, version: &str) -> Option<PathBuf> {
        let record = self.registry.find_by_name_version(name, version).ok()??;
        let dir = record.prefix.join(".crucible").join("repos").join(NAMESPACE).join("packages").join(name);
        dir.is_dir().then_some(dir)
    }
}

/// Builds a fully wired [`FileRepository`], failing loudly if either directory is missing
/// rather than silently treating every package as unresolvable.
///
/// # Errors
/// [`crucible_core::Error::package`] if `recipes_dir` or `specs_dir` doesn't exist.
pub fn open(
    recipes_dir: PathBuf,
    specs_dir: PathBuf,
    layout: Arc<InstallLayout>,
    registry: Arc<Registry>,
) -> Result<FileRepository> {
    if !recipes_dir.is_dir() {
        return Err(Error::package(format!("recipes directory not found: {}", recipes_dir.display())));
    }
    if !specs_dir.is_dir() {
        return Err(Error::package(format!("specs directory not found: {}", specs_dir.display())));
    }
    Ok(FileRepository::new(recipes_dir, specs_dir, layout, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &std::path::Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_spec_and_package_from_disk() {
        let root = tempdir().unwrap();
        let recipes = root.path().join("recipes");
        let specs = root.path().join("specs");

        write(
            &specs.join("zlib.json"),
            r#"{"name":"zlib","version":"1.3.1","dag_hash":"hash1","dependencies":[],"external":false}"#,
        );
        write(
            &recipes.join("zlib/recipe.json"),
            r#"{"name":"zlib","sanity_check_is_file":["bin/zlib"]}"#,
        );

        let layout = Arc::new(InstallLayout::new(root.path().join("opt")));
        let registry = Arc::new(Registry::new(root.path().join("opt")));
        let repo = open(recipes, specs, layout, registry).unwrap();

        let spec = repo.resolve("zlib").unwrap();
        assert_eq!(spec.version.as_str(), "1.3.1");

        let package = repo.package("zlib").unwrap();
        assert_eq!(package.sanity_check_is_file, vec![PathBuf::from("bin/zlib")]);

        assert!(repo.recipe("zlib").is_some());
        assert!(repo.recipe("missing").is_none());
    }

    #[test]
    fn open_fails_loudly_on_missing_directories() {
        let root = tempdir().unwrap();
        let layout = Arc::new(InstallLayout::new(root.path().join("opt")));
        let registry = Arc::new(Registry::new(root.path().join("opt")));
        let err = open(root.path().join("nope"), root.path().join("nope2"), layout, registry).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Package);
    }
}
