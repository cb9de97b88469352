//! In-memory fakes for the lifecycle driver's collaborator traits. Grounded on the
//! teacher's general "inject a fake instead of a real adapter" test philosophy, applied to this
//! engine's narrower `Repository`/`BuildEnv`/`Recipe` seams.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crucible_core::{Package, Result, Spec};
use parking_lot::Mutex;
use crucible_lifecycle::build_env::{BuildContext, BuildEnv, RunRequest};
use crucible_lifecycle::recipe::Recipe;
use crucible_lifecycle::services::Repository;

/// An in-memory [`Repository`]: specs and packages keyed by name, recipes keyed by name too.
/// `satisfied_constraints` returns every constraint key the package declares, the same
/// shortcut the filesystem-backed reference `Repository` takes (the real solver is out of
/// scope here).
#[derive(Default)]
pub struct InMemoryRepository {
    specs: HashMap<String, Spec>,
    packages: HashMap<String, Package>,
    recipes: HashMap<String, Arc<dyn Recipe>>,
    provenance_dirs: HashMap<(String, String), PathBuf>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_spec(mut self, spec: Spec) -> Self {
        self.specs.insert(spec.name.clone(), spec);
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: Package) -> Self {
        self.packages.insert(package.name.clone(), package);
        self
    }

    #[must_use]
    pub fn with_recipe(mut self, name: impl Into<String>, recipe: Arc<dyn Recipe>) -> Self {
        self.recipes.insert(name.into(), recipe);
        self
    }

    #[must_use]
    pub fn with_provenance_dir(mut self, name: impl Into<String>, version: impl Into<String>, dir: PathBuf) -> Self {
        self.provenance_dirs.insert((name.into(), version.into()), dir);
        self
    }
}

impl Repository for InMemoryRepository {
    fn resolve(&self, name: &str) -> Option<Spec> {
        self.specs.get(name).cloned()
    }

    fn package(&self, name: &str) -> Option<Package> {
        self.packages.get(name).cloned()
    }

    fn recipe(&self, name: &str) -> Option<Arc<dyn Recipe>> {
        self.recipes.get(name).cloned()
    }

    fn satisfied_constraints(&self, spec: &Spec) -> Vec<String> {
        let Some(package) = self.packages.get(&spec.name) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = package.patches.keys().cloned().collect();
        keys.extend(package.resources.keys().cloned());
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    fn dependency_provenance_dir(&self, name: &str, version: &str) -> Option<PathBuf> {
        self.provenance_dirs.get(&(name.to_string(), version.to_string())).cloned()
    }
}

/// A [`Recipe`] that installs nothing but touches each declared sanity-check path, so the
/// driver's post-build sanity check passes without a real build toolchain.
#[derive(Debug, Default)]
pub struct TouchFilesRecipe {
    pub files: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
}

impl TouchFilesRecipe {
    #[must_use]
    pub fn new(files: Vec<PathBuf>, dirs: Vec<PathBuf>) -> Self {
        Self { files, dirs }
    }
}

impl Recipe for TouchFilesRecipe {
    fn install(&self, ctx: &BuildContext<'_>) -> Result<()> {
        for file in &self.files {
            let path = ctx.prefix().join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, b"").unwrap();
        }
        for dir in &self.dirs {
            std::fs::create_dir_all(ctx.prefix().join(dir)).unwrap();
        }
        Ok(())
    }
}

/// A [`BuildEnv`] that records every invocation instead of spawning a real process, for
/// asserting on the sequence of build-tool calls a recipe issues without needing real
/// `configure`/`make`/`cmake` binaries on the test machine.
#[derive(Debug, Default)]
pub struct RecordingBuildEnv {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingBuildEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }
}

impl BuildEnv for RecordingBuildEnv {
    fn run(&self, request: &RunRequest<'_>) -> Result<()> {
        self.calls
            .lock()
            .push((request.program.to_string(), request.args.iter().map(|s| (*s).to_string()).collect()));
        if let Some(parent) = request.log_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(request.log_path, b"").ok();
        Ok(())
    }
}

/// Convenience stand-in for recipe-hook signatures expecting `&Path`.
pub fn noop_patch_hook(_dir: &Path) -> Result<()> {
    Ok(())
}
