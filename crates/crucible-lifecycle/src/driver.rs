//! The lifecycle driver: the state machine that takes a concrete spec through
//! fetch → stage → patch → install → sanity → provenance → register, plus uninstall and
//! extension activate/deactivate. Grounded directly on `original_source/lib/spack/spack/
//! package.py`'s `do_install`, `do_uninstall`, `do_install_dependencies`, `sanity_check_prefix`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crucible_core::spec::preorder_traversal;
use crucible_core::{Error, Package, Result, Sentinel, Spec};
use crucible_fetch::FetcherComposite;
use crucible_hooks::Hook;
use crucible_patch::do_patch;
use crucible_provenance::dump_packages;
use crucible_registry::InstallLayout;
use crucible_stage::{Stage, StageComposite};

use crate::build_env::BuildContext;
use crate::env::EnvironmentModifications;
use crate::recipe::Recipe;
use crate::sanity::sanity_check_prefix;
use crate::services::{RepoAdapter, Services};

/// Flags accepted by [`Driver::do_install`].
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Retain the prefix on failure instead of removing it. Default `false`.
    pub keep_prefix: bool,
    /// Retain the stage on success instead of destroying it. Default `false`.
    pub keep_stage: bool,
    /// Skip installing dependencies first. Default `false`.
    pub ignore_deps: bool,
    /// Stage only, skip patching. Default `false`.
    pub skip_patch: bool,
    /// Tee build output to the terminal in addition to the build log. Default `false`.
    pub verbose: bool,
    /// Overrides the package's own `make_jobs`/the detected CPU count.
    pub make_jobs: Option<u32>,
    /// Skip the real build; populate a stub prefix (`bin/fake`, empty `lib`, `man1`).
    pub fake: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            keep_prefix: false,
            keep_stage: false,
            ignore_deps: false,
            skip_patch: false,
            verbose: false,
            make_jobs: None,
            fake: false,
        }
    }
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1)
}

fn short_hash(dag_hash: &str) -> String {
    dag_hash.chars().take(7).collect()
}

/// Builds the per-entry [`Stage`]/[`StageComposite`] a [`FetcherComposite`] fetches into: the
/// root entry lands directly at the spec's stage root, each resource gets its own
/// label-named subdirectory. The mirror cache is keyed per-package so repeated installs reuse a download.
fn build_stage_composite(layout: &InstallLayout, spec: &Spec, fetch_composite: &FetcherComposite) -> StageComposite {
    let stage_root = layout.stage_root(spec);
    let mirror_root = layout.mirror_root().join(&spec.name);
    let labels = fetch_composite.labels();
    let destinations = fetch_composite.destinations();

    let archive_name = |i: usize| -> String {
        destinations[i]
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}-archive", labels[i]))
    };

    let stage_for = |i: usize| -> Stage {
        let root_dir = if i == 0 { stage_root.clone() } else { stage_root.join(labels[i]) };
        let name = archive_name(i);
        Stage::new(root_dir, mirror_root.join(&name), name)
    };

    let mut composite = StageComposite::new(stage_for(0));
    for i in 1..labels.len() {
        composite = composite.with_resource(stage_for(i));
    }
    composite
}

/// The lifecycle driver, constructed once with a [`Services`] bundle.
pub struct Driver {
    services: Services,
}

impl Driver {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Installs `spec` and, unless `options.ignore_deps`, every direct dependency first with
    /// the same option set.
    ///
    /// # Errors
    /// See: a non-concrete spec, a missing recipe, any fetch/stage/patch/build
    /// failure, or a failed sanity check all propagate here. On failure the prefix is removed
    /// unless `options.keep_prefix` is set.
    pub fn do_install(&self, spec: &Spec, options: &InstallOptions) -> Result<()> {
        if !spec.is_concrete() {
            return Err(Error::install(format!("cannot install non-concrete spec '{}'", spec.name)));
        }

        if spec.external {
            tracing::info!(name = %spec.name, "package is provided externally, nothing to install");
            return Ok(());
        }

        if self.services.layout.check_installed(spec) {
            tracing::info!(name = %spec.name, dag_hash = %short_hash(&spec.dag_hash), "already installed, nothing to do");
            return Ok(());
        }

        let span = tracing::info_span!("do_install", name = %spec.name, version = %spec.version.as_str(), dag_hash = %short_hash(&spec.dag_hash));
        let _enter = span.enter();

        let package = self
            .services
            .repo
            .package(&spec.name)
            .ok_or_else(|| Error::package(format!("no package metadata on record for '{}'", spec.name)))?;

        let (dependency_prefixes, dependency_dag_hashes) = if options.ignore_deps {
            (Vec::new(), Vec::new())
        } else {
            self.install_dependencies(spec, options)?
        };

        let prefix = self.services.layout.create_install_directory(spec)?;

        let outcome = self.build_child(spec, &package, options, &prefix, &dependency_prefixes);

        if let Err(err) = outcome {
            if !options.keep_prefix {
                if let Err(cleanup_err) = self.services.layout.remove_install_directory(spec) {
                    tracing::warn!(error = %cleanup_err, "failed to remove prefix after failed install");
                }
            }
            return Err(err);
        }

        self.services.registry.add_with_dependencies(spec, &prefix, dependency_dag_hashes)?;
        self.services.hooks.dispatch(Hook::PostInstall, spec)?;
        tracing::info!(name = %spec.name, prefix = %prefix.display(), "installed");
        Ok(())
    }

    /// The dependency walker applied with side effects: installs each direct,
    /// real (non-virtual) dependency with the same option set, recursing through `do_install`
    /// rather than flattening the whole DAG here (each dependency's own recursive call handles
    /// its own dependencies in turn).
    fn install_dependencies(&self, spec: &Spec, options: &InstallOptions) -> Result<(Vec<(String, PathBuf)>, Vec<String>)> {
        let mut prefixes = Vec::new();
        let mut dag_hashes = Vec::new();

        for name in spec.direct_dependency_names(false) {
            let dep_spec = self
                .services
                .repo
                .resolve(name)
                .ok_or_else(|| Error::dependency_conflict(format!("no resolved spec for dependency '{name}'")))?;

            self.do_install(&dep_spec, options)?;

            prefixes.push((dep_spec.name.clone(), self.services.layout.path_for_spec(&dep_spec)));
            dag_hashes.push(dep_spec.dag_hash.clone());
        }

        Ok((prefixes, dag_hashes))
    }

    /// The forked build process: fetch/stage/patch (unless `fake`),
    /// pre-install hooks, the recipe's install operation (or a stub tree when `fake`), sanity
    /// checks, and provenance capture.
    fn build_child(
        &self,
        spec: &Spec,
        package: &Package,
        options: &InstallOptions,
        prefix: &Path,
        dependency_prefixes: &[(String, PathBuf)],
    ) -> Result<()> {
        let recipe = self
            .services
            .repo
            .recipe(&spec.name)
            .ok_or_else(|| Error::install(format!("package '{}' declares no install method", spec.name)))?;

        let satisfied = self.services.repo.satisfied_constraints(spec);
        let satisfied_refs: Vec<&str> = satisfied.iter().map(String::as_str).collect();

        let fetch_start = Instant::now();
        let mut source_dir: Option<PathBuf> = None;
        let mut scoped_stage = None;

        if !options.fake {
            let fetch_composite = self.services.fetch_factory.composite_for(package, spec, &satisfied_refs)?;
            let mut stage_composite = build_stage_composite(&self.services.layout, spec, &fetch_composite);
            stage_composite.fetch_all(&fetch_composite.fetchers(), false)?;
            stage_composite.expand_all()?;
            let mut scoped = stage_composite.scoped(options.keep_stage);

            if !options.skip_patch {
                let staged = scoped.root.source_path()?.to_path_buf();
                if staged.join(Sentinel::PatchFailed.filename()).exists() {
                    tracing::info!(name = %spec.name, "stale patch-failed sentinel found, restaging");
                    scoped.restage()?;
                }

                let staged = scoped.root.source_path()?.to_path_buf();
                let target = recipe.patch_target_file();
                let patch_closure = |dir: &Path| recipe.patch(dir);
                let recipe_patch: Option<&dyn Fn(&Path) -> Result<()>> =
                    if recipe.has_patch_hook() { Some(&patch_closure) } else { None };
                do_patch(package, &satisfied_refs, &staged, &target, recipe_patch)?;
            }

            source_dir = Some(scoped.root.source_path()?.to_path_buf());
            scoped_stage = Some(scoped);
        }
        let fetch_elapsed = fetch_start.elapsed();

        self.services.hooks.dispatch(Hook::PreInstall, spec)?;

        let build_start = Instant::now();
        if options.fake {
            populate_stub_tree(prefix)?;
        } else {
            let source_dir = source_dir.expect("populated in the non-fake branch above");

            let mut env = EnvironmentModifications::new();
            recipe.setup_environment(spec, &mut env);
            for (dep_name, _) in dependency_prefixes {
                if let Some(dep_recipe) = self.services.repo.recipe(dep_name) {
                    dep_recipe.setup_dependent_environment(spec, &mut env);
                }
            }

            let env_path = self.services.layout.build_env_path(spec);
            if let Some(parent) = env_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            std::fs::write(&env_path, env.snapshot()).map_err(|e| Error::io(env_path.clone(), e))?;

            let log_path = self.services.layout.build_log_path(spec);
            let make_jobs = options.make_jobs.or(package.make_jobs).unwrap_or_else(default_jobs);

            let ctx = BuildContext::new(
                spec,
                prefix,
                &source_dir,
                make_jobs,
                dependency_prefixes,
                self.services.build_env.as_ref(),
                &env,
                &log_path,
                options.verbose,
            );
            recipe.install(&ctx)?;

            sanity_check_prefix(
                prefix,
                &package.sanity_check_is_file,
                &package.sanity_check_is_dir,
                InstallLayout::hidden_file_paths(),
            )?;

            let adapter = RepoAdapter(self.services.repo.as_ref());
            let traversal = preorder_traversal(spec, &adapter, false);
            let provenance_dest = self.services.layout.build_packages_path(spec);
            dump_packages(&traversal, &adapter, &adapter, &provenance_dest)?;
        }
        let build_elapsed = build_start.elapsed();

        tracing::info!(
            name = %spec.name,
            fetch_ms = fetch_elapsed.as_millis(),
            build_ms = build_elapsed.as_millis(),
            total_ms = (fetch_elapsed + build_elapsed).as_millis(),
            "install step timings"
        );

        drop(scoped_stage);
        Ok(())
    }

    /// Uninstalls `spec`. Unless `force`, refuses when any installed spec still depends on it.
    ///
    /// # Errors
    /// [`crucible_core::Error::install`] if not installed;
    /// [`crucible_core::Error::package_still_needed`] if dependents exist and `force` is false.
    pub fn do_uninstall(&self, spec: &Spec, force: bool) -> Result<()> {
        if !self.services.registry.is_installed(&spec.dag_hash)? {
            return Err(Error::install(format!("'{}' is not installed", spec.name)));
        }

        if !force {
            let dependents = self.services.registry.dependents_of(&spec.dag_hash)?;
            if !dependents.is_empty() {
                return Err(Error::package_still_needed(spec.name.clone(), dependents));
            }
        }

        self.services.hooks.dispatch(Hook::PreUninstall, spec)?;
        self.services.layout.remove_install_directory(spec)?;
        self.services.registry.remove(&spec.dag_hash)?;
        self.services.hooks.dispatch(Hook::PostUninstall, spec)?;
        tracing::info!(name = %spec.name, "uninstalled");
        Ok(())
    }

    /// Activates `extension_spec` into `host_spec`'s prefix: both must be
    /// installed, the host must declare itself extendable, and the extension's extendee must
    /// name the host.
    ///
    /// # Errors
    /// [`crucible_core::Error::activation`] on any precondition failure;
    /// [`crucible_core::Error::extension_conflict`] if a link-tree path collides.
    pub fn activate(&self, extension_spec: &Spec, host_spec: &Spec) -> Result<()> {
        if !self.services.layout.check_installed(extension_spec) {
            return Err(Error::activation(format!("'{}' is not installed", extension_spec.name)));
        }
        if !self.services.layout.check_installed(host_spec) {
            return Err(Error::activation(format!("'{}' is not installed", host_spec.name)));
        }

        let host_package = self
            .services
            .repo
            .package(&host_spec.name)
            .ok_or_else(|| Error::package(format!("no package metadata on record for '{}'", host_spec.name)))?;
        if !host_package.extendable {
            return Err(Error::activation(format!("'{}' is not extendable", host_spec.name)));
        }

        let extension_package = self
            .services
            .repo
            .package(&extension_spec.name)
            .ok_or_else(|| Error::package(format!("no package metadata on record for '{}'", extension_spec.name)))?;
        match extension_package.active_extendee() {
            Some(extendee) if extendee.host_name == host_spec.name => {}
            _ => {
                return Err(Error::activation(format!(
                    "'{}' does not extend '{}'",
                    extension_spec.name, host_spec.name
                )));
            }
        }

        let recipe = self
            .services
            .repo
            .recipe(&extension_spec.name)
            .ok_or_else(|| Error::install(format!("package '{}' declares no install method", extension_spec.name)))?;

        let extension_prefix = self.services.layout.path_for_spec(extension_spec);
        let host_prefix = self.services.layout.path_for_spec(host_spec);
        recipe.activate(&extension_prefix, &host_prefix)?;
        self.services.layout.add_extension(host_spec, extension_spec)
    }

    /// Deactivates `extension_spec` from `host_spec`'s prefix. Unless `force`, refuses when
    /// another activated extension transitively depends on this one.
    pub fn deactivate(&self, extension_spec: &Spec, host_spec: &Spec, force: bool) -> Result<()> {
        if !force {
            let activated = self.services.layout.extension_map(host_spec)?;
            let adapter = RepoAdapter(self.services.repo.as_ref());
            for name in activated.keys() {
                if name == &extension_spec.name {
                    continue;
                }
                let Some(other_spec) = self.services.repo.resolve(name) else {
                    continue;
                };
                let closure = preorder_traversal(&other_spec, &adapter, false);
                if closure.iter().any(|s| s.name == extension_spec.name) {
                    return Err(Error::activation(format!(
                        "cannot deactivate '{}': '{}' depends on it",
                        extension_spec.name, other_spec.name
                    )));
                }
            }
        }

        let recipe = self
            .services
            .repo
            .recipe(&extension_spec.name)
            .ok_or_else(|| Error::install(format!("package '{}' declares no install method", extension_spec.name)))?;

        let extension_prefix = self.services.layout.path_for_spec(extension_spec);
        let host_prefix = self.services.layout.path_for_spec(host_spec);
        recipe.deactivate(&extension_prefix, &host_prefix)?;
        self.services.layout.remove_extension(host_spec, &extension_spec.name)
    }
}

fn populate_stub_tree(prefix: &Path) -> Result<()> {
    let bin = prefix.join("bin");
    std::fs::create_dir_all(&bin).map_err(|e| Error::io(bin.clone(), e))?;
    std::fs::write(bin.join("fake"), b"").map_err(|e| Error::io(bin.join("fake"), e))?;

    let lib = prefix.join("lib");
    std::fs::create_dir_all(&lib).map_err(|e| Error::io(lib, e))?;

    let man1 = prefix.join("man1");
    std::fs::create_dir_all(&man1).map_err(|e| Error::io(man1, e))?;

    Ok(())
}
