//! Provenance snapshotting: for the just-built spec and each dependency node,
//! copy the recipe (here: a generated [`manifest::ProvenanceRecord`]) and patch files into a
//! namespaced directory under the install tree. Grounded directly on Spack's `dump_packages`:
//! the root node's provenance comes from the live/authoritative source, every dependency node's
//! provenance is copied forward from that dependency's own previously-captured snapshot, and a
//! missing dependency snapshot is a warning, never fatal.

pub mod manifest;

use std::path::{Path, PathBuf};

use crucible_core::{Error, Package, Result, Spec};
use manifest::{build_record, ProvenanceRecord};

/// The single namespace this engine's recipes live under. The source supports multiple
/// repositories with distinct namespaces; this engine has one compiled-in repository, so the
/// namespace is fixed rather than threaded through every call site.
pub const NAMESPACE: &str = "builtin";

/// Resolves the package recipe and satisfied constraints for a spec node, so the dumper can
/// build its manifest record without depending on the repository/solver types directly.
pub trait RecipeSource {
    fn package_for(&self, name: &str) -> Option<Package>;
    fn satisfied_constraints(&self, spec: &Spec) -> Vec<String>;
}

/// Locates the directory holding a previously captured snapshot for an already-installed
/// dependency, if one exists.
pub trait DependencyProvenanceLookup {
    fn dependency_provenance_dir(&self, name: &str, version: &str) -> Option<PathBuf>;
}

fn pkg_dir(dest_root: &Path, name: &str) -> PathBuf {
    dest_root.join(NAMESPACE).join("packages").join(name)
}

fn write_manifest(dir: &Path, record: &ProvenanceRecord) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| Error::io(dir.to_path_buf(), source))?;
    let json = crucible_core::json::to_json_pretty(record)?;
    let path = dir.join("manifest.json");
    std::fs::write(&path, json).map_err(|source| Error::io(path, source))
}

fn copy_dir_all(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|source| Error::io(dest.to_path_buf(), source))?;
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::install(format!("walking provenance source failed: {e}")))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir entries are under src");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|source| Error::io(target, source))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|source| Error::io(parent.to_path_buf(), source))?;
            }
            std::fs::copy(entry.path(), &target).map_err(|source| Error::io(target, source))?;
        }
    }
    Ok(())
}

/// Dumps provenance for every node in `traversal` (as produced by
/// `crucible_core::spec::preorder_traversal`) into `dest_root`, treating `traversal[0]` as the
/// root spec per the preorder-traversal contract.
///
/// # Errors
/// Returns an error only if writing the root node's own manifest fails; a missing dependency
/// snapshot is logged as a warning and does not fail the call.
pub fn dump_packages(
    traversal: &[Spec],
    source: &dyn RecipeSource,
    deps: &dyn DependencyProvenanceLookup,
    dest_root: &Path,
) -> Result<()> {
    let Some((root, rest)) = traversal.split_first() else {
        return Ok(());
    };

    dump_root(root, source, dest_root)?;

    for node in rest {
        dump_dependency(node, deps, dest_root);
    }

    Ok(())
}

fn dump_root(root: &Spec, source: &dyn RecipeSource, dest_root: &Path) -> Result<()> {
    let Some(package) = source.package_for(&root.name) else {
        tracing::warn!(package = %root.name, "no recipe found for root spec, skipping provenance dump");
        return Ok(());
    };
    let constraints = source.satisfied_constraints(root);
    let constraints: Vec<&str> = constraints.iter().map(String::as_str).collect();
    let record = build_record(root, &package, &constraints);
    write_manifest(&pkg_dir(dest_root, &root.name), &record)
}

fn dump_dependency(node: &Spec, deps: &dyn DependencyProvenanceLookup, dest_root: &Path) {
    let Some(source_dir) = deps.dependency_provenance_dir(&node.name, node.version.as_str()) else {
        tracing::warn!(
            package = %node.name,
            version = %node.version.as_str(),
            "dependency has no captured provenance, skipping"
        );
        return;
    };

    let dest_dir = pkg_dir(dest_root, &node.name);
    if let Err(e) = copy_dir_all(&source_dir, &dest_dir) {
        tracing::warn!(package = %node.name, error = %e, "copying dependency provenance failed, continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::PatchDescriptor;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct FakeRepo(HashMap<String, Package>);

    impl RecipeSource for FakeRepo {
        fn package_for(&self, name: &str) -> Option<Package> {
            self.0.get(name).cloned()
        }
        fn satisfied_constraints(&self, _spec: &Spec) -> Vec<String> {
            vec!["@all".to_string()]
        }
    }

    struct FakeDepLookup(HashMap<String, PathBuf>);

    impl DependencyProvenanceLookup for FakeDepLookup {
        fn dependency_provenance_dir(&self, name: &str, _version: &str) -> Option<PathBuf> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn root_node_writes_a_manifest_from_the_live_recipe() {
        let dest = tempdir().unwrap();
        let mut pkgs = HashMap::new();
        pkgs.insert(
            "zlib".to_string(),
            Package::new("zlib").with_patch("@all", PatchDescriptor::inline("fix", "diff body")),
        );
        let repo = FakeRepo(pkgs);
        let deps = FakeDepLookup(HashMap::new());

        let root = Spec::new("zlib", "1.2.13", "hash-zlib");
        dump_packages(&[root], &repo, &deps, dest.path()).unwrap();

        let manifest_path = pkg_dir(dest.path(), "zlib").join("manifest.json");
        assert!(manifest_path.exists());
    }

    #[test]
    fn dependency_without_captured_provenance_is_skipped_not_fatal() {
        let dest = tempdir().unwrap();
        let repo = FakeRepo(HashMap::new());
        let deps = FakeDepLookup(HashMap::new());

        let root = Spec::new("app", "1.0", "hash-app")
            .with_dependency("missing-dep", crucible_core::DependencyKind::Real);
        let dep_node = Spec::new("missing-dep", "2.0", "hash-dep");

        dump_packages(&[root, dep_node], &repo, &deps, dest.path()).unwrap();
        assert!(!pkg_dir(dest.path(), "missing-dep").exists());
    }

    #[test]
    fn dependency_with_captured_provenance_is_copied_forward() {
        let dest = tempdir().unwrap();
        let source_snapshot = tempdir().unwrap();
        std::fs::write(source_snapshot.path().join("manifest.json"), "{}").unwrap();

        let repo = FakeRepo(HashMap::new());
        let mut lookup = HashMap::new();
        lookup.insert("curl".to_string(), source_snapshot.path().to_path_buf());
        let deps = FakeDepLookup(lookup);

        let root = Spec::new("app", "1.0", "hash-app").with_dependency("curl", crucible_core::DependencyKind::Real);
        let dep_node = Spec::new("curl", "8.0", "hash-curl");

        dump_packages(&[root, dep_node], &repo, &deps, dest.path()).unwrap();
        assert!(pkg_dir(dest.path(), "curl").join("manifest.json").exists());
    }
}
