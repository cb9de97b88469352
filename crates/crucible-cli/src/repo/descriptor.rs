//! On-disk schema for a recipe and a concrete spec (`<name>.json`), the two file kinds
//! [`super::FileRepository`] reads. Neither `crucible_core::Package` nor `crucible_core::Spec`
//! derives `serde::Deserialize`, so this module is the thin translation layer between what a
//! real solver/repository would hand the driver and what a human can write by hand for this
//! reference `Repository` implementation. Grounded on `crucible-config::settings`'s own
//! partial-then-resolved split (a plain, fully-`serde` "file shape" converted into the crate's
//! real domain type).

use std::collections::BTreeMap;
use std::path::PathBuf;

use crucible_core::package::{Constraint, Extendee, PatchDescriptor, Resource, VersionMetadata};
use crucible_core::spec::DependencyKind;
use crucible_core::{Error, Package, Result, Spec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionMetadataFile {
    pub checksum: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchFile {
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceFile {
    pub name: String,
    pub url: String,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendeeFile {
    pub host: String,
    #[serde(default)]
    pub constraint: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// One declared build phase: which
/// [`crucible_lifecycle::build_env::BuildContext`] method to call and the extra arguments to
/// pass it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseFile {
    Configure { args: Vec<String> },
    Make { args: Vec<String> },
    Cmake { args: Vec<String> },
    Run { program: String, args: Vec<String> },
}

/// The file shape of a [`Package`] plus its build recipe, one JSON document per package name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    #[serde(default)]
    pub default_url: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionMetadataFile>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub patches: BTreeMap<String, Vec<PatchFile>>,
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<ResourceFile>>,
    #[serde(default)]
    pub extendee: Option<ExtendeeFile>,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub make_jobs: Option<u32>,
    #[serde(default)]
    pub extendable: bool,
    #[serde(default)]
    pub sanity_check_is_file: Vec<PathBuf>,
    #[serde(default)]
    pub sanity_check_is_dir: Vec<PathBuf>,
    /// Relative to the staged source root, the single file this package's patches rewrite.
    #[serde(default)]
    pub patch_target: PathBuf,
    #[serde(default)]
    pub phases: Vec<PhaseFile>,
}

const fn default_true() -> bool {
    true
}

impl PackageDescriptor {
    /// Converts this file shape into the real [`Package`] the core/lifecycle crates operate
    /// on. The recipe dir `base` resolves patch file paths declared relative to it.
    pub fn into_package(self, base: &std::path::Path) -> Result<Package> {
        let mut package = Package::new(self.name);
        package.default_url = self.default_url;
        package.provides = self.provides;
        package.parallel = self.parallel;
        package.make_jobs = self.make_jobs;
        package.extendable = self.extendable;
        package.sanity_check_is_file = self.sanity_check_is_file;
        package.sanity_check_is_dir = self.sanity_check_is_dir;

        for (version, meta) in self.versions {
            let mut vm = VersionMetadata::new();
            vm.checksum = meta.checksum;
            vm.url = meta.url;
            package.versions.insert(version.into(), vm);
        }

        for (name, constraint) in self.dependencies {
            package.dependencies.insert(name, constraint);
        }

        for (constraint, patches) in self.patches {
            let entry: &mut Vec<PatchDescriptor> = package.patches.entry(constraint as Constraint).or_default();
            for patch in patches {
                let path = if patch.path.is_absolute() {
                    patch.path
                } else {
                    base.join(&patch.path)
                };
                entry.push(PatchDescriptor::new(patch.id, path));
            }
        }

        for (constraint, resources) in self.resources {
            let entry = package.resources.entry(constraint as Constraint).or_default();
            for resource in resources {
                entry.push(Resource::new(resource.name, resource.url, resource.destination));
            }
        }

        if let Some(extendee) = self.extendee {
            package.extendees.push(Extendee {
                host_name: extendee.host,
                constraint: extendee.constraint,
                options: extendee.options,
            });
        }

        Ok(package)
    }
}

/// The file shape of a concrete [`Spec`]. Produced here by hand in place of the
/// out-of-scope solver; a real deployment would have the solver emit this shape (or an
/// equivalent) instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecFile {
    pub name: String,
    pub version: String,
    pub dag_hash: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdgeFile>,
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdgeFile {
    pub name: String,
    #[serde(default)]
    pub virtual_dep: bool,
}

impl SpecFile {
    pub fn into_spec(self) -> Spec {
        let mut spec = Spec::new(self.name, self.version, self.dag_hash).with_external(self.external);
        for dep in self.dependencies {
            let kind = if dep.virtual_dep { DependencyKind::Virtual } else { DependencyKind::Real };
            spec = spec.with_dependency(dep.name, kind);
        }
        spec
    }
}

pub fn load_package_descriptor(path: &std::path::Path) -> Result<PackageDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path.to_path_buf(), e))?;
    crucible_core::json::from_json(&content)
}

pub fn load_spec_file(path: &std::path::Path) -> Result<SpecFile> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path.to_path_buf(), e))?;
    crucible_core::json::from_json(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_descriptor_round_trips_patch_paths_relative_to_base() {
        let descriptor = PackageDescriptor {
            name: "zlib".into(),
            patches: BTreeMap::from([(
                "@all".to_string(),
                vec![PatchFile {
                    id: "fix".into(),
                    path: PathBuf::from("patches/fix.diff"),
                }],
            )]),
            ..Default::default()
        };
        let package = descriptor.into_package(std::path::Path::new("/recipes/zlib")).unwrap();
        let patch = &package.patches["@all"][0];
        assert_eq!(patch.id, "fix");
        match &patch.source {
            crucible_core::PatchSource::File(p) => assert_eq!(p, std::path::Path::new("/recipes/zlib/patches/fix.diff")),
            crucible_core::PatchSource::Inline(_) => panic!("expected file patch"),
        }
    }

    #[test]
    fn spec_file_converts_dependency_kinds() {
        let spec_file = SpecFile {
            name: "app".into(),
            version: "1.0".into(),
            dag_hash: "hash".into(),
            dependencies: vec![
                DependencyEdgeFile { name: "real-dep".into(), virtual_dep: false },
                DependencyEdgeFile { name: "virt-dep".into(), virtual_dep: true },
            ],
            external: false,
        };
        let spec = spec_file.into_spec();
        assert_eq!(spec.direct_dependency_names(false), vec!["real-dep"]);
        assert_eq!(spec.direct_dependency_names(true), vec!["real-dep", "virt-dep"]);
    }
}
