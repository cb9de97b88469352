//! The recipe-level data model: a [`Package`] binds a name to version metadata,
//! patches, resources, dependency constraints, extension relationships, and policy flags. The
//! core reads and validates this shape; the actual recipe logic (install/patch/activate
//! operations) is a capability the repository collaborator resolves to, out of scope here.

use std::collections::BTreeMap;

use crate::version::Version;

/// Per-version metadata: at minimum a checksum, optionally an explicit URL or alternate
/// fetch descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMetadata {
    pub checksum: Option<String>,
    pub url: Option<String>,
    pub fetch_descriptor: Option<String>,
}

impl VersionMetadata {
    pub fn new() -> Self {
        Self {
            checksum: None,
            url: None,
            fetch_descriptor: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl Default for VersionMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a patch's unified-diff body comes from: an external file on disk, or an inline body
/// carried by the recipe itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource {
    File(std::path::PathBuf),
    Inline(String),
}

/// A single patch: a stable identifier plus the operation that applies it. The apply
/// operation itself (reading and applying a unified diff, or invoking a recipe hook) lives in
/// `crucible-patch`; this is just the descriptor the package declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub id: String,
    pub source: PatchSource,
}

impl PatchDescriptor {
    pub fn new(id: impl Into<String>, path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            id: id.into(),
            source: PatchSource::File(path.into()),
        }
    }

    pub fn inline(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: PatchSource::Inline(body.into()),
        }
    }
}

/// An additional fetchable artifact staged alongside the root archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub fetcher_url: String,
    pub destination: std::path::PathBuf,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        fetcher_url: impl Into<String>,
        destination: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            fetcher_url: fetcher_url.into(),
            destination: destination.into(),
        }
    }
}

/// Which host package this package extends, and under what spec-constraint plus options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extendee {
    pub host_name: String,
    pub constraint: String,
    pub options: BTreeMap<String, String>,
}

/// A spec-constraint key: patches and resources are keyed by the constraint string a spec
/// must satisfy for that entry to apply. Kept as a plain string because constraint
/// satisfaction is the (out-of-scope) solver's concern; the core just preserves declaration
/// order per constraint.
pub type Constraint = String;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Package {
    pub name: String,
    pub versions: BTreeMap<Version, VersionMetadata>,
    pub default_url: Option<String>,
    pub patches: BTreeMap<Constraint, Vec<PatchDescriptor>>,
    pub resources: BTreeMap<Constraint, Vec<Resource>>,
    pub dependencies: BTreeMap<String, Constraint>,
    pub extendees: Vec<Extendee>,
    pub provides: Vec<String>,
    pub parallel: bool,
    pub make_jobs: Option<u32>,
    pub extendable: bool,
    pub sanity_check_is_file: Vec<std::path::PathBuf>,
    pub sanity_check_is_dir: Vec<std::path::PathBuf>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: BTreeMap::new(),
            default_url: None,
            patches: BTreeMap::new(),
            resources: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            extendees: Vec::new(),
            provides: Vec::new(),
            parallel: true,
            make_jobs: None,
            extendable: false,
            sanity_check_is_file: Vec::new(),
            sanity_check_is_dir: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<Version>, meta: VersionMetadata) -> Self {
        self.versions.insert(version.into(), meta);
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, constraint: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), constraint.into());
        self
    }

    pub fn with_patch(mut self, constraint: impl Into<String>, patch: PatchDescriptor) -> Self {
        self.patches.entry(constraint.into()).or_default().push(patch);
        self
    }

    pub fn with_resource(mut self, constraint: impl Into<String>, resource: Resource) -> Self {
        self.resources
            .entry(constraint.into())
            .or_default()
            .push(resource);
        self
    }

    pub fn with_extendee(mut self, extendee: Extendee) -> Self {
        self.extendees.push(extendee);
        self
    }

    /// Whether this package declares itself as an extension of some host. assumes at most one extendee is active at a time.
    pub fn is_extension(&self) -> bool {
        !self.extendees.is_empty()
    }

    pub fn active_extendee(&self) -> Option<&Extendee> {
        self.extendees.first()
    }

    /// Whether `parallel=false` on the package composes with a call-site override by taking
    /// the call-site value.
    pub fn effective_parallel(&self, call_site_override: Option<bool>) -> bool {
        call_site_override.unwrap_or(self.parallel)
    }

    /// Patches applicable to the given set of satisfied constraints, in declaration order
    /// (constraint-declaration, within-list) per ordering contract.
    pub fn applicable_patches<'a>(&'a self, satisfied: &[&str]) -> Vec<&'a PatchDescriptor> {
        let mut out = Vec::new();
        for constraint in satisfied {
            if let Some(list) = self.patches.get(*constraint) {
                out.extend(list.iter());
            }
        }
        out
    }

    /// Resources applicable to the given set of satisfied constraints, root-first ordering is
    /// handled by the fetcher composite; this just preserves declared per-constraint order.
    pub fn applicable_resources<'a>(&'a self, satisfied: &[&str]) -> Vec<&'a Resource> {
        let mut out = Vec::new();
        for constraint in satisfied {
            if let Some(list) = self.resources.get(*constraint) {
                out.extend(list.iter());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_parallel_prefers_call_site_override() {
        let mut pkg = Package::new("zlib");
        pkg.parallel = false;
        assert!(pkg.effective_parallel(Some(true)));
        assert!(!pkg.effective_parallel(None));
    }

    #[test]
    fn is_extension_reflects_extendees() {
        let pkg = Package::new("python-numpy").with_extendee(Extendee {
            host_name: "python".into(),
            constraint: "@3:".into(),
            options: BTreeMap::new(),
        });
        assert!(pkg.is_extension());
        assert_eq!(pkg.active_extendee().unwrap().host_name, "python");
    }

    #[test]
    fn applicable_patches_preserve_declaration_order() {
        let pkg = Package::new("foo")
            .with_patch("@1:", PatchDescriptor::new("p1", "patches/p1.diff"))
            .with_patch("@1:", PatchDescriptor::new("p2", "patches/p2.diff"))
            .with_patch("@2:", PatchDescriptor::new("p3", "patches/p3.diff"));

        let applicable = pkg.applicable_patches(&["@1:", "@2:"]);
        let ids: Vec<&str> = applicable.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }
}
