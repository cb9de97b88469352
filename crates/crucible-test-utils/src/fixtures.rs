//! Pre-built [`Package`]/[`Spec`] pairs for common lifecycle-driver test scenarios: one
//! zero-argument constructor per scenario instead of ad hoc literals repeated across test files.

use crucible_core::package::{Extendee, VersionMetadata};
use crucible_core::spec::DependencyKind;
use crucible_core::{Package, Spec};

/// Collection of pre-built test fixtures.
#[derive(Debug)]
pub struct Fixtures;

impl Fixtures {
    /// A leaf package with a single resolvable version and no dependencies.
    #[must_use]
    pub fn leaf_package(name: &str) -> Package {
        Package::new(name).with_version("1.0.0", VersionMetadata::new().with_url(format!("https://example.com/{name}-1.0.0.tar.gz")))
    }

    #[must_use]
    pub fn leaf_spec(name: &str) -> Spec {
        Spec::new(name, "1.0.0", format!("hash-{name}"))
    }

    /// A package depending on one other, real (non-virtual) dependency.
    #[must_use]
    pub fn package_with_dependency(name: &str, dep_name: &str) -> Package {
        Self::leaf_package(name).with_dependency(dep_name, "@1:")
    }

    #[must_use]
    pub fn spec_with_dependency(name: &str, dep_name: &str) -> Spec {
        Self::leaf_spec(name).with_dependency(dep_name, DependencyKind::Real)
    }

    /// An extendable host package (e.g. a language runtime extensions plug into).
    #[must_use]
    pub fn extendable_host(name: &str) -> Package {
        let mut pkg = Self::leaf_package(name);
        pkg.extendable = true;
        pkg
    }

    /// An extension package declaring `host_name` as its single extendee.
    #[must_use]
    pub fn extension_package(name: &str, host_name: &str) -> Package {
        Self::leaf_package(name).with_extendee(Extendee {
            host_name: host_name.to_string(),
            constraint: "@1:".to_string(),
            options: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_package_has_one_resolvable_version() {
        let pkg = Fixtures::leaf_package("zlib");
        assert_eq!(pkg.versions.len(), 1);
    }

    #[test]
    fn extension_package_names_its_host() {
        let ext = Fixtures::extension_package("python-numpy", "python");
        assert_eq!(ext.active_extendee().unwrap().host_name, "python");
    }
}
