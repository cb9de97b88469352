//! The fetch strategy factory ("Fetch strategy factory: `for_package_version(pkg,
//! version) → Fetcher`"'s "concrete fetch strategies provided"). A reference
//! implementation concrete enough to exercise the lifecycle driver end-to-end: given a
//! package's declared version metadata and resources, builds the root fetcher (URL scheme
//! dispatch to [`UrlFetcher`]/[`GitFetcher`]/[`PathFetcher`]) plus one fetcher per applicable
//! resource, in declaration order, wrapped in a [`FetcherComposite`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use crucible_core::{Error, Package, Resource, Result, Spec, Version};
use url::Url;

use crate::composite::{FetchEntry, FetcherComposite};
use crate::strategies::{Fetcher, GitFetcher, PathFetcher, UrlFetcher};
use crate::url_resolver::UrlResolver;

/// Produces a [`FetcherComposite`] for a package+spec, resolving the root artifact's URL via
/// the nearest-version rule when the requested version has no explicit URL on record.
pub trait FetchFactory: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns [`crucible_core::Error::no_url`] if no URL can be resolved for the requested
    /// version, or [`crucible_core::Error::fetch`] if a declared resource's URL is malformed.
    fn composite_for(&self, package: &Package, spec: &Spec, satisfied_constraints: &[&str]) -> Result<FetcherComposite>;
}

fn version_url_table(package: &Package) -> BTreeMap<Version, String> {
    package
        .versions
        .iter()
        .filter_map(|(v, meta)| meta.url.clone().map(|u| (v.clone(), u)))
        .collect()
}

/// Dispatches a location string to a concrete [`Fetcher`] by scheme: `git` to [`GitFetcher`],
/// a bare filesystem path (no recognized URL scheme) to [`PathFetcher`], everything else
/// (http/https/ftp/file) to [`UrlFetcher`]. `checksum_required` only affects the `UrlFetcher`
/// case, mirroring `Settings::checksum_required` (§4.3/§7/§8 scenario 6).
fn build_fetcher(location: &str, checksum: Option<String>, checksum_required: bool) -> Result<Box<dyn Fetcher>> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "git" => Ok(Box::new(GitFetcher::new(url, "main"))),
        Ok(url) if url.scheme() == "file" => {
            let path = url.to_file_path().map_err(|_| Error::fetch(format!("invalid file URL: {location}")))?;
            Ok(Box::new(PathFetcher::new(path, false)))
        }
        Ok(url) => Ok(Box::new(UrlFetcher::new(url, checksum).with_checksum_policy(checksum_required))),
        Err(_) => Ok(Box::new(PathFetcher::new(PathBuf::from(location), false))),
    }
}

fn entry_for(label: impl Into<String>, location: &str, checksum: Option<String>, destination: PathBuf) -> Result<FetchEntry> {
    let fetcher = build_fetcher(location, checksum, true)?;
    Ok(FetchEntry::new(label, fetcher, destination))
}

fn root_destination(fetcher: &dyn Fetcher, fallback: &str) -> PathBuf {
    PathBuf::from(fetcher.suggested_filename().unwrap_or_else(|| fallback.to_string()))
}

/// The reference `FetchFactory`: resolves the
/// root URL from `package.versions`/`default_url` via [`UrlResolver`], then adds one resource
/// fetcher per [`Resource`] applicable under `satisfied_constraints`, destined at the path it
/// declares relative to the stage root. `checksum_required` is [`Settings::checksum_required`]
/// threaded through from the CLI/config layer; resources carry no checksum in this engine's
/// data model (§3) so the policy only gates the root artifact.
#[derive(Debug)]
pub struct DefaultFetchFactory {
    checksum_required: bool,
}

impl Default for DefaultFetchFactory {
    fn default() -> Self {
        Self { checksum_required: true }
    }
}

impl DefaultFetchFactory {
    #[must_use]
    pub fn new(checksum_required: bool) -> Self {
        Self { checksum_required }
    }
}

impl FetchFactory for DefaultFetchFactory {
    fn composite_for(&self, package: &Package, spec: &Spec, satisfied_constraints: &[&str]) -> Result<FetcherComposite> {
        let meta = package.versions.get(&spec.version);
        let checksum = meta.and_then(|m| m.checksum.clone());

        let location = if let Some(url) = meta.and_then(|m| m.url.clone()) {
            url
        } else {
            let table = version_url_table(package);
            let resolver = UrlResolver::new(&package.name, &table, package.default_url.as_deref());
            resolver.url_for_version(&spec.version, spec.version.as_str())?
        };

        let root_fetcher = build_fetcher(&location, checksum, self.checksum_required)?;
        let root_destination = root_destination(root_fetcher.as_ref(), "root-archive");
        let mut composite = FetcherComposite::new(FetchEntry::new("root", root_fetcher, root_destination));

        for resource in package.applicable_resources(satisfied_constraints) {
            let entry = resource_entry(resource)?;
            composite = composite.with_resource(entry);
        }

        Ok(composite)
    }
}

fn resource_entry(resource: &Resource) -> Result<FetchEntry> {
    entry_for(resource.name.clone(), &resource.fetcher_url, None, resource.destination.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::VersionMetadata;

    fn pkg_with_url(version: &str, url: &str) -> Package {
        Package::new("zlib").with_version(version, VersionMetadata::new().with_url(url))
    }

    #[test]
    fn exact_version_url_is_used_directly() {
        let pkg = pkg_with_url("1.2.13", "https://example.com/zlib-1.2.13.tar.gz");
        let spec = Spec::new("zlib", "1.2.13", "hash");
        let composite = DefaultFetchFactory::default().composite_for(&pkg, &spec, &[]).unwrap();
        assert_eq!(composite.len(), 1);
    }

    #[test]
    fn missing_version_fails_with_no_url_when_table_and_default_are_empty() {
        let pkg = Package::new("zlib");
        let spec = Spec::new("zlib", "9.9.9", "hash");
        let err = DefaultFetchFactory::default().composite_for(&pkg, &spec, &[]).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::NoUrl);
    }

    #[test]
    fn applicable_resources_are_added_after_the_root() {
        let pkg = pkg_with_url("1.0", "https://example.com/root.tar.gz").with_resource(
            "@all",
            Resource::new("patchset", "https://example.com/patchset.tar.gz", "resources/patchset"),
        );
        let spec = Spec::new("zlib", "1.0", "hash");
        let composite = DefaultFetchFactory::default().composite_for(&pkg, &spec, &["@all"]).unwrap();
        assert_eq!(composite.len(), 2);
    }

    #[test]
    fn unrecognized_scheme_falls_back_to_a_bare_path_fetcher() {
        let location = "/opt/vendor/zlib-1.0.tar.gz";
        let fetcher = build_fetcher(location, None, true).unwrap();
        assert_eq!(fetcher.source_type(), crate::source::SourceType::Path);
    }
}
