//! URL nearest-version resolution, ported from the original `package.py`'s
//! `version_urls`/`nearest_url`/`url_for_version`.
//!
//! Given a requested version and a table of explicitly-URL'd versions, picks the URL for the
//! exact version if present, else the nearest lower version with a URL, else the package
//! default, else the next higher URL'd version, else fails.

use std::collections::BTreeMap;

use crucible_core::{Error, Result, Version};

/// A template URL with a `{version}` token substituted at resolution time (:
/// "substitute the version token in the template with the package's `url_version(v)`").
fn substitute_version(template: &str, version_token: &str) -> String {
    if template.contains("{version}") {
        template.replace("{version}", version_token)
    } else {
        template.to_string()
    }
}

/// Resolves a download URL for a requested version against a package's explicitly-declared
/// per-version URLs and an optional default URL template.
#[derive(Debug, Clone)]
pub struct UrlResolver<'a> {
    package_name: &'a str,
    version_urls: &'a BTreeMap<Version, String>,
    default_url: Option<&'a str>,
}

impl<'a> UrlResolver<'a> {
    pub fn new(
        package_name: &'a str,
        version_urls: &'a BTreeMap<Version, String>,
        default_url: Option<&'a str>,
    ) -> Self {
        Self {
            package_name,
            version_urls,
            default_url,
        }
    }

    /// Finds the URL for the nearest lower version with a URL; falls back to the package's
    /// default URL, then to the next higher URL'd version (spec's `nearest_url`).
    fn nearest_url(&self, version: &Version) -> Option<&'a str> {
        let mut candidate = self.default_url;
        for (v, url) in self.version_urls {
            if v > version && candidate.is_some() {
                break;
            }
            candidate = Some(url.as_str());
        }
        candidate
    }

    /// Resolves the URL to fetch `version` from, applying the nearest-version rule and
    /// version-token substitution (spec's `url_for_version`).
    pub fn url_for_version(&self, version: &Version, url_version_token: &str) -> Result<String> {
        if let Some(url) = self.version_urls.get(version) {
            return Ok(url.clone());
        }

        if self.version_urls.is_empty() && self.default_url.is_none() {
            return Err(Error::no_url(self.package_name, version.as_str()));
        }

        let template = self
            .nearest_url(version)
            .ok_or_else(|| Error::no_url(self.package_name, version.as_str()))?;

        Ok(substitute_version(template, url_version_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BTreeMap<Version, String> {
        let mut m = BTreeMap::new();
        m.insert(Version::new("1.0"), "https://example.com/v1.0.tar.gz".to_string());
        m.insert(Version::new("3.0"), "https://example.com/v3.0.tar.gz".to_string());
        m
    }

    #[test]
    fn exact_match_wins() {
        let urls = table();
        let resolver = UrlResolver::new("pkg", &urls, Some("https://example.com/default.tar.gz"));
        let url = resolver.url_for_version(&Version::new("1.0"), "1.0").unwrap();
        assert_eq!(url, "https://example.com/v1.0.tar.gz");
    }

    #[test]
    fn nearest_lower_version_used_between_entries() {
        let urls = table();
        let resolver = UrlResolver::new("pkg", &urls, Some("https://example.com/default.tar.gz"));
        let url = resolver.url_for_version(&Version::new("2.0"), "2.0").unwrap();
        assert_eq!(url, "https://example.com/v1.0.tar.gz");
    }

    #[test]
    fn default_used_below_lowest_entry() {
        let urls = table();
        let resolver = UrlResolver::new("pkg", &urls, Some("https://example.com/default.tar.gz"));
        let url = resolver.url_for_version(&Version::new("0.5"), "0.5").unwrap();
        assert_eq!(url, "https://example.com/default.tar.gz");
    }

    #[test]
    fn falls_back_to_next_higher_when_no_default() {
        let urls = table();
        let resolver = UrlResolver::new("pkg", &urls, None);
        let url = resolver.url_for_version(&Version::new("0.5"), "0.5").unwrap();
        assert_eq!(url, "https://example.com/v1.0.tar.gz");
    }

    #[test]
    fn above_highest_entry_uses_highest() {
        let urls = table();
        let resolver = UrlResolver::new("pkg", &urls, Some("https://example.com/default.tar.gz"));
        let url = resolver.url_for_version(&Version::new("4.0"), "4.0").unwrap();
        assert_eq!(url, "https://example.com/v3.0.tar.gz");
    }

    #[test]
    fn empty_table_and_no_default_fails() {
        let urls = BTreeMap::new();
        let resolver = UrlResolver::new("pkg", &urls, None);
        let err = resolver.url_for_version(&Version::new("1.0"), "1.0").unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::NoUrl);
    }

    #[test]
    fn version_token_is_substituted_into_template() {
        let mut urls = BTreeMap::new();
        urls.insert(Version::new("1.0"), "https://example.com/{version}/pkg.tar.gz".to_string());
        let resolver = UrlResolver::new("pkg", &urls, None);
        let url = resolver.url_for_version(&Version::new("2.0"), "2_0").unwrap();
        assert_eq!(url, "https://example.com/2_0/pkg.tar.gz");
    }

    proptest::proptest! {
        #[test]
        fn resolver_never_panics(requested in "[0-9]{1,2}\\.[0-9]{1,2}") {
            let urls = table();
            let resolver = UrlResolver::new("pkg", &urls, Some("https://example.com/default.tar.gz"));
            let _ = resolver.url_for_version(&Version::new(requested), "x");
        }
    }
}
