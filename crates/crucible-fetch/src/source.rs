//! Fetch source types.
//!
//! Three strategies: URL (http/https/ftp/file), git (VCS, folded in as one strategy rather
//! than a first-class subsystem per DESIGN.md), and a local path (vendored/offline sources).

use std::path::PathBuf;

use url::Url;

use crucible_core::{Error, Result};

const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "ftp", "file", "git"];

/// Which fetch strategy a [`Source`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Url,
    Git,
    Path,
}

/// A single fetchable location, produced by the (out-of-scope) fetch strategy factory for a
/// package+version, or directly for a declared resource.
#[derive(Debug, Clone)]
pub enum Source {
    Url {
        url: Url,
        checksum: Option<String>,
    },
    Git {
        url: Url,
        reference: String,
    },
    Path {
        path: PathBuf,
        symlink: bool,
    },
}

impl Source {
    pub fn url(url: Url, checksum: Option<String>) -> Self {
        Self::Url { url, checksum }
    }

    pub fn git(url: Url, reference: impl Into<String>) -> Self {
        Self::Git {
            url,
            reference: reference.into(),
        }
    }

    pub fn path(path: impl Into<PathBuf>, symlink: bool) -> Self {
        Self::Path {
            path: path.into(),
            symlink,
        }
    }

    pub const fn source_type(&self) -> SourceType {
        match self {
            Self::Url { .. } => SourceType::Url,
            Self::Git { .. } => SourceType::Git,
            Self::Path { .. } => SourceType::Path,
        }
    }
}

/// Validates that a URL's scheme is one of the allowed schemes and that its final
/// path segment matches a recognized archive extension. Mirrors the source's
/// `validate_package_url`.
///
/// # Errors
/// Returns a [`crucible_core::Error::fetch`] if the scheme is disallowed or the archive
/// extension is unrecognized.
pub fn validate_package_url(url_string: &str) -> Result<Url> {
    let url = Url::parse(url_string)
        .map_err(|e| Error::fetch_with_source(format!("invalid URL: {url_string}"), e))?;

    if !ALLOWED_URL_SCHEMES.contains(&url.scheme()) {
        return Err(Error::fetch(format!(
            "invalid protocol in URL: {url_string} (scheme {})",
            url.scheme()
        )));
    }

    if url.scheme() != "git" && crate::archive::from_url(&url).is_none() {
        return Err(Error::fetch(format!("invalid file type in URL: {url_string}")));
    }

    Ok(url)
}
