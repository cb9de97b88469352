//! The allowed-archive predicate used by URL validation. Extraction itself lives in `crucible-stage`; this is
//! just the recognizability check a fetch strategy needs before it starts a download.

use url::Url;

const ALLOWED_EXTENSIONS: &[&str] = &[
    ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz", ".tar", ".zip",
];

/// Returns the matched extension if the URL's path ends in a recognized archive extension.
#[must_use]
pub fn from_url(url: &Url) -> Option<&'static str> {
    let path = url.path().to_lowercase();
    ALLOWED_EXTENSIONS.iter().find(|ext| path.ends_with(**ext)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_archive_extensions() {
        for (path, expected) in [
            ("https://x/pkg.tar.gz", Some(".tar.gz")),
            ("https://x/pkg.tgz", Some(".tgz")),
            ("https://x/pkg.zip", Some(".zip")),
            ("https://x/pkg.tar.bz2", Some(".tar.bz2")),
            ("https://x/pkg.exe", None),
        ] {
            let url = Url::parse(path).unwrap();
            assert_eq!(from_url(&url), expected, "{path}");
        }
    }
}
