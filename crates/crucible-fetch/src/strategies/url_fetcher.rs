//! HTTP(S)/FTP/file URL fetch strategy: streams the remote archive to a mirror cache file and
//! verifies its checksum when one is on record.

use std::fs::File;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::Instant;

use sha2::{Digest, Sha256};
use url::Url;

use crucible_core::{Error, Result};

use super::{FetchOutcome, Fetcher};
use crate::source::SourceType;

#[derive(Debug, Clone)]
pub struct UrlFetcher {
    pub url: Url,
    pub checksum: Option<String>,
    /// Whether a missing checksum is tolerated. When `true` and no checksum is on record,
    /// an interactive session is prompted to continue; a non-interactive session fails fast
    /// before any network I/O (§7/§8 scenario 6). Defaults to `true` via [`Self::new`];
    /// [`Self::with_checksum_policy`] lets the factory wire `Settings::checksum_required`.
    pub checksum_required: bool,
}

impl UrlFetcher {
    pub fn new(url: Url, checksum: Option<String>) -> Self {
        Self { url, checksum, checksum_required: true }
    }

    #[must_use]
    pub fn with_checksum_policy(mut self, checksum_required: bool) -> Self {
        self.checksum_required = checksum_required;
        self
    }

    /// Fails fast, before any network I/O, when the checksum policy requires one and none is
    /// on record and the session is non-interactive. An interactive session is prompted on
    /// stderr instead and may proceed on an explicit "yes".
    fn enforce_checksum_policy(&self) -> Result<()> {
        if self.checksum.is_some() || !self.checksum_required {
            return Ok(());
        }

        if !std::io::stdin().is_terminal() {
            return Err(Error::fetch(format!(
                "no checksum on record for {} and none provided; refusing non-interactive fetch \
                 (pass a checksum policy override to bypass)",
                self.url
            )));
        }

        eprint!("no checksum on record for {}; fetch anyway? [y/N] ", self.url);
        std::io::Write::flush(&mut std::io::stderr()).ok();
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .map_err(|e| Error::io(Path::new("<stdin>"), e))?;
        if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            Ok(())
        } else {
            Err(Error::fetch(format!("checksum-absent fetch of {} declined", self.url)))
        }
    }

    fn verify(&self, dest: &Path) -> Result<()> {
        let Some(expected) = &self.checksum else {
            return Ok(());
        };
        let bytes = std::fs::read(dest).map_err(|e| Error::io(dest, e))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());
        if &digest != expected {
            return Err(Error::fetch(format!(
                "checksum mismatch for {}: expected {expected}, got {digest}",
                self.url
            )));
        }
        Ok(())
    }
}

impl Fetcher for UrlFetcher {
    fn source_type(&self) -> SourceType {
        SourceType::Url
    }

    fn suggested_filename(&self) -> Option<String> {
        self.url
            .path_segments()
            .and_then(std::iter::Iterator::last)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }

    fn fetch(&self, dest: &Path) -> Result<FetchOutcome> {
        self.enforce_checksum_policy()?;
        let start = Instant::now();

        if self.url.scheme() == "file" {
            let source_path = self
                .url
                .to_file_path()
                .map_err(|_| Error::fetch(format!("invalid file:// URL: {}", self.url)))?;
            std::fs::copy(&source_path, dest).map_err(|e| Error::io(dest, e))?;
            self.verify(dest)?;
            let bytes = std::fs::metadata(dest).map_err(|e| Error::io(dest, e))?.len();
            return Ok(FetchOutcome {
                bytes,
                elapsed: start.elapsed(),
            });
        }

        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::fetch_with_source("failed to build HTTP client", e))?;

        let mut response = client
            .get(self.url.clone())
            .send()
            .map_err(|e| Error::fetch_with_source(format!("request failed for {}", self.url), e))?;

        if !response.status().is_success() {
            return Err(Error::fetch(format!(
                "fetch of {} failed with status {}",
                self.url,
                response.status()
            )));
        }

        let mut file = File::create(dest).map_err(|e| Error::io(dest, e))?;
        let bytes = std::io::copy(&mut response, &mut file).map_err(|e| Error::io(dest, e))?;
        file.flush().map_err(|e| Error::io(dest, e))?;

        self.verify(dest)?;

        Ok(FetchOutcome {
            bytes,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_scheme_copies_and_verifies_checksum() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("archive.tar.gz");
        std::fs::write(&source, b"hello world").unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"hello world");
        let checksum = hex::encode(hasher.finalize());

        let url = Url::from_file_path(&source).unwrap();
        let fetcher = UrlFetcher::new(url, Some(checksum));
        let dest = tmp.path().join("dest.tar.gz");
        let outcome = fetcher.fetch(&dest).unwrap();
        assert_eq!(outcome.bytes, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    }

    #[test]
    fn checksum_mismatch_is_a_fetch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("archive.tar.gz");
        std::fs::write(&source, b"hello world").unwrap();

        let url = Url::from_file_path(&source).unwrap();
        let fetcher = UrlFetcher::new(url, Some("deadbeef".to_string()));
        let dest = tmp.path().join("dest.tar.gz");
        let err = fetcher.fetch(&dest).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Fetch);
    }

    #[test]
    fn absent_checksum_fails_fast_non_interactively() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("archive.tar.gz");
        std::fs::write(&source, b"hello world").unwrap();

        let url = Url::from_file_path(&source).unwrap();
        let fetcher = UrlFetcher::new(url, None);
        let dest = tmp.path().join("dest.tar.gz");
        let err = fetcher.fetch(&dest).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Fetch);
        assert!(!dest.exists(), "must fail before any I/O, matching do_fetch's no-check() contract");
    }

    #[test]
    fn absent_checksum_with_policy_disabled_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("archive.tar.gz");
        std::fs::write(&source, b"hello world").unwrap();

        let url = Url::from_file_path(&source).unwrap();
        let fetcher = UrlFetcher::new(url, None).with_checksum_policy(false);
        let dest = tmp.path().join("dest.tar.gz");
        let outcome = fetcher.fetch(&dest).unwrap();
        assert_eq!(outcome.bytes, 11);
    }
}
