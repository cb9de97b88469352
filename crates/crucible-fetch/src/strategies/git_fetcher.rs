//! `git` fetch strategy: shells out to the system `git` binary for clone + ref checkout.
//! Cloning and arbitrary-ref checkout are external-tool operations here, not a reimplemented
//! VCS client (DESIGN.md: VCS folded into `crucible-fetch` as one strategy among several).

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use url::Url;

use crucible_core::{Error, Result};

use super::{FetchOutcome, Fetcher};
use crate::source::SourceType;

#[derive(Debug, Clone)]
pub struct GitFetcher {
    pub url: Url,
    pub reference: String,
}

impl GitFetcher {
    pub fn new(url: Url, reference: impl Into<String>) -> Self {
        Self {
            url,
            reference: reference.into(),
        }
    }

    fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .map_err(|e| Error::fetch_with_source(format!("failed to run git {args:?}"), e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::fetch(format!("git {args:?} failed: {stderr}")));
        }
        Ok(())
    }
}

impl Fetcher for GitFetcher {
    fn source_type(&self) -> SourceType {
        SourceType::Git
    }

    fn fetch(&self, dest: &Path) -> Result<FetchOutcome> {
        let start = Instant::now();

        self.run(
            &["clone", "--quiet", self.url.as_str(), &dest.to_string_lossy()],
            None,
        )?;
        self.run(&["checkout", "--quiet", &self.reference], Some(dest))?;

        let bytes = dir_size(dest);
        Ok(FetchOutcome {
            bytes,
            elapsed: start.elapsed(),
        })
    }
}

fn dir_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_is_git() {
        let fetcher = GitFetcher::new(Url::parse("https://example.com/repo.git").unwrap(), "main");
        assert_eq!(fetcher.source_type(), SourceType::Git);
    }
}
