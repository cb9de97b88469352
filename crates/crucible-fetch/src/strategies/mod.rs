//! Concrete fetch strategies: URL, git, and local-path. Each reports bytes
//! transferred and elapsed time so the driver can log it.

mod git_fetcher;
mod path_fetcher;
mod url_fetcher;

pub use git_fetcher::GitFetcher;
pub use path_fetcher::PathFetcher;
pub use url_fetcher::UrlFetcher;

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use crucible_core::Result;

use crate::source::SourceType;

/// Outcome of a single fetch: how much data moved and how long it took, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    pub bytes: u64,
    pub elapsed: Duration,
}

/// A strategy that can deposit an artifact at a destination path. `fetch` downloads (or
/// copies/clones) into `dest`; callers are responsible for archive expansion afterwards
///.
pub trait Fetcher: Debug {
    fn source_type(&self) -> SourceType;

    /// # Errors
    /// Returns [`crucible_core::Error::fetch`] on any network, VCS, or filesystem failure.
    fn fetch(&self, dest: &Path) -> Result<FetchOutcome>;

    /// The archive filename this fetcher's own source implies, if any (e.g. the last path
    /// segment of a URL), used by the stage composite to name the copy it keeps inside
    /// the stage root. `None` when the source carries no such hint (git, directory sources).
    fn suggested_filename(&self) -> Option<String> {
        None
    }
}
