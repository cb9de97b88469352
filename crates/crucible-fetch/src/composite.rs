//! Ordered multi-source fetch composite.
//!
//! Produces, for a given package+version, an ordered sequence: a root fetcher (URL, VCS, or
//! local path) followed by one fetcher per declared resource applicable to the current spec.
//! Fetch order is root first (index 0), then resources in declared order, run sequentially
//! since this engine has no intra-spec parallelism.

use std::path::{Path, PathBuf};

use crucible_core::Result;

use crate::strategies::{FetchOutcome, Fetcher};

/// One entry in a [`FetcherComposite`]: a fetcher plus the path (relative to the stage root)
/// it should deposit its artifact at.
pub struct FetchEntry {
    pub label: String,
    pub fetcher: Box<dyn Fetcher>,
    pub destination: PathBuf,
}

impl FetchEntry {
    pub fn new(label: impl Into<String>, fetcher: Box<dyn Fetcher>, destination: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            fetcher,
            destination: destination.into(),
        }
    }
}

/// The outcome of one [`FetchEntry`]'s run, labeled for logging.
#[derive(Debug, Clone)]
pub struct LabeledOutcome {
    pub label: String,
    pub destination: PathBuf,
    pub outcome: FetchOutcome,
}

/// An ordered sequence of fetchers: the root artifact first, then each declared resource.
pub struct FetcherComposite {
    entries: Vec<FetchEntry>,
}

impl FetcherComposite {
    #[must_use]
    pub fn new(root: FetchEntry) -> Self {
        Self { entries: vec![root] }
    }

    #[must_use]
    pub fn with_resource(mut self, entry: FetchEntry) -> Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries' fetchers in declared order (root first), for callers that pair each
    /// fetcher with its own stage slot rather than using [`Self::fetch_all`]'s direct-to-path fetch.
    #[must_use]
    pub fn fetchers(&self) -> Vec<&dyn Fetcher> {
        self.entries.iter().map(|e| e.fetcher.as_ref()).collect()
    }

    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[must_use]
    pub fn destinations(&self) -> Vec<&Path> {
        self.entries.iter().map(|e| e.destination.as_path()).collect()
    }

    /// Runs every entry in declared order against `base_dir`, stopping at the first failure.
    ///
    /// # Errors
    /// Propagates the first entry's fetch error; no further entries run.
    pub fn fetch_all(&self, base_dir: &Path) -> Result<Vec<LabeledOutcome>> {
        let mut outcomes = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let dest = base_dir.join(&entry.destination);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| crucible_core::Error::io(parent, e))?;
            }
            let outcome = entry.fetcher.fetch(&dest)?;
            outcomes.push(LabeledOutcome {
                label: entry.label.clone(),
                destination: entry.destination.clone(),
                outcome,
            });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::PathFetcher;

    #[test]
    fn fetches_root_then_resources_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root_src = tmp.path().join("root.tar.gz");
        std::fs::write(&root_src, b"root").unwrap();
        let res_src = tmp.path().join("patch1.tar.gz");
        std::fs::write(&res_src, b"resource").unwrap();

        let composite = FetcherComposite::new(FetchEntry::new(
            "root",
            Box::new(PathFetcher::new(&root_src, false)),
            "root.tar.gz",
        ))
        .with_resource(FetchEntry::new(
            "patch1",
            Box::new(PathFetcher::new(&res_src, false)),
            "resources/patch1.tar.gz",
        ));

        let stage_dir = tmp.path().join("stage");
        let outcomes = composite.fetch_all(&stage_dir).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].label, "root");
        assert_eq!(outcomes[1].label, "patch1");
        assert!(stage_dir.join("root.tar.gz").exists());
        assert!(stage_dir.join("resources/patch1.tar.gz").exists());
    }

    #[test]
    fn stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let composite = FetcherComposite::new(FetchEntry::new(
            "root",
            Box::new(PathFetcher::new(tmp.path().join("missing"), false)),
            "root.tar.gz",
        ))
        .with_resource(FetchEntry::new(
            "never-runs",
            Box::new(PathFetcher::new(tmp.path().join("also-missing"), false)),
            "resources/never.tar.gz",
        ));

        let stage_dir = tmp.path().join("stage");
        let err = composite.fetch_all(&stage_dir).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Fetch);
    }
}
