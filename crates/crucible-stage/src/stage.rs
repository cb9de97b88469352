//! Stage / StageComposite: scoped working directories for the root archive
//! and its declared resources. Lazily created on first access, destroyed on scope exit unless
//! `keep` is set, via the usual RAII drop-guard pattern.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crucible_core::{Error, Result};
use crucible_fetch::{FetchOutcome, Fetcher};

use crate::archive::{self, ExtractionResult};

/// One scratch directory: a root archive stage, or a resource stage parented to the root.
#[derive(Debug)]
pub struct Stage {
    root_dir: PathBuf,
    mirror_path: PathBuf,
    archive_name: String,
    source_dir: Option<PathBuf>,
    created: bool,
}

impl Stage {
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>, mirror_path: impl Into<PathBuf>, archive_name: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            mirror_path: mirror_path.into(),
            archive_name: archive_name.into(),
            source_dir: None,
            created: false,
        }
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn archive_path(&self) -> PathBuf {
        self.root_dir.join(&self.archive_name)
    }

    /// Materializes the working directory. Idempotent.
    ///
    /// # Errors
    /// Returns [`crucible_core::Error::io`] if the directory cannot be created.
    pub fn create(&mut self) -> Result<()> {
        if !self.created {
            std::fs::create_dir_all(&self.root_dir).map_err(|e| Error::io(&self.root_dir, e))?;
            self.created = true;
        }
        Ok(())
    }

    /// Downloads into the mirror cache, then
    /// copies into the stage root unless `mirror_only`.
    ///
    /// # Errors
    /// Propagates the fetcher's [`crucible_core::Error::fetch`], or an I/O error copying the
    /// cached artifact into the stage.
    pub fn fetch(&mut self, fetcher: &dyn Fetcher, mirror_only: bool) -> Result<FetchOutcome> {
        self.create()?;

        let outcome = if self.mirror_path.exists() {
            FetchOutcome {
                bytes: std::fs::metadata(&self.mirror_path).map(|m| m.len()).unwrap_or(0),
                elapsed: Duration::ZERO,
            }
        } else {
            if let Some(parent) = self.mirror_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            fetcher.fetch(&self.mirror_path)?
        };

        if !mirror_only {
            std::fs::copy(&self.mirror_path, self.archive_path()).map_err(|e| Error::io(self.archive_path(), e))?;
        }

        Ok(outcome)
    }

    /// Verifies the cached archive is present; checksum verification itself happens inside
    /// the fetch strategy, so this is a presence safety net mirroring the
    /// original's `stage.check` call after fetch.
    ///
    /// # Errors
    /// Returns [`crucible_core::Error::fetch`] if the cached archive is missing.
    pub fn check(&self) -> Result<()> {
        if !self.mirror_path.exists() {
            return Err(Error::fetch(format!(
                "no cached archive at {} to check",
                self.mirror_path.display()
            )));
        }
        Ok(())
    }

    /// Expands the fetched archive into the stage root, recording whether it produced a
    /// single top-level directory.
    ///
    /// # Errors
    /// Propagates [`crucible_core::Error::install`] from the archive extractor.
    pub fn expand_archive(&mut self) -> Result<ExtractionResult> {
        self.create()?;
        let result = archive::extract(&self.archive_path(), &self.root_dir)?;
        self.source_dir = Some(result.single_top_level_dir.clone().unwrap_or_else(|| self.root_dir.clone()));
        Ok(result)
    }

    /// The expanded source tree root. Available after `expand_archive`.
    ///
    /// # Errors
    /// Returns [`crucible_core::Error::install`] if the archive hasn't been expanded yet.
    pub fn source_path(&self) -> Result<&Path> {
        self.source_dir
            .as_deref()
            .ok_or_else(|| Error::install("stage has not been expanded yet"))
    }

    /// Changes the process working directory to the expanded source tree.
    ///
    /// # Errors
    /// Returns [`crucible_core::Error::io`] if the directory change fails, or
    /// [`crucible_core::Error::install`] if not yet expanded.
    pub fn chdir_to_source(&self) -> Result<()> {
        let path = self.source_path()?;
        std::env::set_current_dir(path).map_err(|e| Error::io(path, e))
    }

    /// Removes the expanded tree and re-expands from the cached archive without re-fetching.
    ///
    /// # Errors
    /// Propagates I/O or extraction errors.
    pub fn restage(&mut self) -> Result<ExtractionResult> {
        let archive_name = self.archive_name.clone();
        if self.root_dir.exists() {
            for entry in std::fs::read_dir(&self.root_dir).map_err(|e| Error::io(&self.root_dir, e))? {
                let entry = entry.map_err(|e| Error::io(&self.root_dir, e))?;
                if entry.file_name().to_string_lossy() == archive_name {
                    continue;
                }
                let path = entry.path();
                if path.is_dir() {
                    std::fs::remove_dir_all(&path).map_err(|e| Error::io(&path, e))?;
                } else {
                    std::fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
                }
            }
        }
        self.source_dir = None;
        self.expand_archive()
    }

    /// Destroys the entire stage (archive copy + expansion); the mirror cache is untouched.
    ///
    /// # Errors
    /// Returns [`crucible_core::Error::io`] if removal fails.
    pub fn destroy(&mut self) -> Result<()> {
        if self.root_dir.exists() {
            std::fs::remove_dir_all(&self.root_dir).map_err(|e| Error::io(&self.root_dir, e))?;
        }
        self.created = false;
        self.source_dir = None;
        Ok(())
    }
}

/// A root stage plus zero or more resource stages parented to it.
#[derive(Debug)]
pub struct StageComposite {
    pub root: Stage,
    pub resources: Vec<Stage>,
}

impl StageComposite {
    #[must_use]
    pub fn new(root: Stage) -> Self {
        Self {
            root,
            resources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_resource(mut self, resource: Stage) -> Self {
        self.resources.push(resource);
        self
    }

    /// Fetches the root first (index 0), then each resource in declared order.
    ///
    /// # Errors
    /// Stops at the first failing fetcher and propagates its error.
    pub fn fetch_all(&mut self, fetchers: &[&dyn Fetcher], mirror_only: bool) -> Result<()> {
        let Some((root_fetcher, resource_fetchers)) = fetchers.split_first() else {
            return Err(Error::fetch("no fetcher provided for root stage"));
        };
        self.root.fetch(*root_fetcher, mirror_only)?;
        for (stage, fetcher) in self.resources.iter_mut().zip(resource_fetchers) {
            stage.fetch(*fetcher, mirror_only)?;
        }
        Ok(())
    }

    /// Expands the root archive, then each resource's archive into its own stage directory.
    ///
    /// # Errors
    /// Propagates the first extraction failure.
    pub fn expand_all(&mut self) -> Result<()> {
        self.root.expand_archive()?;
        for stage in &mut self.resources {
            stage.expand_archive()?;
        }
        Ok(())
    }

    pub fn restage(&mut self) -> Result<()> {
        self.root.restage()?;
        for stage in &mut self.resources {
            stage.restage()?;
        }
        Ok(())
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.root.destroy()?;
        for stage in &mut self.resources {
            stage.destroy()?;
        }
        Ok(())
    }

    /// Converts this composite into a scope-guarded value that destroys itself on drop
    /// unless `keep` is true.
    #[must_use]
    pub fn scoped(self, keep: bool) -> ScopedStage {
        ScopedStage {
            composite: Some(self),
            keep,
        }
    }
}

/// RAII guard around a [`StageComposite`]; destroys the stage on drop unless `keep` is set.
#[derive(Debug)]
pub struct ScopedStage {
    composite: Option<StageComposite>,
    keep: bool,
}

impl ScopedStage {
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl std::ops::Deref for ScopedStage {
    type Target = StageComposite;

    fn deref(&self) -> &Self::Target {
        self.composite.as_ref().expect("composite present until drop")
    }
}

impl std::ops::DerefMut for ScopedStage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.composite.as_mut().expect("composite present until drop")
    }
}

impl Drop for ScopedStage {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Some(mut composite) = self.composite.take() {
            if let Err(e) = composite.destroy() {
                tracing::warn!(error = %e, "failed to clean up stage on scope exit");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_fetch::PathFetcher;

    fn stage_at(tmp: &Path, name: &str) -> Stage {
        Stage::new(tmp.join(format!("work-{name}")), tmp.join(format!("mirror-{name}.tar.gz")), "archive.tar.gz")
    }

    fn write_source_archive(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "pkg-1.0/file.txt", &b"hello"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn fetch_then_expand_populates_source_path() {
        let tmp = tempfile::tempdir().unwrap();
        let source_archive = tmp.path().join("source.tar.gz");
        write_source_archive(&source_archive);

        let mut stage = stage_at(tmp.path(), "root");
        let fetcher = PathFetcher::new(&source_archive, false);
        stage.fetch(&fetcher, false).unwrap();
        stage.expand_archive().unwrap();

        assert!(stage.source_path().unwrap().ends_with("pkg-1.0"));
        assert!(stage.source_path().unwrap().join("file.txt").exists());
    }

    #[test]
    fn restage_reexpands_without_refetching() {
        let tmp = tempfile::tempdir().unwrap();
        let source_archive = tmp.path().join("source.tar.gz");
        write_source_archive(&source_archive);

        let mut stage = stage_at(tmp.path(), "root");
        let fetcher = PathFetcher::new(&source_archive, false);
        stage.fetch(&fetcher, false).unwrap();
        stage.expand_archive().unwrap();

        // Corrupt the mirror cache's source archive to prove restage doesn't re-fetch.
        std::fs::remove_file(&source_archive).unwrap();

        stage.restage().unwrap();
        assert!(stage.source_path().unwrap().join("file.txt").exists());
    }

    #[test]
    fn scoped_stage_destroys_on_drop_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let source_archive = tmp.path().join("source.tar.gz");
        write_source_archive(&source_archive);

        let mut stage = stage_at(tmp.path(), "root");
        let fetcher = PathFetcher::new(&source_archive, false);
        stage.fetch(&fetcher, false).unwrap();
        let root_dir = stage.root_dir.to_path_buf();

        let composite = StageComposite::new(stage);
        {
            let _scoped = composite.scoped(false);
        }
        assert!(!root_dir.exists());
    }

    #[test]
    fn scoped_stage_keeps_directory_when_keep_is_set() {
        let tmp = tempfile::tempdir().unwrap();
        let source_archive = tmp.path().join("source.tar.gz");
        write_source_archive(&source_archive);

        let mut stage = stage_at(tmp.path(), "root");
        let fetcher = PathFetcher::new(&source_archive, false);
        stage.fetch(&fetcher, false).unwrap();
        let root_dir = stage.root_dir.to_path_buf();

        let composite = StageComposite::new(stage);
        {
            let mut scoped = composite.scoped(false);
            scoped.keep();
        }
        assert!(root_dir.exists());
    }
}
