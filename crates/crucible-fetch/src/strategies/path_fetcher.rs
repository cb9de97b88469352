//! Local-path fetch strategy: copies (or symlinks) an already-present directory or file, for
//! vendored/offline sources that never touch the network.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crucible_core::{Error, Result};

use super::{FetchOutcome, Fetcher};
use crate::source::SourceType;

#[derive(Debug, Clone)]
pub struct PathFetcher {
    pub path: PathBuf,
    pub symlink: bool,
}

impl PathFetcher {
    pub fn new(path: impl Into<PathBuf>, symlink: bool) -> Self {
        Self {
            path: path.into(),
            symlink,
        }
    }
}

impl Fetcher for PathFetcher {
    fn source_type(&self) -> SourceType {
        SourceType::Path
    }

    fn suggested_filename(&self) -> Option<String> {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    fn fetch(&self, dest: &Path) -> Result<FetchOutcome> {
        let start = Instant::now();

        if !self.path.exists() {
            return Err(Error::fetch(format!(
                "local source path does not exist: {}",
                self.path.display()
            )));
        }

        if self.symlink {
            #[cfg(unix)]
            std::os::unix::fs::symlink(&self.path, dest).map_err(|e| Error::io(dest, e))?;
            #[cfg(not(unix))]
            return Err(Error::fetch("symlink fetch is only supported on unix"));
        } else if self.path.is_dir() {
            copy_dir_recursive(&self.path, dest)?;
        } else {
            std::fs::copy(&self.path, dest).map_err(|e| Error::io(dest, e))?;
        }

        let bytes = dir_or_file_size(dest);
        Ok(FetchOutcome {
            bytes,
            elapsed: start.elapsed(),
        })
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    for entry in std::fs::read_dir(src).map_err(|e| Error::io(src, e))? {
        let entry = entry.map_err(|e| Error::io(src, e))?;
        let entry_dest = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| Error::io(src, e))?;
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &entry_dest)?;
        } else {
            std::fs::copy(entry.path(), &entry_dest).map_err(|e| Error::io(&entry_dest, e))?;
        }
    }
    Ok(())
}

fn dir_or_file_size(path: &Path) -> u64 {
    if path.is_dir() {
        walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    } else {
        std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_a_single_file() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("vendor.tar.gz");
        std::fs::write(&source, b"vendored bytes").unwrap();

        let fetcher = PathFetcher::new(&source, false);
        let dest = tmp.path().join("dest.tar.gz");
        let outcome = fetcher.fetch(&dest).unwrap();
        assert_eq!(outcome.bytes, 14);
        assert_eq!(std::fs::read(&dest).unwrap(), b"vendored bytes");
    }

    #[test]
    fn copies_a_directory_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("vendored_src");
        std::fs::create_dir_all(source.join("nested")).unwrap();
        std::fs::write(source.join("a.txt"), b"a").unwrap();
        std::fs::write(source.join("nested/b.txt"), b"bb").unwrap();

        let fetcher = PathFetcher::new(&source, false);
        let dest = tmp.path().join("dest_dir");
        let outcome = fetcher.fetch(&dest).unwrap();
        assert_eq!(outcome.bytes, 3);
        assert_eq!(std::fs::read(dest.join("nested/b.txt")).unwrap(), b"bb");
    }

    #[test]
    fn missing_source_path_is_a_fetch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = PathFetcher::new(tmp.path().join("nope"), false);
        let dest = tmp.path().join("dest");
        let err = fetcher.fetch(&dest).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Fetch);
    }
}
