//! Mirrors a source directory into a destination directory via symlinks, one link per regular
//! file and one real directory per source directory. Grounded on Spack's
//! `LinkTree` (`package.py`'s `activate`/`deactivate`, which build one from the extension
//! prefix and `merge`/`unmerge` it into the host prefix).

use std::path::{Path, PathBuf};

use crucible_core::{Error, Result};
use walkdir::WalkDir;

/// Names never linked into a host prefix: "hidden administrative files are never
/// linked", matching the source's `hidden_file_paths`.
const HIDDEN_FILE_PATHS: &[&str] = &[".spack", ".crucible"];

fn is_hidden(rel: &Path) -> bool {
    rel.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        HIDDEN_FILE_PATHS.contains(&s.as_ref())
    })
}

pub struct LinkTree {
    source_root: PathBuf,
}

impl LinkTree {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    /// All file paths (relative to the source root) that would be linked, skipping hidden
    /// administrative entries and directories.
    fn entries(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.source_root) {
            let entry = entry.map_err(|e| Error::activation(format!("walking extension tree failed: {e}")))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.source_root)
                .expect("walkdir entries are under source_root")
                .to_path_buf();
            if is_hidden(&rel) {
                continue;
            }
            out.push(rel);
        }
        out.sort();
        Ok(out)
    }

    /// Returns the first relative path that already exists in `dest`, if any.
    pub fn find_conflict(&self, dest: &Path) -> Result<Option<PathBuf>> {
        for rel in self.entries()? {
            if dest.join(&rel).exists() {
                return Ok(Some(rel));
            }
        }
        Ok(None)
    }

    /// Links every file under the source root into `dest`, creating parent directories as
    /// needed. Callers must have already confirmed [`find_conflict`] returns `None`.
    pub fn merge(&self, dest: &Path) -> Result<()> {
        for rel in self.entries()? {
            let src_path = self.source_root.join(&rel);
            let dest_path = dest.join(&rel);

            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| Error::io(parent.to_path_buf(), source))?;
            }

            link(&src_path, &dest_path)?;
        }
        Ok(())
    }

    /// Removes every link under `dest` that this tree would have created, pruning directories
    /// left empty afterward. Links that no longer point back into the source root are left
    /// alone and logged, since they were not created by this tree.
    pub fn unmerge(&self, dest: &Path) -> Result<()> {
        let mut dirs_touched = Vec::new();

        for rel in self.entries()? {
            let src_path = self.source_root.join(&rel);
            let dest_path = dest.join(&rel);

            match std::fs::symlink_metadata(&dest_path) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    let target = std::fs::read_link(&dest_path).map_err(|source| Error::io(dest_path.clone(), source))?;
                    if target == src_path {
                        std::fs::remove_file(&dest_path).map_err(|source| Error::io(dest_path.clone(), source))?;
                        if let Some(parent) = dest_path.parent() {
                            dirs_touched.push(parent.to_path_buf());
                        }
                    } else {
                        tracing::warn!(
                            path = %dest_path.display(),
                            "link does not point back into this extension, leaving in place"
                        );
                    }
                }
                Ok(_) => tracing::warn!(
                    path = %dest_path.display(),
                    "expected a symlink left by activation, found a regular file"
                ),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(Error::io(dest_path, source)),
            }
        }

        dirs_touched.sort();
        dirs_touched.dedup();
        for dir in dirs_touched.iter().rev() {
            let _ = std::fs::remove_dir(dir);
        }

        Ok(())
    }
}

#[cfg(unix)]
fn link(src: &Path, dest: &Path) -> Result<()> {
    std::os::unix::fs::symlink(src, dest).map_err(|source| Error::io(dest.to_path_buf(), source))
}

#[cfg(not(unix))]
fn link(src: &Path, dest: &Path) -> Result<()> {
    std::fs::hard_link(src, dest).map_err(|source| Error::io(dest.to_path_buf(), source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn merge_links_every_file_and_unmerge_removes_them() {
        let ext = tempdir().unwrap();
        let host = tempdir().unwrap();

        write(&ext.path().join("bin/tool"), "bin");
        write(&ext.path().join("lib/tool.so"), "lib");

        let tree = LinkTree::new(ext.path());
        assert!(tree.find_conflict(host.path()).unwrap().is_none());
        tree.merge(host.path()).unwrap();

        assert!(host.path().join("bin/tool").exists());
        assert!(host.path().join("lib/tool.so").exists());

        tree.unmerge(host.path()).unwrap();
        assert!(!host.path().join("bin/tool").exists());
        assert!(!host.path().join("lib").exists());
    }

    #[test]
    fn find_conflict_detects_preexisting_file() {
        let ext = tempdir().unwrap();
        let host = tempdir().unwrap();

        write(&ext.path().join("bin/tool"), "bin");
        write(&host.path().join("bin/tool"), "already here");

        let tree = LinkTree::new(ext.path());
        let conflict = tree.find_conflict(host.path()).unwrap();
        assert_eq!(conflict, Some(PathBuf::from("bin/tool")));
    }

    #[test]
    fn hidden_administrative_paths_are_never_linked() {
        let ext = tempdir().unwrap();
        let host = tempdir().unwrap();

        write(&ext.path().join(".crucible/manifest.json"), "{}");
        write(&ext.path().join("bin/tool"), "bin");

        let tree = LinkTree::new(ext.path());
        tree.merge(host.path()).unwrap();

        assert!(host.path().join("bin/tool").exists());
        assert!(!host.path().join(".crucible").exists());
    }
}
