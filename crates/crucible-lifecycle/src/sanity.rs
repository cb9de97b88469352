//! Post-install file/directory presence assertions: the last gate before a
//! spec is registered, so the registry never references a prefix that silently failed to
//! install anything.

use std::path::Path;

use crucible_core::{Error, Result};

/// Asserts every `sanity_check_is_file`/`sanity_check_is_dir` path (prefix-relative) exists
/// under `prefix` with the expected kind, and that the prefix is non-empty once
/// `hidden_file_paths` are excluded.
///
/// # Errors
/// [`crucible_core::Error::install`] naming the first missing/wrong-kind path, or "Nothing was
/// installed" if the prefix has no non-hidden entries.
pub fn sanity_check_prefix(
    prefix: &Path,
    expect_files: &[std::path::PathBuf],
    expect_dirs: &[std::path::PathBuf],
    hidden_file_paths: &[&str],
) -> Result<()> {
    for rel in expect_files {
        let path = prefix.join(rel);
        if !path.is_file() {
            return Err(Error::install(format!(
                "sanity check failed: expected file {} under {}",
                rel.display(),
                prefix.display()
            )));
        }
    }

    for rel in expect_dirs {
        let path = prefix.join(rel);
        if !path.is_dir() {
            return Err(Error::install(format!(
                "sanity check failed: expected directory {} under {}",
                rel.display(),
                prefix.display()
            )));
        }
    }

    if prefix_is_empty(prefix, hidden_file_paths)? {
        return Err(Error::install("Nothing was installed"));
    }

    Ok(())
}

fn prefix_is_empty(prefix: &Path, hidden_file_paths: &[&str]) -> Result<bool> {
    let entries = std::fs::read_dir(prefix).map_err(|e| Error::io(prefix.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(prefix.to_path_buf(), e))?;
        let name = entry.file_name();
        if hidden_file_paths.contains(&name.to_string_lossy().as_ref()) {
            continue;
        }
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn passes_when_every_declared_path_exists() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("bin/tool"), b"").unwrap_or_else(|_| {
            std::fs::create_dir_all(dir.path().join("bin")).unwrap();
            std::fs::write(dir.path().join("bin/tool"), b"").unwrap();
        });

        sanity_check_prefix(
            dir.path(),
            &[std::path::PathBuf::from("bin/tool")],
            &[std::path::PathBuf::from("lib")],
            &[".crucible"],
        )
        .unwrap();
    }

    #[test]
    fn fails_when_a_declared_file_is_missing() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();

        let err = sanity_check_prefix(dir.path(), &[std::path::PathBuf::from("bin/tool")], &[], &[".crucible"]).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Install);
    }

    #[test]
    fn fails_when_prefix_has_only_hidden_entries() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".crucible")).unwrap();

        let err = sanity_check_prefix(dir.path(), &[], &[], &[".crucible"]).unwrap_err();
        assert!(err.to_string().contains("Nothing was installed"));
    }

    #[test]
    fn non_empty_prefix_with_no_declared_paths_passes() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"hi").unwrap();

        sanity_check_prefix(dir.path(), &[], &[], &[".crucible"]).unwrap();
    }
}
