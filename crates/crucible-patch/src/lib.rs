//! Sentinel-gated idempotent patch application over a staged source tree.
//!
//! Grounded directly on `do_patch` in Spack's `package.py`: a patch-failed sentinel forces
//! a restage before the next attempt; a patched-OK or no-patches-needed sentinel short-circuits
//! an already-settled tree; otherwise each applicable patch is applied in declaration order,
//! followed by the recipe's own patch hook if it has one, and exactly one of the two "settled"
//! sentinels is left behind.

pub mod unified_diff;

use std::fs;
use std::path::Path;

use crucible_core::{Error, Package, PatchDescriptor, PatchSource, Result, Sentinel};

/// A recipe's own patch step ("recipe capability trait": `patch`), invoked after
/// all file-based patches have applied. `None` when the package declares no such hook.
pub type RecipePatchFn<'a> = dyn Fn(&Path) -> Result<()> + 'a;

fn sentinel_path(source_dir: &Path, sentinel: Sentinel) -> std::path::PathBuf {
    source_dir.join(sentinel.filename())
}

fn touch(path: &Path) -> Result<()> {
    fs::write(path, b"").map_err(|source| Error::io(path.to_path_buf(), source))
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::io(path.to_path_buf(), source)),
    }
}

/// Reads a patch's unified-diff body, whichever form it's carried in, and applies it to
/// `target_file` in place.
fn apply_one(patch: &PatchDescriptor, source_dir: &Path, target_file: &Path) -> Result<()> {
    let body = match &patch.source {
        PatchSource::Inline(body) => body.clone(),
        PatchSource::File(path) => {
            let full = if path.is_absolute() {
                path.clone()
            } else {
                source_dir.join(path)
            };
            fs::read_to_string(&full).map_err(|source| Error::io(full, source))?
        }
    };

    let original = fs::read_to_string(target_file)
        .map_err(|source| Error::io(target_file.to_path_buf(), source))?;
    let patched = unified_diff::apply(&original, &body)
        .map_err(|e| Error::install(format!("patch '{}' failed to apply: {e}", patch.id)))?;
    fs::write(target_file, patched).map_err(|source| Error::io(target_file.to_path_buf(), source))
}

/// Runs the full patch protocol against `source_dir`, applying every patch of `package` that
/// matches `satisfied_constraints`, each targeting `target_file` relative to `source_dir` (the
/// file the unified diff rewrites; callers that need per-patch targets can call [`apply_one`]
/// directly via a custom driver — the common case patches a single top-level file).
///
/// # Errors
/// Propagates the first patch-apply failure as [`crucible_core::Error::install`], having first
/// left the patch-failed sentinel behind so the next attempt restages before retrying.
pub fn do_patch(
    package: &Package,
    satisfied_constraints: &[&str],
    source_dir: &Path,
    target_file: &Path,
    recipe_patch: Option<&RecipePatchFn<'_>>,
) -> Result<bool> {
    let bad_file = sentinel_path(source_dir, Sentinel::PatchFailed);
    let good_file = sentinel_path(source_dir, Sentinel::Patched);
    let no_patches_file = sentinel_path(source_dir, Sentinel::NoPatchesNeeded);

    if bad_file.exists() {
        return Err(Error::install(
            "source tree carries a stale patch-failed sentinel; restage before patching again",
        ));
    }

    if good_file.exists() {
        tracing::debug!(path = %source_dir.display(), "already patched, skipping");
        return Ok(true);
    }

    if no_patches_file.exists() {
        tracing::debug!(path = %source_dir.display(), "no patches needed, skipping");
        return Ok(false);
    }

    let mut any_applied = false;
    let full_target = source_dir.join(target_file);

    for patch in package.applicable_patches(satisfied_constraints) {
        tracing::info!(patch = %patch.id, "applying patch");
        if let Err(e) = apply_one(patch, source_dir, &full_target) {
            let _ = touch(&bad_file);
            return Err(e);
        }
        any_applied = true;
    }

    if let Some(recipe_patch) = recipe_patch {
        tracing::info!("running recipe patch hook");
        if let Err(e) = recipe_patch(source_dir) {
            let _ = touch(&bad_file);
            return Err(e);
        }
        any_applied = true;
    }

    remove_if_present(&bad_file)?;
    if any_applied {
        touch(&good_file)?;
    } else {
        touch(&no_patches_file)?;
    }

    Ok(any_applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_target(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("source.txt");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn applies_inline_patch_and_leaves_patched_sentinel() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "hello\nworld\n");

        let patch = PatchDescriptor::inline("fix", "@@ -1,2 +1,2 @@\n hello\n-world\n+rust\n");
        let pkg = Package::new("demo").with_patch("@all", patch);

        let applied = do_patch(&pkg, &["@all"], dir.path(), Path::new("source.txt"), None).unwrap();

        assert!(applied);
        assert!(dir.path().join(Sentinel::Patched.filename()).exists());
        assert!(!dir.path().join(Sentinel::NoPatchesNeeded.filename()).exists());

        let content = fs::read_to_string(dir.path().join("source.txt")).unwrap();
        assert!(content.contains("rust"));
    }

    #[test]
    fn no_applicable_patches_leaves_no_patches_sentinel() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "hello\n");
        let pkg = Package::new("demo");

        let applied = do_patch(&pkg, &[], dir.path(), Path::new("source.txt"), None).unwrap();

        assert!(!applied);
        assert!(dir.path().join(Sentinel::NoPatchesNeeded.filename()).exists());
    }

    #[test]
    fn already_patched_short_circuits() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "hello\n");
        touch(&sentinel_path(dir.path(), Sentinel::Patched)).unwrap();

        let pkg = Package::new("demo").with_patch("@all", PatchDescriptor::inline("would-fail", "garbage"));

        let applied = do_patch(&pkg, &["@all"], dir.path(), Path::new("source.txt"), None).unwrap();
        assert!(applied);
    }

    #[test]
    fn stale_failed_sentinel_refuses_to_retry_in_place() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "hello\n");
        touch(&sentinel_path(dir.path(), Sentinel::PatchFailed)).unwrap();

        let pkg = Package::new("demo");
        let err = do_patch(&pkg, &[], dir.path(), Path::new("source.txt"), None).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Install);
    }

    #[test]
    fn failed_apply_leaves_failed_sentinel_behind() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "hello\n");

        let pkg = Package::new("demo")
            .with_patch("@all", PatchDescriptor::inline("broken", "@@ -1,1 +1,1 @@\n-nonexistent\n+y\n"));

        let err = do_patch(&pkg, &["@all"], dir.path(), Path::new("source.txt"), None).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Install);
        assert!(dir.path().join(Sentinel::PatchFailed.filename()).exists());
    }
}
