//! Conflict-checked merge/unmerge of one installed prefix into another:
//! the filesystem half of extension activation. Preconditions (extension installed, host
//! extendable, extendee name match) and activation bookkeeping (which extensions are active
//! in a host prefix) live one layer up, in the layout/registry and lifecycle driver.

pub mod link_tree;

use std::path::Path;

pub use link_tree::LinkTree;

use crucible_core::{Error, Result};

/// An additional predicate, supplied by the caller, for paths to skip on top of the layout's
/// own hidden-file set.
pub type IgnorePredicate<'a> = dyn Fn(&Path) -> bool + 'a;

/// Merges every non-ignored file under `extension_prefix` into `host_prefix` as a symlink,
/// failing with [`crucible_core::Error::extension_conflict`] at the first colliding path and
/// leaving the host prefix untouched in that case.
///
/// # Errors
/// [`ErrorCode::ExtensionConflict`](crucible_core::ErrorCode::ExtensionConflict) if any
/// extension file's relative path already exists under `host_prefix`.
pub fn activate(extension_prefix: &Path, host_prefix: &Path) -> Result<()> {
    let tree = LinkTree::new(extension_prefix);
    if let Some(conflict) = tree.find_conflict(host_prefix)? {
        return Err(Error::extension_conflict(host_prefix.join(conflict)));
    }
    tree.merge(host_prefix)
}

/// Removes the symlinks this extension's activation placed under `host_prefix`. Tolerant of
/// entries already removed; never touches a path that isn't a symlink pointing back into
/// `extension_prefix`.
pub fn deactivate(extension_prefix: &Path, host_prefix: &Path) -> Result<()> {
    LinkTree::new(extension_prefix).unmerge(host_prefix)
}
