//! The manifest record written alongside each copied recipe. Recipes here are
//! compiled-in Rust types rather than files on disk, so the snapshot is this record plus
//! whatever patch files the package referenced, rather than a checkout of recipe source.

use serde::{Deserialize, Serialize};

use crucible_core::{Package, PatchSource, Spec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub id: String,
    /// `blake3` digest of the patch body (inline patches hash their text directly; file patches
    /// hash the referenced file's contents when readable).
    pub content_hash: Option<String>,
    pub source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub name: String,
    pub version: String,
    pub dag_hash: String,
    pub patches: Vec<PatchRecord>,
}

/// Builds the manifest record for `spec`, hashing every patch applicable under
/// `satisfied_constraints` from `package`'s declarations.
pub fn build_record(spec: &Spec, package: &Package, satisfied_constraints: &[&str]) -> ProvenanceRecord {
    let patches = package
        .applicable_patches(satisfied_constraints)
        .into_iter()
        .map(|patch| match &patch.source {
            PatchSource::Inline(body) => PatchRecord {
                id: patch.id.clone(),
                content_hash: Some(blake3::hash(body.as_bytes()).to_hex().to_string()),
                source_path: None,
            },
            PatchSource::File(path) => PatchRecord {
                id: patch.id.clone(),
                content_hash: std::fs::read(path).ok().map(|bytes| blake3::hash(&bytes).to_hex().to_string()),
                source_path: Some(path.display().to_string()),
            },
        })
        .collect();

    ProvenanceRecord {
        name: spec.name.clone(),
        version: spec.version.as_str().to_string(),
        dag_hash: spec.dag_hash.clone(),
        patches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::PatchDescriptor;

    #[test]
    fn inline_patches_hash_their_body() {
        let spec = Spec::new("zlib", "1.2.13", "abcd1234");
        let package = Package::new("zlib").with_patch("@all", PatchDescriptor::inline("fix", "--- a\n+++ b\n"));
        let record = build_record(&spec, &package, &["@all"]);

        assert_eq!(record.patches.len(), 1);
        assert!(record.patches[0].content_hash.is_some());
        assert!(record.patches[0].source_path.is_none());
    }

    #[test]
    fn missing_patch_file_yields_no_hash_but_keeps_path() {
        let spec = Spec::new("zlib", "1.2.13", "abcd1234");
        let package = Package::new("zlib").with_patch(
            "@all",
            PatchDescriptor::new("fix", "/nonexistent/patches/fix.diff"),
        );
        let record = build_record(&spec, &package, &["@all"]);

        assert!(record.patches[0].content_hash.is_none());
        assert_eq!(
            record.patches[0].source_path.as_deref(),
            Some("/nonexistent/patches/fix.diff")
        );
    }
}
