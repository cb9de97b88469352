//! Filesystem layout for install prefixes, build metadata, and extension activation sidecars.
//! Follows the usual "JSON document on disk, narrow accessor methods" persistence idiom.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crucible_core::{Error, Result, Spec};
use serde::{Deserialize, Serialize};

/// Paths under this name are never linked by extension activation and never checked by the
/// sanity checker.
const HIDDEN_FILE_PATHS: &[&str] = &[".crucible"];

/// Identifies an extension by the minimum a host's sidecar needs to report it back: the
/// `extension_map`/`check_activated` contract wants `{name: spec}`-shaped answers without this
/// layout owning full spec resolution, so records carry just the identifying fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub name: String,
    pub version: String,
    pub dag_hash: String,
}

impl ExtensionRecord {
    fn from_spec(spec: &Spec) -> Self {
        Self {
            name: spec.name.clone(),
            version: spec.version.as_str().to_string(),
            dag_hash: spec.dag_hash.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ExtensionSidecar {
    extensions: BTreeMap<String, ExtensionRecord>,
}

pub struct InstallLayout {
    install_root: PathBuf,
}

impl InstallLayout {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub const fn hidden_file_paths() -> &'static [&'static str] {
        HIDDEN_FILE_PATHS
    }

    /// `<install_root>/<name>-<version>-<dag_hash_prefix>/`.
    pub fn path_for_spec(&self, spec: &Spec) -> PathBuf {
        let hash_prefix: String = spec.dag_hash.chars().take(7).collect();
        self.install_root
            .join(format!("{}-{}-{}", spec.name, spec.version.as_str(), hash_prefix))
    }

    fn metadata_dir(&self, spec: &Spec) -> PathBuf {
        self.path_for_spec(spec).join(".crucible")
    }

    /// Scratch working directory for a spec's stage (fetch/expand/patch), kept outside the
    /// final prefix tree so a failed or in-progress build never pollutes `path_for_spec`.
    pub fn stage_root(&self, spec: &Spec) -> PathBuf {
        let hash_prefix: String = spec.dag_hash.chars().take(7).collect();
        self.install_root
            .join(".crucible-stage")
            .join(format!("{}-{}-{}", spec.name, spec.version.as_str(), hash_prefix))
    }

    /// Shared download cache root, keyed per-package by callers.
    pub fn mirror_root(&self) -> PathBuf {
        self.install_root.join(".crucible-mirror")
    }

    pub fn build_log_path(&self, spec: &Spec) -> PathBuf {
        self.metadata_dir(spec).join("spack-build.out")
    }

    pub fn build_env_path(&self, spec: &Spec) -> PathBuf {
        self.metadata_dir(spec).join("spack-build.env")
    }

    pub fn build_packages_path(&self, spec: &Spec) -> PathBuf {
        self.metadata_dir(spec).join("repos")
    }

    fn extension_sidecar_path(&self, spec: &Spec) -> PathBuf {
        self.metadata_dir(spec).join("extensions.json")
    }

    /// Creates the prefix and its `.crucible/` metadata directory, failing if the prefix
    /// already exists (callers are expected to have checked [`Self::check_installed`] first).
    pub fn create_install_directory(&self, spec: &Spec) -> Result<PathBuf> {
        let prefix = self.path_for_spec(spec);
        std::fs::create_dir_all(self.metadata_dir(spec)).map_err(|source| Error::io(prefix.clone(), source))?;
        Ok(prefix)
    }

    pub fn remove_install_directory(&self, spec: &Spec) -> Result<()> {
        let prefix = self.path_for_spec(spec);
        match std::fs::remove_dir_all(&prefix) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::io(prefix, source)),
        }
    }

    pub fn check_installed(&self, spec: &Spec) -> bool {
        self.path_for_spec(spec).is_dir()
    }

    fn load_sidecar(&self, host_spec: &Spec) -> Result<ExtensionSidecar> {
        let path = self.extension_sidecar_path(host_spec);
        match std::fs::read_to_string(&path) {
            Ok(contents) => crucible_core::json::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ExtensionSidecar::default()),
            Err(source) => Err(Error::io(path, source)),
        }
    }

    fn save_sidecar(&self, host_spec: &Spec, sidecar: &ExtensionSidecar) -> Result<()> {
        let path = self.extension_sidecar_path(host_spec);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::io(parent.to_path_buf(), source))?;
        }
        let json = crucible_core::json::to_json_pretty(sidecar)?;
        std::fs::write(&path, json).map_err(|source| Error::io(path, source))
    }

    pub fn extension_map(&self, host_spec: &Spec) -> Result<BTreeMap<String, ExtensionRecord>> {
        Ok(self.load_sidecar(host_spec)?.extensions)
    }

    pub fn add_extension(&self, host_spec: &Spec, extension_spec: &Spec) -> Result<()> {
        let mut sidecar = self.load_sidecar(host_spec)?;
        sidecar
            .extensions
            .insert(extension_spec.name.clone(), ExtensionRecord::from_spec(extension_spec));
        self.save_sidecar(host_spec, &sidecar)
    }

    pub fn remove_extension(&self, host_spec: &Spec, extension_name: &str) -> Result<()> {
        let mut sidecar = self.load_sidecar(host_spec)?;
        sidecar.extensions.remove(extension_name);
        self.save_sidecar(host_spec, &sidecar)
    }

    pub fn check_activated(&self, host_spec: &Spec, extension_name: &str) -> Result<bool> {
        Ok(self.load_sidecar(host_spec)?.extensions.contains_key(extension_name))
    }

    /// Checks whether activating `extension_prefix` into this host's prefix would collide with
    /// an existing non-hidden path, delegating to the extension linker's conflict scan.
    pub fn check_extension_conflict(&self, host_spec: &Spec, extension_prefix: &Path) -> Result<Option<PathBuf>> {
        let host_prefix = self.path_for_spec(host_spec);
        crucible_extension::LinkTree::new(extension_prefix).find_conflict(&host_prefix)
    }
}
