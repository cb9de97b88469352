//! The installed-spec database: a single JSON document, one record per
//! installed spec, guarded by an advisory file lock for the duration of a mutating operation.
//! guarantees the driver is the only writer during an install, so the lock exists to catch
//! accidental concurrent drivers rather than to arbitrate real contention.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use crucible_core::{Error, Result, Spec};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub name: String,
    pub version: String,
    pub dag_hash: String,
    pub prefix: PathBuf,
    pub installed_at: String,
    pub dependency_dag_hashes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryDocument {
    records: Vec<InstalledRecord>,
}

pub struct Registry {
    path: PathBuf,
    lock_path: PathBuf,
}

impl Registry {
    pub fn new(install_root: impl AsRef<Path>) -> Self {
        let root = install_root.as_ref();
        Self {
            path: root.join(".crucible-registry.json"),
            lock_path: root.join(".crucible-registry.lock"),
        }
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut RegistryDocument) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::io(parent.to_path_buf(), source))?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| Error::io(self.lock_path.clone(), source))?;
        lock_file
            .lock_exclusive()
            .map_err(|source| Error::io(self.lock_path.clone(), source))?;

        let mut doc = self.load()?;
        let result = f(&mut doc);
        if result.is_ok() {
            self.save(&doc)?;
        }

        lock_file
            .unlock()
            .map_err(|source| Error::io(self.lock_path.clone(), source))?;
        result
    }

    fn load(&self) -> Result<RegistryDocument> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(RegistryDocument::default()),
            Ok(contents) => crucible_core::json::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistryDocument::default()),
            Err(source) => Err(Error::io(self.path.clone(), source)),
        }
    }

    fn save(&self, doc: &RegistryDocument) -> Result<()> {
        let json = crucible_core::json::to_json_pretty(doc)?;
        std::fs::write(&self.path, json).map_err(|source| Error::io(self.path.clone(), source))
    }

    /// Adds an installed-spec record, replacing any existing record with the same dag hash
    /// (the driver re-registering an already-present spec is treated as idempotent).
    pub fn add(&self, spec: &Spec, prefix: &Path) -> Result<()> {
        self.add_with_dependencies(spec, prefix, Vec::new())
    }

    /// As [`Self::add`], additionally recording the dag hashes of this spec's direct
    /// dependencies so [`Self::dependents_of`] can answer the driver's uninstall precondition.
    pub fn add_with_dependencies(&self, spec: &Spec, prefix: &Path, dependency_dag_hashes: Vec<String>) -> Result<()> {
        self.with_lock(|doc| {
            doc.records.retain(|r| r.dag_hash != spec.dag_hash);
            doc.records.push(InstalledRecord {
                name: spec.name.clone(),
                version: spec.version.as_str().to_string(),
                dag_hash: spec.dag_hash.clone(),
                prefix: prefix.to_path_buf(),
                installed_at: Utc::now().to_rfc3339(),
                dependency_dag_hashes: dependency_dag_hashes.clone(),
            });
            Ok(())
        })
    }

    pub fn remove(&self, dag_hash: &str) -> Result<()> {
        self.with_lock(|doc| {
            doc.records.retain(|r| r.dag_hash != dag_hash);
            Ok(())
        })
    }

    pub fn is_installed(&self, dag_hash: &str) -> Result<bool> {
        Ok(self.load()?.records.iter().any(|r| r.dag_hash == dag_hash))
    }

    pub fn get(&self, dag_hash: &str) -> Result<Option<InstalledRecord>> {
        Ok(self.load()?.records.into_iter().find(|r| r.dag_hash == dag_hash))
    }

    /// Looks up an installed record by name and version, used by the provenance dumper
    /// to locate a dependency's own previously-captured snapshot without knowing its dag hash
    /// up front.
    pub fn find_by_name_version(&self, name: &str, version: &str) -> Result<Option<InstalledRecord>> {
        Ok(self
            .load()?
            .records
            .into_iter()
            .find(|r| r.name == name && r.version == version))
    }

    /// Names of every installed record that lists `dag_hash` as a direct dependency, used by
    /// the driver's uninstall precondition.
    pub fn dependents_of(&self, dag_hash: &str) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .records
            .into_iter()
            .filter(|r| r.dependency_dag_hashes.iter().any(|d| d == dag_hash))
            .map(|r| r.name)
            .collect())
    }
}
