//! Environment capture/modification. No single teacher file grounds this; it follows the
//! general "named env var table applied onto a `std::process::Command`" idiom the pack's build
//! tools use.

use std::collections::BTreeMap;

/// Path-like environment variables are joined with this separator on the platforms this
/// engine targets (the workspace has no Windows-specific build path today).
const PATH_SEPARATOR: &str = ":";

/// Accumulated environment changes a recipe (or one of its dependencies, via
/// `setup_dependent_environment`) wants applied to the build child process.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentModifications {
    set: BTreeMap<String, String>,
    prepend_path: BTreeMap<String, Vec<String>>,
    append_path: BTreeMap<String, Vec<String>>,
}

impl EnvironmentModifications {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set.insert(key.into(), value.into());
        self
    }

    pub fn prepend_path(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.prepend_path.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn append_path(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.append_path.entry(key.into()).or_default().push(value.into());
        self
    }

    fn resolved_path_var(&self, key: &str, existing: Option<&str>) -> Option<String> {
        let prepend = self.prepend_path.get(key).cloned().unwrap_or_default();
        let append = self.append_path.get(key).cloned().unwrap_or_default();
        if prepend.is_empty() && append.is_empty() {
            return None;
        }
        let mut parts = prepend;
        if let Some(existing) = existing {
            parts.push(existing.to_string());
        }
        parts.extend(append);
        Some(parts.join(PATH_SEPARATOR))
    }

    /// Applies every `set`/prepend/append modification onto `cmd`, reading the parent
    /// process's current value for any path variable being prepended/appended to.
    pub fn apply_to_command(&self, cmd: &mut std::process::Command) {
        let mut path_keys: Vec<&String> = self.prepend_path.keys().chain(self.append_path.keys()).collect();
        path_keys.sort_unstable();
        path_keys.dedup();

        for key in path_keys {
            let existing = std::env::var(key).ok();
            if let Some(value) = self.resolved_path_var(key, existing.as_deref()) {
                cmd.env(key, value);
            }
        }

        for (key, value) in &self.set {
            cmd.env(key, value);
        }
    }

    /// Renders a `KEY=value` snapshot suitable for `spack-build.env`.
    #[must_use]
    pub fn snapshot(&self) -> String {
        let mut lines = Vec::new();
        for key in self
            .prepend_path
            .keys()
            .chain(self.append_path.keys())
            .collect::<std::collections::BTreeSet<_>>()
        {
            let existing = std::env::var(key).ok();
            if let Some(value) = self.resolved_path_var(key, existing.as_deref()) {
                lines.push(format!("{key}={value}"));
            }
        }
        for (key, value) in &self.set {
            lines.push(format!("{key}={value}"));
        }
        lines.sort();
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_values_are_applied() {
        let mut env = EnvironmentModifications::new();
        env.set("CC", "gcc");
        assert!(env.snapshot().contains("CC=gcc"));
    }

    #[test]
    fn prepend_path_puts_new_entries_before_existing() {
        let mut env = EnvironmentModifications::new();
        env.prepend_path("CRUCIBLE_TEST_PATH", "/opt/crucible/bin");
        let resolved = env.resolved_path_var("CRUCIBLE_TEST_PATH", Some("/usr/bin")).unwrap();
        assert_eq!(resolved, "/opt/crucible/bin:/usr/bin");
    }

    #[test]
    fn append_path_puts_new_entries_after_existing() {
        let mut env = EnvironmentModifications::new();
        env.append_path("LD_LIBRARY_PATH", "/opt/crucible/lib");
        let resolved = env.resolved_path_var("LD_LIBRARY_PATH", Some("/usr/lib")).unwrap();
        assert_eq!(resolved, "/usr/lib:/opt/crucible/lib");
    }
}
