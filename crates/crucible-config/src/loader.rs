//! The layered configuration loader: a `ConfigLoader`/`ConfigSource` hierarchy where each
//! layer is read independently and merged field-by-field, lowest to highest precedence. A
//! missing or unreadable optional layer is skipped, never an error.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::env;
use crate::error::Result;
use crate::settings::{PartialSettings, Settings};

/// A configuration layer, in ascending precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    Defaults,
    System,
    User,
    Project,
    Environment,
    Cli,
}

impl ConfigSource {
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defaults => "built-in defaults",
            Self::System => "system configuration",
            Self::User => "user configuration",
            Self::Project => "project configuration",
            Self::Environment => "environment variables",
            Self::Cli => "command-line arguments",
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoader {
    project_dir: PathBuf,
    cli_overrides: PartialSettings,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            cli_overrides: PartialSettings::default(),
        }
    }

    #[must_use]
    pub fn with_cli_overrides(mut self, overrides: PartialSettings) -> Self {
        self.cli_overrides = overrides;
        self
    }

    #[must_use]
    pub fn system_config_path() -> PathBuf {
        if cfg!(windows) {
            PathBuf::from(r"C:\ProgramData\crucible\config.json")
        } else if cfg!(target_os = "macos") {
            PathBuf::from("/Library/Application Support/crucible/config.json")
        } else {
            PathBuf::from("/etc/crucible/config.json")
        }
    }

    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "crucible").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Despite the conventional `.toml` name, the file is parsed with the same
    /// JSON reader as the system/user layers, matching the established single-format config
    /// convention (`sonic-rs` everywhere, no second parser pulled in for one layer).
    #[must_use]
    pub fn project_config_path(&self) -> PathBuf {
        self.project_dir.join("crucible.toml")
    }

    fn load_layer(path: &Path) -> Option<PartialSettings> {
        let content = std::fs::read_to_string(path).ok()?;
        sonic_rs::from_str(&content)
            .inspect_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable config layer");
            })
            .ok()
    }

    /// Resolves the final [`Settings`] by layering every source in precedence order.
    ///
    /// # Errors
    /// Only the built-in defaults computation (platform directory lookup) can fail; file
    /// layers that are missing or malformed are skipped rather than propagated.
    pub fn resolve(&self) -> Result<Settings> {
        let dirs = ProjectDirs::from("", "", "crucible");
        let default_install_root = dirs
            .as_ref()
            .map_or_else(|| PathBuf::from(".crucible/opt"), |d| d.data_dir().join("opt"));
        let default_mirror_dir = dirs
            .as_ref()
            .map_or_else(|| PathBuf::from(".crucible/cache"), |d| d.cache_dir().join("mirror"));

        let mut settings = Settings::defaults(default_install_root, default_mirror_dir);

        if let Some(system) = Self::load_layer(&Self::system_config_path()) {
            settings = settings.apply(&system);
        }
        if let Some(user_path) = Self::user_config_path()
            && let Some(user) = Self::load_layer(&user_path)
        {
            settings = settings.apply(&user);
        }
        if let Some(project) = Self::load_layer(&self.project_config_path()) {
            settings = settings.apply(&project);
        }

        settings = settings.apply(&env::from_env());
        settings = settings.apply(&self.cli_overrides);

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_file_is_skipped_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(tmp.path());
        let settings = loader.resolve().unwrap();
        assert!(settings.default_jobs >= 1);
    }

    #[test]
    fn project_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("crucible.toml"),
            r#"{"default_jobs": 3, "checksum_required": false}"#,
        )
        .unwrap();
        let loader = ConfigLoader::new(tmp.path());
        let settings = loader.resolve().unwrap();
        assert_eq!(settings.default_jobs, 3);
        assert!(!settings.checksum_required);
    }

    #[test]
    fn cli_overrides_win_over_everything() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("crucible.toml"), r#"{"default_jobs": 3}"#).unwrap();
        let loader = ConfigLoader::new(tmp.path()).with_cli_overrides(PartialSettings {
            default_jobs: Some(99),
            ..Default::default()
        });
        let settings = loader.resolve().unwrap();
        assert_eq!(settings.default_jobs, 99);
    }

    #[test]
    fn source_precedence_is_ascending() {
        assert!(ConfigSource::Defaults < ConfigSource::System);
        assert!(ConfigSource::Environment < ConfigSource::Cli);
    }
}
