//! The resolved, layered settings value.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Every field is optional at the file layer so a partially-specified file only overrides the
/// fields it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartialSettings {
    pub install_root: Option<PathBuf>,
    pub mirror_dir: Option<PathBuf>,
    pub default_jobs: Option<u32>,
    pub keep_prefix_default: Option<bool>,
    pub keep_stage_default: Option<bool>,
    pub checksum_required: Option<bool>,
    pub verbose_default: Option<bool>,
}

impl PartialSettings {
    /// Overlays `other`'s `Some` fields on top of `self`; `other` wins field-by-field.
    #[must_use]
    pub fn merged_with(mut self, other: Self) -> Self {
        if other.install_root.is_some() {
            self.install_root = other.install_root;
        }
        if other.mirror_dir.is_some() {
            self.mirror_dir = other.mirror_dir;
        }
        if other.default_jobs.is_some() {
            self.default_jobs = other.default_jobs;
        }
        if other.keep_prefix_default.is_some() {
            self.keep_prefix_default = other.keep_prefix_default;
        }
        if other.keep_stage_default.is_some() {
            self.keep_stage_default = other.keep_stage_default;
        }
        if other.checksum_required.is_some() {
            self.checksum_required = other.checksum_required;
        }
        if other.verbose_default.is_some() {
            self.verbose_default = other.verbose_default;
        }
        self
    }
}

/// The fully-resolved settings the driver and CLI act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub install_root: PathBuf,
    pub mirror_dir: PathBuf,
    pub default_jobs: u32,
    pub keep_prefix_default: bool,
    pub keep_stage_default: bool,
    pub checksum_required: bool,
    pub verbose_default: bool,
}

impl Settings {
    /// Built-in defaults (the lowest-precedence layer).
    #[must_use]
    pub fn defaults(platform_install_root: PathBuf, platform_mirror_dir: PathBuf) -> Self {
        Self {
            install_root: platform_install_root,
            mirror_dir: platform_mirror_dir,
            default_jobs: std::thread::available_parallelism()
                .map_or(1, std::num::NonZeroUsize::get) as u32,
            keep_prefix_default: false,
            keep_stage_default: false,
            checksum_required: true,
            verbose_default: false,
        }
    }

    /// Applies a partial layer on top of these settings, field-by-field.
    #[must_use]
    pub fn apply(mut self, partial: &PartialSettings) -> Self {
        if let Some(v) = &partial.install_root {
            self.install_root = v.clone();
        }
        if let Some(v) = &partial.mirror_dir {
            self.mirror_dir = v.clone();
        }
        if let Some(v) = partial.default_jobs {
            self.default_jobs = v;
        }
        if let Some(v) = partial.keep_prefix_default {
            self.keep_prefix_default = v;
        }
        if let Some(v) = partial.keep_stage_default {
            self.keep_stage_default = v;
        }
        if let Some(v) = partial.checksum_required {
            self.checksum_required = v;
        }
        if let Some(v) = partial.verbose_default {
            self.verbose_default = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_with_only_overrides_present_fields() {
        let base = PartialSettings {
            install_root: Some(PathBuf::from("/base")),
            default_jobs: Some(4),
            ..Default::default()
        };
        let override_layer = PartialSettings {
            default_jobs: Some(8),
            ..Default::default()
        };
        let merged = base.merged_with(override_layer);
        assert_eq!(merged.install_root, Some(PathBuf::from("/base")));
        assert_eq!(merged.default_jobs, Some(8));
    }

    #[test]
    fn apply_leaves_unset_fields_untouched() {
        let settings = Settings::defaults(PathBuf::from("/install"), PathBuf::from("/mirror"))
            .apply(&PartialSettings {
                default_jobs: Some(16),
                ..Default::default()
            });
        assert_eq!(settings.default_jobs, 16);
        assert_eq!(settings.install_root, PathBuf::from("/install"));
    }
}
