//! Environment-variable override layer: reads a fixed set of named variables and leaves
//! everything else untouched.

use std::path::PathBuf;

use crate::settings::PartialSettings;

const PREFIX: &str = "CRUCIBLE_";

/// Reads `CRUCIBLE_*` environment variables into a [`PartialSettings`] layer.
#[must_use]
pub fn from_env() -> PartialSettings {
    from_env_iter(std::env::vars())
}

fn from_env_iter(vars: impl Iterator<Item = (String, String)>) -> PartialSettings {
    let mut partial = PartialSettings::default();
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(PREFIX) else {
            continue;
        };
        match name {
            "INSTALL_ROOT" => partial.install_root = Some(PathBuf::from(value)),
            "MIRROR_DIR" => partial.mirror_dir = Some(PathBuf::from(value)),
            "DEFAULT_JOBS" => partial.default_jobs = value.parse().ok(),
            "KEEP_PREFIX" => partial.keep_prefix_default = parse_bool(&value),
            "KEEP_STAGE" => partial.keep_stage_default = parse_bool(&value),
            "CHECKSUM_REQUIRED" => partial.checksum_required = parse_bool(&value),
            "VERBOSE" => partial.verbose_default = parse_bool(&value),
            _ => {}
        }
    }
    partial
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_recognized_variables_only() {
        let vars = vec![
            ("CRUCIBLE_DEFAULT_JOBS".to_string(), "12".to_string()),
            ("CRUCIBLE_VERBOSE".to_string(), "true".to_string()),
            ("UNRELATED_VAR".to_string(), "nope".to_string()),
        ];
        let partial = from_env_iter(vars.into_iter());
        assert_eq!(partial.default_jobs, Some(12));
        assert_eq!(partial.verbose_default, Some(true));
        assert_eq!(partial.install_root, None);
    }

    #[test]
    fn unparseable_values_are_skipped_not_errors() {
        let vars = vec![("CRUCIBLE_DEFAULT_JOBS".to_string(), "not-a-number".to_string())];
        let partial = from_env_iter(vars.into_iter());
        assert_eq!(partial.default_jobs, None);
    }
}
