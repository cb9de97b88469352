//! The closed error taxonomy surfaced by the lifecycle engine.
//!
//! Every variant carries a stable [`ErrorCode`] (for CLI exit-code mapping and documentation
//! cross-referencing) and a short message; several carry a long explanation or a wrapped
//! source error. Construction goes through the `Error::*` associated functions below rather
//! than through variant literals, so call sites read as intent ("missing install method") and
//! the taxonomy can grow fields without breaking callers.

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Stable per-variant identifier, independent of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Fetch,
    Install,
    ExternalPackage,
    PackageStillNeeded,
    Package,
    PackageVersion,
    VersionFetch,
    NoUrl,
    ExtensionConflict,
    Activation,
    DependencyConflict,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Install => "install",
            Self::ExternalPackage => "external-package",
            Self::PackageStillNeeded => "package-still-needed",
            Self::Package => "package",
            Self::PackageVersion => "package-version",
            Self::VersionFetch => "version-fetch",
            Self::NoUrl => "no-url",
            Self::ExtensionConflict => "extension-conflict",
            Self::Activation => "activation",
            Self::DependencyConflict => "dependency-conflict",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wraps an [`ErrorCode`] so it can be attached to an [`Error`] variant as `#[source]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCodeSource(pub ErrorCode);

impl fmt::Display for ErrorCodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorCodeSource {}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("[{code}] fetch failed: {message}")]
    Fetch {
        message: String,
        #[source]
        code: ErrorCodeSource,
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[{code}] install failed: {message}")]
    Install {
        message: String,
        #[source]
        code: ErrorCodeSource,
        build_log: Option<PathBuf>,
    },

    #[error("[{code}] {name} is provided externally and cannot be installed")]
    ExternalPackage {
        name: String,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] {name} is still needed by: {}", dependents.join(", "))]
    PackageStillNeeded {
        name: String,
        dependents: Vec<String>,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] package error: {message}")]
    Package {
        message: String,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] package {name} has no version {version}")]
    PackageVersion {
        name: String,
        version: String,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] could not determine a fetchable version for {name}")]
    VersionFetch {
        name: String,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] no URL could be resolved for {name}@{version}")]
    NoUrl {
        name: String,
        version: String,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] extension conflict at {}", path.display())]
    ExtensionConflict {
        path: PathBuf,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] activation error: {message}")]
    Activation {
        message: String,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("[{code}] dependency conflict: {message}")]
    DependencyConflict {
        message: String,
        #[source]
        code: ErrorCodeSource,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] sonic_rs::Error),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Fetch { code, .. }
            | Self::ExternalPackage { code, .. }
            | Self::PackageStillNeeded { code, .. }
            | Self::Package { code, .. }
            | Self::PackageVersion { code, .. }
            | Self::VersionFetch { code, .. }
            | Self::NoUrl { code, .. }
            | Self::ExtensionConflict { code, .. }
            | Self::Activation { code, .. }
            | Self::DependencyConflict { code, .. } => code.0,
            Self::Install { code, .. } => code.0,
            Self::Io { .. } | Self::Json(_) => ErrorCode::Install,
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            code: ErrorCodeSource(ErrorCode::Fetch),
            cause: None,
        }
    }

    pub fn fetch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            code: ErrorCodeSource(ErrorCode::Fetch),
            cause: Some(Box::new(source)),
        }
    }

    pub fn install(message: impl Into<String>) -> Self {
        Self::Install {
            message: message.into(),
            code: ErrorCodeSource(ErrorCode::Install),
            build_log: None,
        }
    }

    /// Annotates an install failure with the build-log path, mirroring a caught
    /// build-process error's path annotation.
    pub fn install_with_log(message: impl Into<String>, build_log: PathBuf) -> Self {
        Self::Install {
            message: message.into(),
            code: ErrorCodeSource(ErrorCode::Install),
            build_log: Some(build_log),
        }
    }

    pub fn external_package(name: impl Into<String>) -> Self {
        Self::ExternalPackage {
            name: name.into(),
            code: ErrorCodeSource(ErrorCode::ExternalPackage),
        }
    }

    pub fn package_still_needed(name: impl Into<String>, dependents: Vec<String>) -> Self {
        Self::PackageStillNeeded {
            name: name.into(),
            dependents,
            code: ErrorCodeSource(ErrorCode::PackageStillNeeded),
        }
    }

    pub fn package(message: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            code: ErrorCodeSource(ErrorCode::Package),
        }
    }

    pub fn package_version(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::PackageVersion {
            name: name.into(),
            version: version.into(),
            code: ErrorCodeSource(ErrorCode::PackageVersion),
        }
    }

    pub fn version_fetch(name: impl Into<String>) -> Self {
        Self::VersionFetch {
            name: name.into(),
            code: ErrorCodeSource(ErrorCode::VersionFetch),
        }
    }

    pub fn no_url(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::NoUrl {
            name: name.into(),
            version: version.into(),
            code: ErrorCodeSource(ErrorCode::NoUrl),
        }
    }

    pub fn extension_conflict(path: impl Into<PathBuf>) -> Self {
        Self::ExtensionConflict {
            path: path.into(),
            code: ErrorCodeSource(ErrorCode::ExtensionConflict),
        }
    }

    pub fn activation(message: impl Into<String>) -> Self {
        Self::Activation {
            message: message.into(),
            code: ErrorCodeSource(ErrorCode::Activation),
        }
    }

    pub fn dependency_conflict(message: impl Into<String>) -> Self {
        Self::DependencyConflict {
            message: message.into(),
            code: ErrorCodeSource(ErrorCode::DependencyConflict),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Renders the short message plus, for install failures, the build-log path — matching
    /// the operator-facing detail the driver is required to surface.
    pub fn display_with_context(&self) -> String {
        match self {
            Self::Install {
                message,
                build_log: Some(log),
                ..
            } => format!("{message}\n see build log: {}", log.display()),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_display() {
        let err = Error::no_url("foo", "1.2.3");
        assert_eq!(err.code(), ErrorCode::NoUrl);
        assert_eq!(err.code().as_str(), "no-url");
    }

    #[test]
    fn install_with_log_surfaces_path_in_context() {
        let err = Error::install_with_log("build failed", PathBuf::from("/prefix/spack-build.out"));
        let rendered = err.display_with_context();
        assert!(rendered.contains("spack-build.out"));
    }

    #[test]
    fn package_still_needed_lists_dependents() {
        let err = Error::package_still_needed("zlib", vec!["curl".into(), "openssl".into()]);
        assert!(err.to_string().contains("curl"));
        assert!(err.to_string().contains("openssl"));
    }
}
