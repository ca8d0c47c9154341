//! Required engine version lookup.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while resolving the required engine version.
#[derive(Error, Debug)]
pub enum VersionSourceError {
    /// No `flutter` executable on `PATH`.
    #[error("Failed to locate flutter on PATH")]
    NotInstalled(#[from] which::Error),

    /// The SDK layout is not what a Flutter checkout looks like.
    #[error("Failed to resolve the Flutter SDK root from {0}")]
    UnknownLayout(PathBuf),

    /// `engine.version` is missing or unreadable.
    #[error("Failed to read {path}")]
    Read {
        /// Version file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// `engine.version` is empty.
    #[error("{0} is empty")]
    Empty(PathBuf),
}

/// Supplies the engine version a build requires when none was configured.
pub trait EngineVersionSource: Send + Sync {
    /// Resolve the required engine version.
    ///
    /// # Errors
    ///
    /// Returns an error if no version can be determined.
    fn required_engine_version(&self) -> Result<String, VersionSourceError>;
}

/// Reads the version pinned by the Flutter SDK found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlutterSdk;

impl FlutterSdk {
    /// `<sdk>/bin/internal/engine.version` for a `flutter` executable path.
    ///
    /// The executable path is canonicalized first so shims and symlinked
    /// installs resolve to the real checkout.
    ///
    /// # Errors
    ///
    /// Returns [`VersionSourceError::UnknownLayout`] for a path without a parent.
    pub fn engine_version_file(flutter: &Path) -> Result<PathBuf, VersionSourceError> {
        let resolved = std::fs::canonicalize(flutter).unwrap_or_else(|_| flutter.to_path_buf());
        let bin = resolved
            .parent()
            .ok_or_else(|| VersionSourceError::UnknownLayout(resolved.clone()))?;
        Ok(bin.join("internal").join("engine.version"))
    }
}

impl EngineVersionSource for FlutterSdk {
    fn required_engine_version(&self) -> Result<String, VersionSourceError> {
        let flutter = which::which("flutter")?;
        read_version_file(&Self::engine_version_file(&flutter)?)
    }
}

/// A version known up front.
#[derive(Debug, Clone)]
pub struct FixedVersion(
    /// The version
    pub String,
);

impl EngineVersionSource for FixedVersion {
    fn required_engine_version(&self) -> Result<String, VersionSourceError> {
        Ok(self.0.clone())
    }
}

fn read_version_file(path: &Path) -> Result<String, VersionSourceError> {
    let text = std::fs::read_to_string(path).map_err(|source| VersionSourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let version = text.trim();
    if version.is_empty() {
        return Err(VersionSourceError::Empty(path.to_path_buf()));
    }
    tracing::debug!(version, file = %path.display(), "resolved engine version from Flutter SDK");
    Ok(version.to_string())
}
