//! Explicit configuration values.
//!
//! Everything a build needs is resolved once into a [`BuildConfig`] and passed
//! by reference; nothing in the core reads process-wide mutable state.

use std::path::{Path, PathBuf};

use hover_schema::{BuildMode, PlatformKey, TargetOs};
use serde::Deserialize;
use thiserror::Error;

/// Default host for engine artifacts.
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Environment variable overriding [`DEFAULT_STORAGE_BASE_URL`] (mirror hosts).
pub const STORAGE_BASE_URL_ENV: &str = "FLUTTER_STORAGE_BASE_URL";

/// Default application entry point.
pub const DEFAULT_ENTRY_POINT: &str = "lib/main_desktop.dart";

/// Default OpenGL flavor compiled into the embedder.
pub const DEFAULT_OPENGL: &str = "3.3";

/// Project configuration file name.
pub const PROJECT_CONFIG_FILE: &str = "hover.toml";

/// Configuration errors. All are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// AOT snapshots can only be generated by the host's own toolchain.
    #[error("AOT builds currently only work on their host OS (target {target}, mode {mode})")]
    AotCrossCompile {
        /// Requested target
        target: TargetOs,
        /// Requested mode
        mode: BuildMode,
    },

    /// The project configuration file exists but cannot be read.
    #[error("Failed to read {path}")]
    Read {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The project configuration file is not valid TOML for [`ProjectConfig`].
    #[error("Failed to parse {path}")]
    Parse {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },
}

/// Where engine artifacts come from and which host tools post-process them.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the artifact bucket, without trailing slash
    pub storage_base_url: String,
    /// Binary stripper run once on the Linux engine after download
    pub strip_program: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
            strip_program: PathBuf::from("strip"),
        }
    }
}

impl EngineConfig {
    /// Load configuration, honouring `FLUTTER_STORAGE_BASE_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(STORAGE_BASE_URL_ENV)
            && !url.is_empty()
        {
            config.storage_base_url = url;
        }
        config
    }

    /// Replace the storage base URL (e.g. a local mirror or test server).
    pub fn with_storage_base_url(mut self, url: impl Into<String>) -> Self {
        self.storage_base_url = url.into();
        self
    }

    /// Replace the binary stripper.
    pub fn with_strip_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.strip_program = program.into();
        self
    }
}

/// Fully resolved parameters of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Target operating system
    pub target_os: TargetOs,
    /// Build mode
    pub mode: BuildMode,
    /// Root below which `hover/engine/<platform>` caches live
    pub cache_root: PathBuf,
    /// Required engine version; empty means "ask the installed Flutter SDK"
    pub engine_version: String,
    /// OpenGL flavor for the embedder build tag
    pub opengl: String,
    /// Project root; external tools run from here
    pub project_dir: PathBuf,
    /// Application entry point, relative to the project root
    pub entry_point: PathBuf,
    /// Directory receiving the assembled application
    pub output_dir: PathBuf,
}

impl BuildConfig {
    /// Create a configuration with defaults for everything but target, mode and cache root.
    pub fn new(target_os: TargetOs, mode: BuildMode, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            target_os,
            mode,
            cache_root: cache_root.into(),
            engine_version: String::new(),
            opengl: DEFAULT_OPENGL.to_string(),
            project_dir: PathBuf::from("."),
            entry_point: PathBuf::from(DEFAULT_ENTRY_POINT),
            output_dir: default_output_dir(Path::new("."), target_os),
        }
    }

    /// Set the required engine version.
    pub fn with_engine_version(mut self, version: impl Into<String>) -> Self {
        self.engine_version = version.into();
        self
    }

    /// Set the OpenGL flavor.
    pub fn with_opengl(mut self, opengl: impl Into<String>) -> Self {
        self.opengl = opengl.into();
        self
    }

    /// Set the project root. The output directory moves along with it.
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self.output_dir = default_output_dir(&self.project_dir, self.target_os);
        self
    }

    /// Set the entry point.
    pub fn with_entry_point(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entry_point = entry.into();
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Apply values from a project configuration where the caller left defaults.
    pub fn merge_project(mut self, project: &ProjectConfig) -> Self {
        if self.engine_version.is_empty()
            && let Some(engine) = &project.engine
        {
            tracing::warn!("changing the engine version can lead to undesirable behavior");
            self.engine_version.clone_from(engine);
        }
        if self.opengl == DEFAULT_OPENGL
            && let Some(opengl) = &project.opengl
        {
            self.opengl.clone_from(opengl);
        }
        if self.entry_point == Path::new(DEFAULT_ENTRY_POINT)
            && let Some(target) = &project.target
        {
            self.entry_point.clone_from(target);
        }
        self
    }

    /// Cache key of this build.
    pub fn key(&self) -> PlatformKey {
        PlatformKey::new(self.target_os, self.mode)
    }

    /// Engine cache directory of this build.
    pub fn engine_cache_path(&self) -> PathBuf {
        self.key().cache_path(&self.cache_root)
    }

    /// Reject combinations the toolchain cannot build.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AotCrossCompile`] for AOT builds targeting
    /// another operating system than the host.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for_host(TargetOs::host())
    }

    fn validate_for_host(&self, host: Option<TargetOs>) -> Result<(), ConfigError> {
        if self.mode.is_aot() && host != Some(self.target_os) {
            return Err(ConfigError::AotCrossCompile {
                target: self.target_os,
                mode: self.mode,
            });
        }
        Ok(())
    }
}

/// Default output directory: `<project>/go/build/outputs/<os>`.
pub fn default_output_dir(project_dir: &Path, target_os: TargetOs) -> PathBuf {
    project_dir
        .join("go")
        .join("build")
        .join("outputs")
        .join(target_os.as_str())
}

/// Optional per-project settings read from `hover.toml`.
///
/// ```toml
/// engine = "c9b6d8d6b3a7e1a4f7e0b4b1a5d0b8a6e2c4f1d3"
/// target = "lib/main_desktop.dart"
/// opengl = "none"
/// executable-name = "my_app"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    /// Pinned engine version
    pub engine: Option<String>,
    /// Entry point override
    pub target: Option<PathBuf>,
    /// OpenGL flavor override
    pub opengl: Option<String>,
    /// Name of the produced executable
    pub executable_name: Option<String>,
}

impl ProjectConfig {
    /// Load `hover.toml` from `project_dir`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(PROJECT_CONFIG_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_aot_requires_host_target() {
        let config = BuildConfig::new(TargetOs::Windows, BuildMode::Release, "/cache");
        assert!(matches!(
            config.validate_for_host(Some(TargetOs::Linux)),
            Err(ConfigError::AotCrossCompile { .. })
        ));
        assert!(config.validate_for_host(Some(TargetOs::Windows)).is_ok());

        let debug = BuildConfig::new(TargetOs::Windows, BuildMode::Debug, "/cache");
        assert!(debug.validate_for_host(Some(TargetOs::Linux)).is_ok());
    }

    #[test]
    fn test_project_config_missing_file_is_default() {
        let dir = tempdir().unwrap();
        assert_eq!(ProjectConfig::load(dir.path()).unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_project_config_parse_and_merge() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "engine = \"abc123\"\nopengl = \"none\"\nexecutable-name = \"demo\"\n",
        )
        .unwrap();

        let project = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(project.executable_name.as_deref(), Some("demo"));

        let config =
            BuildConfig::new(TargetOs::Linux, BuildMode::Debug, "/cache").merge_project(&project);
        assert_eq!(config.engine_version, "abc123");
        assert_eq!(config.opengl, "none");
        assert_eq!(config.entry_point, Path::new(DEFAULT_ENTRY_POINT));
    }

    #[test]
    fn test_explicit_values_win_over_project_config() {
        let project = ProjectConfig {
            engine: Some("from-file".into()),
            ..ProjectConfig::default()
        };
        let config = BuildConfig::new(TargetOs::Linux, BuildMode::Debug, "/cache")
            .with_engine_version("from-flag")
            .merge_project(&project);
        assert_eq!(config.engine_version, "from-flag");
    }

    #[test]
    fn test_project_config_rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "engin = \"typo\"\n").unwrap();
        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
