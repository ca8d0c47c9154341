//! Version-gated engine cache.
//!
//! A cache entry lives at `<root>/hover/engine/<platform>` and is valid only
//! if its `version` stamp equals the required engine version. Any other state
//! (no stamp, another version, a half-finished populate) is treated as absent:
//! the directory is purged and repopulated from scratch, and the stamp is
//! written last.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hover_schema::files::{ARTIFACTS_DIR, VERSION_STAMP};
use hover_schema::{PlatformKey, TargetOs};
use reqwest::Client;
use tempfile::TempDir;
use thiserror::Error;

use crate::assemble::{AssembleError, PlatformAssembler};
use crate::config::{BuildConfig, EngineConfig};
use crate::flutter::{EngineVersionSource, FlutterSdk, VersionSourceError};
use crate::io::download::{DownloadError, fetch};
use crate::io::extract::{ExtractError, extract_zip};
use crate::lock::{CacheLock, LockError};
use crate::paths::{engine_lock_path, has_whitespace};
use crate::reporter::Reporter;

/// Prefix of the per-populate scratch directory.
const SCRATCH_PREFIX: &str = "hover-engine-download";

/// Shown when the platform engine archive cannot be downloaded.
pub const ENGINE_UNAVAILABLE_HINT: &str = "That may mean no engine download is currently available \
     for this version, you'll have to wait for one to become available";

/// Errors raised while validating or populating the engine cache.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Cache paths end up in linker flags and must not contain whitespace.
    #[error(
        "Cannot save the engine to '{0}', engine cache is not compatible with path containing spaces. \
         Please run hover with another engine cache path, e.g. --cache-path \"C:\\cache\""
    )]
    WhitespaceInCachePath(PathBuf),

    /// The stamp exists but cannot be read.
    #[error("Failed to read cached engine version")]
    ReadStamp(#[source] std::io::Error),

    /// No engine version was configured and none could be resolved.
    #[error("Failed to determine the required engine version")]
    VersionSource(#[from] VersionSourceError),

    /// Filesystem failure on the cache entry.
    #[error("Failed to {action} {path}")]
    Io {
        /// What was attempted
        action: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// An artifact could not be downloaded.
    #[error("Failed to download {artifact}")]
    Download {
        /// Artifact label
        artifact: &'static str,
        /// Underlying error
        source: DownloadError,
    },

    /// An artifact archive could not be extracted.
    #[error("Failed to extract {artifact}")]
    Extract {
        /// Artifact label
        artifact: &'static str,
        /// Underlying error
        source: ExtractError,
    },

    /// Platform assembly failed.
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    /// The population lock could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of [`EngineCache::validate_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCacheOutcome {
    /// The stamp matched; nothing was touched.
    Reused,
    /// The entry was purged and downloaded again.
    Populated,
}

/// Download URLs of one engine version for one platform key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUrls {
    /// `artifacts.zip` (ICU data, frontend snapshot, Darwin `gen_snapshot`)
    pub artifacts: String,
    /// Dart SDK archive, AOT only
    pub dart_sdk: String,
    /// Patched platform SDK archive, AOT only
    pub patched_sdk: String,
    /// Platform engine archive
    pub engine: String,
}

impl ArtifactUrls {
    /// URLs below `base` for `version`.
    pub fn new(base: &str, version: &str, key: PlatformKey) -> Self {
        let root = format!("{}/flutter_infra/flutter/{version}", base.trim_end_matches('/'));
        let base_platform = key.base_platform();
        Self {
            artifacts: format!("{root}/{base_platform}/artifacts.zip"),
            dart_sdk: format!("{root}/dart-sdk-{base_platform}.zip"),
            patched_sdk: format!("{root}/flutter_patched_sdk_product.zip"),
            engine: format!(
                "{root}/{}/{}",
                key.platform(),
                key.target_os.engine_archive_name()
            ),
        }
    }
}

/// Engine cache manager.
pub struct EngineCache {
    client: Client,
    config: EngineConfig,
    reporter: Arc<dyn Reporter>,
    versions: Box<dyn EngineVersionSource>,
}

impl fmt::Debug for EngineCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EngineCache {
    /// Create a manager resolving unset engine versions from the Flutter SDK on `PATH`.
    pub fn new(client: Client, config: EngineConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            config,
            reporter,
            versions: Box::new(FlutterSdk),
        }
    }

    /// Replace the engine version source.
    pub fn with_version_source(mut self, source: impl EngineVersionSource + 'static) -> Self {
        self.versions = Box::new(source);
        self
    }

    /// Ensure the cache entry for `build` holds the required engine version.
    ///
    /// A matching stamp returns immediately without network access, writes or
    /// locking. Otherwise the entry is purged and repopulated under the
    /// platform's lock, and the stamp is written as the final step.
    ///
    /// # Errors
    ///
    /// Every failure is fatal and leaves the entry without a stamp.
    pub async fn validate_or_update(
        &self,
        build: &BuildConfig,
    ) -> Result<EngineCacheOutcome, EngineError> {
        let key = build.key();
        let cache_path = key.cache_path(&build.cache_root);

        if has_whitespace(&cache_path) {
            return Err(EngineError::WhitespaceInCachePath(build.cache_root.clone()));
        }

        let required = if build.engine_version.is_empty() {
            self.versions.required_engine_version()?
        } else {
            build.engine_version.clone()
        };

        if read_stamp(&cache_path)? == required {
            tracing::debug!(platform = %key, version = %required, "stamp matches");
            self.reporter.info(&format!("Using engine from cache at version {required}"));
            return Ok(EngineCacheOutcome::Reused);
        }

        let lock_path = engine_lock_path(&build.cache_root, key);
        let _lock = tokio::task::spawn_blocking(move || CacheLock::acquire(&lock_path)).await??;

        // Another process may have populated the entry while we waited.
        if read_stamp(&cache_path)? == required {
            tracing::debug!(platform = %key, version = %required, "engine populated concurrently");
            self.reporter.info(&format!("Using engine from cache at version {required}"));
            return Ok(EngineCacheOutcome::Reused);
        }

        self.populate(key, &cache_path, &required).await?;
        Ok(EngineCacheOutcome::Populated)
    }

    /// Remove the cache entry of `build`. A missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn clean(&self, build: &BuildConfig) -> Result<bool, EngineError> {
        let cache_path = build.engine_cache_path();
        match std::fs::remove_dir_all(&cache_path) {
            Ok(()) => {
                tracing::info!(path = %cache_path.display(), "removed engine cache");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(EngineError::Io {
                action: "remove",
                path: cache_path,
                source,
            }),
        }
    }

    async fn populate(
        &self,
        key: PlatformKey,
        cache_path: &Path,
        version: &str,
    ) -> Result<(), EngineError> {
        let io_err = |action: &'static str, path: &Path| {
            let path = path.to_path_buf();
            move |source| EngineError::Io {
                action,
                path,
                source,
            }
        };

        match tokio::fs::remove_dir_all(cache_path).await {
            Ok(()) => tracing::debug!(path = %cache_path.display(), "purged outdated engine"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err("remove outdated engine at", cache_path)(e)),
        }
        tokio::fs::create_dir_all(cache_path)
            .await
            .map_err(io_err("create", cache_path))?;

        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(io_err("create scratch directory in", &std::env::temp_dir()))?;

        let urls = ArtifactUrls::new(&self.config.storage_base_url, version, key);
        self.reporter
            .section(&format!("Downloading engine for {key} at version {version}"));

        self.fetch_and_extract(
            &scratch,
            "artifacts",
            &urls.artifacts,
            &cache_path.join(ARTIFACTS_DIR),
        )
        .await?;

        if key.mode.is_aot() {
            self.fetch_and_extract(&scratch, "dart-sdk", &urls.dart_sdk, cache_path)
                .await?;
            self.fetch_and_extract(
                &scratch,
                "flutter_patched_sdk_product",
                &urls.patched_sdk,
                cache_path,
            )
            .await?;
        }

        let engine_root = scratch.path().join("engine");
        if let Err(e) = self
            .fetch_and_extract(&scratch, "engine", &urls.engine, &engine_root)
            .await
        {
            if matches!(e, EngineError::Download { .. }) {
                tracing::debug!(url = %urls.engine, "engine archive unavailable");
                self.reporter.info(ENGINE_UNAVAILABLE_HINT);
            }
            return Err(e);
        }

        let assembler = PlatformAssembler::new(key, cache_path, &self.config.strip_program);
        assembler.assemble(&engine_root)?;

        // Darwin ships gen_snapshot inside artifacts.zip.
        if key.mode.is_aot() && key.target_os != TargetOs::Darwin {
            assembler.relocate_gen_snapshot(&engine_root)?;
        }

        let stamp = cache_path.join(VERSION_STAMP);
        tokio::fs::write(&stamp, version)
            .await
            .map_err(io_err("write version file", &stamp))?;

        tracing::info!(platform = %key, version, "engine cache populated");
        Ok(())
    }

    async fn fetch_and_extract(
        &self,
        scratch: &TempDir,
        artifact: &'static str,
        url: &str,
        dest: &Path,
    ) -> Result<(), EngineError> {
        let archive = scratch.path().join(format!("{artifact}.zip"));
        tracing::debug!(artifact, url, "fetching");

        fetch(&self.client, url, &archive, artifact, self.reporter.as_ref())
            .await
            .map_err(|source| EngineError::Download { artifact, source })?;

        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_zip(&archive, &dest))
            .await?
            .map_err(|source| EngineError::Extract { artifact, source })?;
        Ok(())
    }
}

/// Read the version stamp; a missing stamp reads as empty.
fn read_stamp(cache_path: &Path) -> Result<String, EngineError> {
    match std::fs::read_to_string(cache_path.join(VERSION_STAMP)) {
        Ok(version) => Ok(version),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(EngineError::ReadStamp(e)),
    }
}
