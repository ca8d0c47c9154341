//! Cache keys for engine artifacts.
//!
//! A [`PlatformKey`] names one engine cache directory. Builds that differ in
//! AOT-ness or mode name never share a directory; builds with the same key
//! always do.

use std::path::{Path, PathBuf};

use crate::{BuildMode, TargetOs};

/// Only x64 engines are published for desktop targets.
pub const BASE_ARCH: &str = "x64";

/// `(target_os, base_arch, mode)` triple identifying an engine cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformKey {
    /// Target operating system
    pub target_os: TargetOs,
    /// Build mode
    pub mode: BuildMode,
}

impl PlatformKey {
    /// Build the key for a target and mode.
    pub fn new(target_os: TargetOs, mode: BuildMode) -> Self {
        Self { target_os, mode }
    }

    /// Platform without the mode suffix, e.g. `linux-x64`.
    ///
    /// Used to select mode-independent artifacts (`artifacts.zip`, the Dart SDK).
    pub fn base_platform(&self) -> String {
        format!("{}-{BASE_ARCH}", self.target_os)
    }

    /// Full platform, e.g. `linux-x64-release`.
    ///
    /// The mode name is only appended for AOT modes.
    pub fn platform(&self) -> String {
        let base = self.base_platform();
        if self.mode.is_aot() {
            format!("{base}-{}", self.mode.name())
        } else {
            base
        }
    }

    /// Directory holding this key's engine cache below `cache_root`.
    pub fn cache_path(&self, cache_root: &Path) -> PathBuf {
        cache_root.join("hover").join("engine").join(self.platform())
    }
}

impl std::fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.platform())
    }
}

/// Engine cache directory for a target and mode. Pure; performs no I/O.
pub fn engine_cache_path(target_os: TargetOs, cache_root: &Path, mode: BuildMode) -> PathBuf {
    PlatformKey::new(target_os, mode).cache_path(cache_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_platform_names() {
        let debug = PlatformKey::new(TargetOs::Linux, BuildMode::Debug);
        assert_eq!(debug.base_platform(), "linux-x64");
        assert_eq!(debug.platform(), "linux-x64");

        let release = PlatformKey::new(TargetOs::Darwin, BuildMode::Release);
        assert_eq!(release.base_platform(), "darwin-x64");
        assert_eq!(release.platform(), "darwin-x64-release");
    }

    #[test]
    fn test_cache_path_is_deterministic() {
        let root = Path::new("/cache");
        let a = engine_cache_path(TargetOs::Windows, root, BuildMode::Profile);
        let b = engine_cache_path(TargetOs::Windows, root, BuildMode::Profile);
        assert_eq!(a, b);
        assert_eq!(
            a,
            Path::new("/cache/hover/engine/windows-x64-profile").to_path_buf()
        );
    }

    #[test]
    fn test_distinct_modes_never_collide() {
        let root = Path::new("/cache");
        for target in TargetOs::ALL {
            let paths: HashSet<_> = [BuildMode::Debug, BuildMode::Profile, BuildMode::Release]
                .into_iter()
                .map(|mode| engine_cache_path(target, root, mode))
                .collect();
            assert_eq!(paths.len(), 3);
        }
    }
}
