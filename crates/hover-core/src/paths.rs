//! Filesystem locations used by the engine cache.

use std::path::{Path, PathBuf};

use hover_schema::PlatformKey;

/// Returns the default cache root, or None if no cache directory can be resolved.
///
/// `HOVER_CACHE_PATH` overrides the platform cache directory.
pub fn default_cache_root() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("HOVER_CACHE_PATH") {
        return Some(PathBuf::from(val));
    }
    dirs::cache_dir()
}

/// Lock file serializing cache population for one platform: `<root>/hover/engine/<platform>.lock`
pub fn engine_lock_path(cache_root: &Path, key: PlatformKey) -> PathBuf {
    cache_root
        .join("hover")
        .join("engine")
        .join(format!("{}.lock", key.platform()))
}

/// True if the path contains any whitespace.
///
/// Cache paths end up inside space-separated linker flag strings, so any
/// whitespace corrupts the native build.
pub fn has_whitespace(path: &Path) -> bool {
    path.to_string_lossy().chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hover_schema::{BuildMode, TargetOs};

    #[test]
    fn test_lock_path_sits_next_to_cache_entry() {
        let key = PlatformKey::new(TargetOs::Linux, BuildMode::Release);
        let root = Path::new("/c");
        let lock = engine_lock_path(root, key);
        assert_eq!(lock, Path::new("/c/hover/engine/linux-x64-release.lock"));
        assert!(!lock.starts_with(key.cache_path(root)));
    }

    #[test]
    fn test_has_whitespace() {
        assert!(has_whitespace(Path::new("/Users/Jane Doe/cache")));
        assert!(has_whitespace(Path::new("/tmp/tab\there")));
        assert!(!has_whitespace(Path::new("/home/jane/.cache")));
    }
}
