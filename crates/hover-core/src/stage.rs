//! Copy the cached engine into an application output directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hover_schema::PlatformKey;
use hover_schema::files::{ARTIFACTS_DIR, ICU_DATA, engine_files};
use thiserror::Error;

/// Errors raised while staging engine files.
#[derive(Error, Debug)]
pub enum StageError {
    /// A stale copy in the output directory could not be removed.
    #[error("Failed to remove old engine {path}")]
    RemoveStale {
        /// Stale path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A file could not be copied out of the cache.
    #[error("Failed to copy {file}")]
    Copy {
        /// File name relative to the cache entry
        file: String,
        /// Underlying error
        source: io::Error,
    },
}

/// Copy the engine file set and ICU data from `cache_path` into `output_dir`.
///
/// Existing copies are removed first so a previous engine never lingers.
/// Framework bundles are copied with their symlinks intact.
///
/// # Errors
///
/// Any missing source or failed copy aborts staging.
pub fn stage_engine(
    key: PlatformKey,
    cache_path: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, StageError> {
    let mut staged = Vec::new();

    for file in engine_files(key.target_os, key.mode) {
        let dest = output_dir.join(file);
        remove_existing(&dest).map_err(|source| StageError::RemoveStale {
            path: dest.clone(),
            source,
        })?;
        copy_tree(&cache_path.join(file), &dest).map_err(|source| StageError::Copy {
            file: (*file).to_string(),
            source,
        })?;
        staged.push(dest);
    }

    let icu = output_dir.join(ICU_DATA);
    copy_tree(&cache_path.join(ARTIFACTS_DIR).join(ICU_DATA), &icu).map_err(|source| {
        StageError::Copy {
            file: format!("{ARTIFACTS_DIR}/{ICU_DATA}"),
            source,
        }
    })?;
    staged.push(icu);

    tracing::debug!(
        platform = %key,
        output = %output_dir.display(),
        files = staged.len(),
        "staged engine"
    );
    Ok(staged)
}

fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copy a file or directory tree, recreating symlinks instead of following them.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if !fs::symlink_metadata(src)?.is_dir() {
        return copy_entry(src, dst);
    }

    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_entry(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn copy_entry(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let meta = fs::symlink_metadata(src)?;
    if meta.is_symlink() {
        remove_existing(dst)?;
        let target = fs::read_link(src)?;
        #[cfg(unix)]
        return std::os::unix::fs::symlink(target, dst);
        #[cfg(not(unix))]
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot recreate symlink to {}", target.display()),
        ));
    }
    fs::copy(src, dst).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hover_schema::{BuildMode, TargetOs};
    use tempfile::tempdir;

    fn seed_cache(cache: &Path, files: &[&str]) {
        fs::create_dir_all(cache.join(ARTIFACTS_DIR)).unwrap();
        fs::write(cache.join(ARTIFACTS_DIR).join(ICU_DATA), b"icu").unwrap();
        for file in files {
            fs::write(cache.join(file), file.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_stage_replaces_stale_engine() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let out = dir.path().join("out");
        seed_cache(&cache, &["libflutter_engine.so"]);
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("libflutter_engine.so"), b"old").unwrap();

        let key = PlatformKey::new(TargetOs::Linux, BuildMode::Debug);
        let staged = stage_engine(key, &cache, &out).unwrap();

        assert_eq!(staged, vec![out.join("libflutter_engine.so"), out.join(ICU_DATA)]);
        assert_eq!(
            fs::read(out.join("libflutter_engine.so")).unwrap(),
            b"libflutter_engine.so"
        );
        assert_eq!(fs::read(out.join(ICU_DATA)).unwrap(), b"icu");
    }

    #[test]
    fn test_stage_missing_engine_is_error() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        seed_cache(&cache, &["flutter_engine.dll"]);

        let key = PlatformKey::new(TargetOs::Windows, BuildMode::Debug);
        let err = stage_engine(key, &cache, &dir.path().join("out")).unwrap_err();
        assert!(
            matches!(err, StageError::Copy { ref file, .. } if file == "flutter_engine.dll.lib")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_framework_keeps_symlinks() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let out = dir.path().join("out");
        seed_cache(&cache, &[]);

        let framework = cache.join("FlutterMacOS.framework");
        fs::create_dir_all(framework.join("Versions/A")).unwrap();
        fs::write(framework.join("Versions/A/FlutterMacOS"), b"dylib").unwrap();
        std::os::unix::fs::symlink("A", framework.join("Versions/Current")).unwrap();
        std::os::unix::fs::symlink(
            "Versions/Current/FlutterMacOS",
            framework.join("FlutterMacOS"),
        )
        .unwrap();

        let key = PlatformKey::new(TargetOs::Darwin, BuildMode::Debug);
        stage_engine(key, &cache, &out).unwrap();

        let staged = out.join("FlutterMacOS.framework");
        assert_eq!(
            fs::read_link(staged.join("Versions/Current")).unwrap(),
            PathBuf::from("A")
        );
        assert_eq!(fs::read(staged.join("FlutterMacOS")).unwrap(), b"dylib");
    }
}
