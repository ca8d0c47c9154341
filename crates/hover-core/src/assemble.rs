//! Platform-specific post-processing of a freshly extracted engine.
//!
//! - **Linux**: relocate the engine files, then strip the engine binary once.
//!   Stripping here keeps it off the per-build path.
//! - **Windows**: relocate the engine files.
//! - **Darwin**: unpack the nested framework archive and lay down the
//!   framework's symlink skeleton from a [`FrameworkLinkPlan`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use hover_schema::files::{engine_files, gen_snapshot_name};
use hover_schema::{PlatformKey, TargetOs};
use thiserror::Error;

use crate::io::extract::{ExtractError, extract_zip};

/// Errors raised while assembling the engine into its cache layout.
#[derive(Error, Debug)]
pub enum AssembleError {
    /// An engine file could not be moved into the cache.
    #[error("Failed to move downloaded {file}")]
    Relocate {
        /// File name relative to the extraction root
        file: String,
        /// Underlying error
        source: io::Error,
    },

    /// The nested framework archive could not be extracted.
    #[error("Failed to unzip engine framework")]
    Framework(#[from] ExtractError),

    /// A framework symlink could not be created.
    #[error("Failed to link {link}")]
    Link {
        /// Link path
        link: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The binary stripper is missing or failed.
    #[error("Failed to strip {path}: {detail}")]
    Strip {
        /// Stripped binary
        path: PathBuf,
        /// Tool diagnostics
        detail: String,
    },
}

/// One symlink of a framework bundle: `link` points at `target`.
///
/// `link` is relative to the framework root; `target` is stored verbatim and
/// therefore resolved relative to the link's parent directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkLink {
    /// Link location, relative to the framework root
    pub link: PathBuf,
    /// Link contents
    pub target: PathBuf,
}

/// Ordered symlink skeleton of a macOS `.framework` bundle.
///
/// `Versions/Current` comes first; every later link resolves through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkLinkPlan {
    links: Vec<FrameworkLink>,
}

impl FrameworkLinkPlan {
    /// Standard single-version layout for `library`.
    pub fn for_library(library: &str) -> Self {
        let current = Path::new("Versions").join("Current");
        let mut links = vec![FrameworkLink {
            link: current.clone(),
            target: PathBuf::from("A"),
        }];
        for name in [library, "Headers", "Modules", "Resources"] {
            links.push(FrameworkLink {
                link: PathBuf::from(name),
                target: current.join(name),
            });
        }
        Self { links }
    }

    /// The links in application order.
    pub fn links(&self) -> &[FrameworkLink] {
        &self.links
    }

    /// Create every link below `framework_root`, replacing whatever is there.
    ///
    /// Applying the same plan twice leaves the same tree.
    ///
    /// # Errors
    ///
    /// Returns the first link that cannot be replaced.
    pub fn apply(&self, framework_root: &Path) -> Result<(), AssembleError> {
        for entry in &self.links {
            let link = framework_root.join(&entry.link);
            replace_symlink(&entry.target, &link)
                .map_err(|source| AssembleError::Link { link, source })?;
        }
        Ok(())
    }
}

/// Point `link` at `target`, removing any existing entry at `link` first.
///
/// A missing entry is fine; an existing real directory is removed recursively.
///
/// # Errors
///
/// Returns an error if the old entry cannot be removed or the link cannot be created.
pub fn replace_symlink(target: &Path, link: &Path) -> io::Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(link)?,
        Ok(_) => fs::remove_file(link)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    symlink(target, link)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Move a file, falling back to copy + delete across filesystems.
///
/// Permissions travel with the copy.
pub fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    fs::copy(src, dest)?;
    fs::remove_file(src)
}

/// Relocates and transforms an extracted engine into its cache entry.
#[derive(Debug)]
pub struct PlatformAssembler<'a> {
    key: PlatformKey,
    cache_path: &'a Path,
    strip_program: &'a Path,
}

impl<'a> PlatformAssembler<'a> {
    /// Create an assembler writing into `cache_path`.
    pub fn new(key: PlatformKey, cache_path: &'a Path, strip_program: &'a Path) -> Self {
        Self {
            key,
            cache_path,
            strip_program,
        }
    }

    /// Turn the extracted engine archive at `extract_root` into the final layout.
    ///
    /// # Errors
    ///
    /// Any missing file, failed link, or failed strip aborts assembly.
    pub fn assemble(&self, extract_root: &Path) -> Result<(), AssembleError> {
        match self.key.target_os {
            TargetOs::Darwin => self.assemble_framework(extract_root),
            TargetOs::Linux => {
                self.relocate_engine_files(extract_root)?;
                self.strip_engine()
            }
            TargetOs::Windows => self.relocate_engine_files(extract_root),
        }
    }

    /// Move the snapshot generator shipped in the engine archive into the cache.
    ///
    /// Darwin ships it inside `artifacts.zip` instead.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::Relocate`] if the binary is missing.
    pub fn relocate_gen_snapshot(&self, extract_root: &Path) -> Result<(), AssembleError> {
        let name = gen_snapshot_name(self.key.target_os);
        self.relocate(extract_root, &name)
    }

    fn relocate_engine_files(&self, extract_root: &Path) -> Result<(), AssembleError> {
        for file in engine_files(self.key.target_os, self.key.mode) {
            self.relocate(extract_root, file)?;
        }
        Ok(())
    }

    fn relocate(&self, extract_root: &Path, file: &str) -> Result<(), AssembleError> {
        move_file(&extract_root.join(file), &self.cache_path.join(file)).map_err(|source| {
            AssembleError::Relocate {
                file: file.to_string(),
                source,
            }
        })
    }

    fn strip_engine(&self) -> Result<(), AssembleError> {
        let primary = engine_files(self.key.target_os, self.key.mode)[0];
        let path = self.cache_path.join(primary);
        let strip_err = |detail: String| AssembleError::Strip {
            path: path.clone(),
            detail,
        };

        let output = match Command::new(self.strip_program)
            .arg("-s")
            .arg(&path)
            .output()
        {
            Ok(o) => o,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(strip_err(format!(
                    "'{}' not found. Please install binutils",
                    self.strip_program.display()
                )));
            }
            Err(e) => return Err(strip_err(e.to_string())),
        };

        if !output.status.success() {
            return Err(strip_err(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        tracing::debug!(path = %path.display(), "stripped engine");
        Ok(())
    }

    fn assemble_framework(&self, extract_root: &Path) -> Result<(), AssembleError> {
        let library = self.key.target_os.library_name();
        let nested_zip = extract_root.join(format!("{library}.framework.zip"));
        let framework = self.cache_path.join(format!("{library}.framework"));

        extract_zip(&nested_zip, &framework)?;
        FrameworkLinkPlan::for_library(library).apply(&framework)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hover_schema::BuildMode;
    use tempfile::tempdir;

    #[test]
    fn test_link_plan_order() {
        let plan = FrameworkLinkPlan::for_library("FlutterMacOS");
        let links: Vec<_> = plan
            .links()
            .iter()
            .map(|l| (l.link.clone(), l.target.clone()))
            .collect();

        assert_eq!(links[0], (PathBuf::from("Versions/Current"), PathBuf::from("A")));
        assert_eq!(
            links[1],
            (
                PathBuf::from("FlutterMacOS"),
                PathBuf::from("Versions/Current/FlutterMacOS")
            )
        );
        assert_eq!(links.len(), 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_plan_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("Demo.framework");
        let version_a = root.join("Versions/A");
        for sub in ["Headers", "Modules", "Resources"] {
            fs::create_dir_all(version_a.join(sub)).unwrap();
        }
        fs::write(version_a.join("Demo"), b"dylib").unwrap();

        let plan = FrameworkLinkPlan::for_library("Demo");
        plan.apply(&root).unwrap();
        plan.apply(&root).unwrap();

        assert_eq!(
            fs::read_link(root.join("Versions/Current")).unwrap(),
            PathBuf::from("A")
        );
        assert_eq!(fs::read(root.join("Demo")).unwrap(), b"dylib");
        assert!(root.join("Headers").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_symlink_replaces_placeholder_file() {
        let dir = tempdir().unwrap();
        let link = dir.path().join("Current");
        // Archives without symlink support store the link target as a file.
        fs::write(&link, b"A").unwrap();
        fs::create_dir(dir.path().join("A")).unwrap();

        replace_symlink(Path::new("A"), &link).unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_windows_relocation_moves_every_engine_file() {
        let dir = tempdir().unwrap();
        let extract = dir.path().join("engine");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&extract).unwrap();
        fs::create_dir_all(&cache).unwrap();
        for file in engine_files(TargetOs::Windows, BuildMode::Debug) {
            fs::write(extract.join(file), file.as_bytes()).unwrap();
        }

        let key = PlatformKey::new(TargetOs::Windows, BuildMode::Debug);
        PlatformAssembler::new(key, &cache, Path::new("strip"))
            .assemble(&extract)
            .unwrap();

        for file in engine_files(TargetOs::Windows, BuildMode::Debug) {
            assert!(cache.join(file).exists());
            assert!(!extract.join(file).exists());
        }
    }

    #[test]
    fn test_missing_engine_file_is_error() {
        let dir = tempdir().unwrap();
        let key = PlatformKey::new(TargetOs::Windows, BuildMode::Debug);
        let err = PlatformAssembler::new(key, dir.path(), Path::new("strip"))
            .assemble(&dir.path().join("empty"))
            .unwrap_err();
        assert!(
            matches!(err, AssembleError::Relocate { ref file, .. } if file == "flutter_engine.dll")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_linux_strip_failure_is_error() {
        let dir = tempdir().unwrap();
        let extract = dir.path().join("engine");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&extract).unwrap();
        fs::write(extract.join("libflutter_engine.so"), b"so").unwrap();

        let key = PlatformKey::new(TargetOs::Linux, BuildMode::Debug);
        let err = PlatformAssembler::new(key, &cache, Path::new("false"))
            .assemble(&extract)
            .unwrap_err();
        assert!(matches!(err, AssembleError::Strip { .. }));
        // Relocation happened before the strip step.
        assert!(cache.join("libflutter_engine.so").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_linux_strip_runs_on_primary_engine() {
        let dir = tempdir().unwrap();
        let extract = dir.path().join("engine");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&extract).unwrap();
        fs::write(extract.join("libflutter_engine.so"), b"so").unwrap();

        let key = PlatformKey::new(TargetOs::Linux, BuildMode::Debug);
        PlatformAssembler::new(key, &cache, Path::new("true"))
            .assemble(&extract)
            .unwrap();
        assert!(cache.join("libflutter_engine.so").exists());
    }
}
