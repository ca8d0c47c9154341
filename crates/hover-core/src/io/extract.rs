//! Archive extraction module
//!
//! Engine artifacts are published as zip archives. Every entry path must stay
//! inside the destination root; an entry that escapes it aborts extraction
//! before anything is written for it (Zip Slip protection).

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

/// Errors raised while extracting an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem failure while creating directories or files.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The archive itself is unreadable or corrupt.
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    /// An entry would be written outside the destination root.
    #[error("{entry}: illegal file path")]
    UnsafePath {
        /// Entry name as stored in the archive
        entry: String,
    },
}

/// Extract a zip archive into `dest_dir`.
///
/// Returns every path created, directories included, in archive order.
/// Unix permission bits stored in the archive are applied to files.
///
/// # Errors
///
/// The first failing entry aborts extraction. Entries written before it are
/// left on disk; callers must not assume extraction is atomic.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    fs::create_dir_all(dest_dir)?;
    let mut created = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractError::UnsafePath {
                entry: entry.name().to_string(),
            })?;
        let absolute_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            created.push(absolute_path);
            continue;
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }

        created.push(absolute_path);
    }

    tracing::debug!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        entries = created.len(),
        "extracted"
    );
    Ok(created)
}
