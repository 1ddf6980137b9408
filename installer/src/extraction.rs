//! Tarball extraction for the Boost source distribution.
//!
//! Extracts a plain `.tar` archive to a target directory with path traversal
//! protection. The archive is opened by path, independently of the handle
//! the download wrote through.

use std::path::{Component, Path};

/// Trait for extracting source archives, enabling test mocking.
///
/// # Examples
///
/// ```no_run
/// use boost_headers::extraction::{ArchiveExtractor, TarExtractor};
/// use std::path::Path;
///
/// let entries = TarExtractor.extract(Path::new("boost.tar"), Path::new("out"))?;
/// assert!(entries > 0);
/// # Ok::<(), boost_headers::extraction::ExtractionError>(())
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the number of entries that were unpacked.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no entries are found.
    /// Returns [`ExtractionError::Io`] on I/O failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no entries.
    #[error("archive contains no entries")]
    EmptyArchive,
}

/// Default extractor using the `tar` crate.
///
/// Validates each entry path before extraction and unpacks entries only
/// inside the destination, so neither `..` paths nor symlinked parents can
/// write elsewhere (zip-slip). File modes are kept so the
/// bootstrap script stays executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl ArchiveExtractor for TarExtractor {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let mut archive = tar::Archive::new(std::io::BufReader::new(file));
        std::fs::create_dir_all(dest_dir)?;
        let mut unpacked = 0_usize;

        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let entry_path = entry.path()?.into_owned();

            validate_entry_path(&entry_path)?;

            // Refuses to write through links that resolve outside `dest_dir`.
            if !entry.unpack_in(dest_dir)? {
                return Err(ExtractionError::PathTraversal {
                    path: entry_path.display().to_string(),
                });
            }
            unpacked += 1;
        }

        if unpacked == 0 {
            return Err(ExtractionError::EmptyArchive);
        }

        log::debug!(
            "unpacked {unpacked} entries from {} into {}",
            archive_path.display(),
            dest_dir.display()
        );
        Ok(unpacked)
    }
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
