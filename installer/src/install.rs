//! Installation of built headers into the repository.
//!
//! This module replaces the repository's `boost/` tree with a freshly built
//! one and relocates the release's license and readme next to it. Earlier
//! headers and version-stamped readmes are removed first so that two
//! releases never coexist.

use crate::error::{HeadersError, Result};
use crate::version::BoostVersion;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use walkdir::WalkDir;

/// License file shipped at the root of every Boost release.
pub const LICENSE_FILE: &str = "LICENSE_1_0.txt";

/// Readme file at the root of a Boost release.
pub const SOURCE_README: &str = "README.md";

/// Header directory name, both in the install prefix and the repository.
pub const HEADERS_DIR: &str = "boost";

const README_PATTERN: &str = "Boost_*_README.md";

/// Paths written by a successful installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledHeaders {
    /// The repository's header directory.
    pub headers: Utf8PathBuf,
    /// The relocated license file.
    pub license: Utf8PathBuf,
    /// The version-stamped readme.
    pub readme: Utf8PathBuf,
}

/// Moves build output into the repository.
pub struct HeaderInstaller {
    output_dir: Utf8PathBuf,
    version: BoostVersion,
}

impl HeaderInstaller {
    /// Create an installer for `version` targeting `output_dir`.
    #[must_use]
    pub fn new(output_dir: Utf8PathBuf, version: BoostVersion) -> Self {
        Self {
            output_dir,
            version,
        }
    }

    /// Where the header tree is installed.
    #[must_use]
    pub fn headers_path(&self) -> Utf8PathBuf {
        self.output_dir.join(HEADERS_DIR)
    }

    /// Where the license file is installed.
    #[must_use]
    pub fn license_path(&self) -> Utf8PathBuf {
        self.output_dir.join(LICENSE_FILE)
    }

    /// Where the version-stamped readme is installed.
    #[must_use]
    pub fn readme_path(&self) -> Utf8PathBuf {
        self.output_dir.join(self.version.readme_name())
    }

    /// Delete the existing header tree and every `Boost_*_README.md`.
    ///
    /// The two removals are independent: stale readmes are cleaned up even
    /// when no header tree exists. Returns the paths removed.
    ///
    /// # Errors
    ///
    /// Returns [`HeadersError::InstallFailed`] if a removal fails.
    pub fn remove_previous(&self) -> Result<Vec<Utf8PathBuf>> {
        let mut removed = Vec::new();

        let headers = self.headers_path();
        if headers.exists() {
            fs::remove_dir_all(&headers).map_err(|e| install_error(&headers, &e))?;
            removed.push(headers);
        }

        for readme in self.previous_readmes()? {
            fs::remove_file(&readme).map_err(|e| install_error(&readme, &e))?;
            removed.push(readme);
        }

        for path in &removed {
            log::debug!("removed {path}");
        }
        Ok(removed)
    }

    /// Replace the repository's headers with `built_headers` and relocate the
    /// license and readme from `source_dir`.
    ///
    /// Files are moved rather than copied.
    ///
    /// # Errors
    ///
    /// Returns [`HeadersError::InstallFailed`] if any removal or move fails.
    pub fn install(
        &self,
        built_headers: &Utf8Path,
        source_dir: &Utf8Path,
    ) -> Result<InstalledHeaders> {
        fs::create_dir_all(&self.output_dir).map_err(|e| install_error(&self.output_dir, &e))?;
        self.remove_previous()?;

        let installed = InstalledHeaders {
            headers: self.headers_path(),
            license: self.license_path(),
            readme: self.readme_path(),
        };
        move_path(built_headers, &installed.headers)?;
        move_path(&source_dir.join(LICENSE_FILE), &installed.license)?;
        move_path(&source_dir.join(SOURCE_README), &installed.readme)?;
        Ok(installed)
    }

    fn previous_readmes(&self) -> Result<Vec<Utf8PathBuf>> {
        let pattern = format!(
            "{}/{README_PATTERN}",
            glob::Pattern::escape(self.output_dir.as_str())
        );
        let paths = glob::glob(&pattern).map_err(|e| HeadersError::InstallFailed {
            path: self.output_dir.clone(),
            reason: e.to_string(),
        })?;

        paths
            .map(|entry| {
                let path = entry.map_err(|e| HeadersError::Io(e.into_error()))?;
                Utf8PathBuf::try_from(path)
                    .map_err(|e| HeadersError::NonUtf8Path { path: e.into_path_buf() })
            })
            .collect()
    }
}

/// Move `from` to `to`, copying and deleting when a rename would cross
/// filesystems.
///
/// # Errors
///
/// Returns [`HeadersError::InstallFailed`] naming the destination.
pub fn move_path(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!("{from} and {to} are on different devices; copying");
            copy_then_remove(from, to).map_err(|e| install_error(to, &e))
        }
        Err(err) => Err(HeadersError::InstallFailed {
            path: to.to_owned(),
            reason: format!("failed to move {from}: {err}"),
        }),
    }
}

fn copy_then_remove(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    if from.is_dir() {
        copy_tree(from, to)?;
        fs::remove_dir_all(from)
    } else {
        fs::copy(from, to)?;
        fs::remove_file(from)
    }
}

fn copy_tree(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = to.as_std_path().join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn install_error(path: &Utf8Path, err: &io::Error) -> HeadersError {
    HeadersError::InstallFailed {
        path: path.to_owned(),
        reason: err.to_string(),
    }
}
