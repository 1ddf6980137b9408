//! Resolved run configuration.
//!
//! [`HeadersConfig`] is built once from the CLI and then passed by reference
//! through the pipeline. All paths in it are absolute so that commands run in
//! other working directories still find them.

use crate::cli::{Cli, DEFAULT_LIBRARY};
use crate::digest::Sha256Digest;
use crate::download::{DEFAULT_MIRROR, release_url};
use crate::error::{HeadersError, Result};
use crate::version::BoostVersion;
use camino::{Utf8Path, Utf8PathBuf};

/// Name of the default patch directory under the output directory.
pub const PATCHES_DIR: &str = "patches";

/// Everything one run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersConfig {
    /// Boost release to fetch.
    pub version: BoostVersion,
    /// Boost library to build.
    pub library: String,
    /// Base URL of the release mirror.
    pub mirror: String,
    /// Repository directory receiving `boost/`, the license and the readme.
    pub output_dir: Utf8PathBuf,
    /// Directory scanned for `*.patch` files.
    pub patches_dir: Utf8PathBuf,
    /// Directory receiving the build logs.
    pub log_dir: Utf8PathBuf,
    /// Parent for temporary files; `None` uses the system temp directory.
    pub scratch_dir: Option<Utf8PathBuf>,
    /// Parallel `b2` jobs.
    pub jobs: Option<usize>,
    /// Digest the compressed download must match.
    pub expected_sha256: Option<Sha256Digest>,
    /// Skip patch application entirely.
    pub skip_patches: bool,
}

impl HeadersConfig {
    /// Default configuration for `version` installing into `output_dir`.
    ///
    /// # Example
    ///
    /// ```
    /// use boost_headers::config::HeadersConfig;
    /// use boost_headers::version::BoostVersion;
    /// use camino::Utf8PathBuf;
    ///
    /// let config = HeadersConfig::new(BoostVersion::new(1, 82, 0), Utf8PathBuf::from("/repo"));
    /// assert_eq!(config.patches_dir, "/repo/patches");
    /// assert_eq!(config.log_dir, "/repo");
    /// assert_eq!(config.library, "math");
    /// ```
    #[must_use]
    pub fn new(version: BoostVersion, output_dir: Utf8PathBuf) -> Self {
        Self {
            version,
            library: DEFAULT_LIBRARY.to_owned(),
            mirror: DEFAULT_MIRROR.to_owned(),
            patches_dir: output_dir.join(PATCHES_DIR),
            log_dir: output_dir.clone(),
            output_dir,
            scratch_dir: None,
            jobs: None,
            expected_sha256: None,
            skip_patches: false,
        }
    }

    /// Resolve CLI arguments, making relative paths absolute against
    /// `current_dir`.
    #[must_use]
    pub fn from_cli(cli: &Cli, current_dir: &Utf8Path) -> Self {
        let absolute = |path: &Utf8PathBuf| current_dir.join(path);
        let output_dir = cli
            .output_dir
            .as_ref()
            .map_or_else(|| current_dir.to_owned(), absolute);
        let defaults = Self::new(cli.boost_version, output_dir);

        Self {
            library: cli.library.clone(),
            mirror: cli.mirror.clone().unwrap_or_else(|| defaults.mirror.clone()),
            patches_dir: cli
                .patches_dir
                .as_ref()
                .map_or_else(|| defaults.patches_dir.clone(), absolute),
            log_dir: cli
                .log_dir
                .as_ref()
                .map_or_else(|| defaults.log_dir.clone(), absolute),
            scratch_dir: cli.temp_dir.as_ref().map(absolute),
            jobs: cli.jobs,
            expected_sha256: cli.sha256.clone(),
            skip_patches: cli.skip_patches,
            ..defaults
        }
    }

    /// Resolve CLI arguments against the process working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be read or is not
    /// valid UTF-8.
    pub fn from_cli_in_current_dir(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|err| HeadersError::NonUtf8Path { path: err.into_path_buf() })?;
        Ok(Self::from_cli(cli, &cwd))
    }

    /// The tarball URL for this release.
    #[must_use]
    pub fn url(&self) -> String {
        release_url(&self.mirror, &self.version)
    }
}
