//! Boost build orchestration.
//!
//! Drives Boost's own toolchain in two steps: the bootstrap script configures
//! the private build system for a single library, then `b2 install` builds
//! it and lays out headers under a temporary prefix. Output from both goes to
//! log files so the console stays quiet.

use crate::command::{CommandRunner, Invocation};
use crate::error::{HeadersError, Result, describe_status};
use camino::{Utf8Path, Utf8PathBuf};

/// Name of the install prefix created next to the extracted source tree.
pub const INSTALL_PREFIX_DIR: &str = "boost_tmp_build";

/// Log file for the bootstrap step.
pub const BOOTSTRAP_LOG: &str = "bootstrap.log";

/// Log file for the build step.
pub const BUILD_LOG: &str = "b2.log";

/// Return the platform-specific bootstrap script, relative to the source root.
#[must_use]
pub const fn bootstrap_program() -> &'static str {
    #[cfg(windows)]
    {
        ".\\bootstrap.bat"
    }
    #[cfg(not(windows))]
    {
        "./bootstrap.sh"
    }
}

/// Return the platform-specific build tool, relative to the source root.
#[must_use]
pub const fn build_program() -> &'static str {
    #[cfg(windows)]
    {
        ".\\b2.exe"
    }
    #[cfg(not(windows))]
    {
        "./b2"
    }
}

/// Configuration for a Boost build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// The extracted `boost_X_Y_Z` directory.
    pub source_dir: Utf8PathBuf,
    /// Where `b2 install` puts its output.
    pub prefix: Utf8PathBuf,
    /// The single Boost library to build.
    pub library: String,
    /// Number of parallel `b2` jobs (None for the tool's default).
    pub jobs: Option<usize>,
    /// Directory receiving `bootstrap.log` and `b2.log`.
    pub log_dir: Utf8PathBuf,
}

impl BuildConfig {
    /// Derive a configuration for `source_dir`, placing the install prefix
    /// beside it.
    #[must_use]
    pub fn for_source(source_dir: &Utf8Path, library: &str, log_dir: &Utf8Path) -> Self {
        let prefix = source_dir
            .parent()
            .unwrap_or(source_dir)
            .join(INSTALL_PREFIX_DIR);
        Self {
            source_dir: source_dir.to_owned(),
            prefix,
            library: library.to_owned(),
            jobs: None,
            log_dir: log_dir.to_owned(),
        }
    }

    /// Set the number of parallel build jobs.
    #[must_use]
    pub const fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Where the generated `boost/` header directory is expected.
    #[must_use]
    pub fn headers_dir(&self) -> Utf8PathBuf {
        self.prefix.join("include").join("boost")
    }
}

/// Builder for a single Boost library.
pub struct Builder<'a> {
    config: BuildConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> Builder<'a> {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(config: BuildConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Run the bootstrap script.
    ///
    /// # Errors
    ///
    /// Returns [`HeadersError::BootstrapFailed`] on a non-zero exit, or an
    /// I/O error if the script cannot be started.
    pub fn bootstrap(&self) -> Result<()> {
        let invocation = self.bootstrap_invocation();
        let log = log_path(&invocation);
        let output = self.runner.run(&invocation)?;

        if !output.status.success() {
            return Err(HeadersError::BootstrapFailed {
                script: invocation.program,
                status: describe_status(output.status),
                log,
            });
        }
        Ok(())
    }

    /// Run `b2 install` and confirm the header tree exists.
    ///
    /// Returns the path of the generated `boost/` header directory.
    ///
    /// # Errors
    ///
    /// Returns [`HeadersError::BuildFailed`] on a non-zero exit, and
    /// [`HeadersError::HeadersNotGenerated`] if the tool reported success but
    /// left no header tree behind.
    pub fn build(&self) -> Result<Utf8PathBuf> {
        let invocation = self.build_invocation();
        let log = log_path(&invocation);
        let output = self.runner.run(&invocation)?;

        if !output.status.success() {
            return Err(HeadersError::BuildFailed {
                tool: invocation.program,
                status: describe_status(output.status),
                log,
            });
        }

        let headers = self.config.headers_dir();
        if !headers.is_dir() {
            return Err(HeadersError::HeadersNotGenerated { path: headers });
        }
        Ok(headers)
    }

    /// The bootstrap command: configure for one library and point the
    /// install prefix at the temporary build tree.
    #[must_use]
    pub fn bootstrap_invocation(&self) -> Invocation {
        Invocation::new(bootstrap_program(), &self.config.source_dir)
            .arg(format!("--prefix={}", self.config.prefix))
            .arg(format!("--with-libraries={}", self.config.library))
            .log_to(self.config.log_dir.join(BOOTSTRAP_LOG))
    }

    /// The build command. The prefix and library are repeated here because
    /// `bootstrap.bat` ignores them.
    #[must_use]
    pub fn build_invocation(&self) -> Invocation {
        let mut invocation = Invocation::new(build_program(), &self.config.source_dir)
            .arg("install")
            .arg(format!("--prefix={}", self.config.prefix))
            .arg(format!("--with-{}", self.config.library));
        invocation
            .args
            .extend(self.config.jobs.map(|jobs| format!("-j{jobs}")));
        invocation.log_to(self.config.log_dir.join(BUILD_LOG))
    }
}

fn log_path(invocation: &Invocation) -> Utf8PathBuf {
    invocation.log_file.clone().unwrap_or_default()
}
