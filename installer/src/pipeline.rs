//! Header generation pipeline orchestration.
//!
//! This module runs the stages in order: download, checksum, extraction,
//! bootstrap, build, installation and patching. Every stage before patching
//! is fatal on failure. The downloaded tarball is released after the
//! install stage whatever its outcome.

use crate::builder::{BuildConfig, Builder};
use crate::command::{CommandRunner, SystemCommandRunner};
use crate::config::HeadersConfig;
use crate::digest::Sha256Digest;
use crate::download::{ArchiveDownloader, DownloadSummary, HttpDownloader};
use crate::error::{HeadersError, Result};
use crate::extraction::{ArchiveExtractor, TarExtractor};
use crate::install::{HeaderInstaller, InstalledHeaders};
use crate::output::Reporter;
use crate::patches::{PatchApplier, PatchReport, discover_patches};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tempfile::{NamedTempFile, TempDir};

/// The external collaborators a run depends on.
#[derive(Clone, Copy)]
pub struct Toolset<'a> {
    /// Fetches the release tarball.
    pub downloader: &'a dyn ArchiveDownloader,
    /// Unpacks the tarball.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Runs the bootstrap script, `b2` and `git apply`.
    pub runner: &'a dyn CommandRunner,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Download statistics and digest.
    pub download: DownloadSummary,
    /// Installed artefact paths.
    pub installed: InstalledHeaders,
    /// Patch results, or `None` when patching was skipped.
    pub patches: Option<PatchReport>,
}

/// The decompressed release tarball on disk.
///
/// Backed by a named temporary file so the extractor can reopen it by path.
/// Call [`Tarball::close`] to delete it and observe any error.
#[derive(Debug)]
pub struct Tarball {
    file: NamedTempFile,
}

impl Tarball {
    /// Create an empty `.tar` temporary file, in `dir` when given.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn create(dir: Option<&Utf8Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("boost_").suffix(".tar");
        let file = dir.map_or_else(|| builder.tempfile(), |dir| builder.tempfile_in(dir))?;
        Ok(Self { file })
    }

    /// Path of the tarball on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Writable handle to the tarball.
    pub fn file_mut(&mut self) -> &mut File {
        self.file.as_file_mut()
    }

    /// Delete the tarball.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be removed.
    pub fn close(self) -> Result<()> {
        let path = self.file.path().display().to_string();
        self.file.close()?;
        log::debug!("removed temporary tarball {path}");
        Ok(())
    }
}

/// Generate and install headers using the production collaborators.
///
/// # Errors
///
/// Returns the first fatal error; see [`generate_headers_with`].
pub fn generate_headers(
    config: &HeadersConfig,
    reporter: &mut Reporter<'_>,
) -> Result<GenerationOutcome> {
    let tools = Toolset {
        downloader: &HttpDownloader,
        extractor: &TarExtractor,
        runner: &SystemCommandRunner,
    };
    generate_headers_with(config, tools, reporter)
}

/// Generate and install headers with the given collaborators.
///
/// # Errors
///
/// Returns an error if the download, checksum, extraction, bootstrap, build
/// or installation fails. Patch failures are recorded in the outcome instead.
pub fn generate_headers_with(
    config: &HeadersConfig,
    tools: Toolset<'_>,
    reporter: &mut Reporter<'_>,
) -> Result<GenerationOutcome> {
    let mut tarball = Tarball::create(config.scratch_dir.as_deref())?;
    let outcome = fetch_build_install(config, tools, &mut tarball, reporter);
    let (download, installed) = settle_release(outcome, tarball.close())?;

    let patches = if config.skip_patches {
        reporter.info("Skipping patches");
        None
    } else {
        Some(apply_patches(config, tools.runner, reporter)?)
    };

    Ok(GenerationOutcome {
        download,
        installed,
        patches,
    })
}

fn fetch_build_install(
    config: &HeadersConfig,
    tools: Toolset<'_>,
    tarball: &mut Tarball,
    reporter: &mut Reporter<'_>,
) -> Result<(DownloadSummary, InstalledHeaders)> {
    let url = config.url();
    reporter.info(format!("Downloading Boost {} from {url}", config.version));
    let started = Instant::now();
    let download = tools.downloader.download(&url, tarball.file_mut())?;
    log::debug!(
        "received {} bytes, wrote {} bytes to {}",
        download.bytes_received,
        download.bytes_written,
        tarball.path().display()
    );
    verify_checksum(&url, config.expected_sha256.as_ref(), &download.sha256)?;
    reporter.elapsed("Download", started.elapsed());

    let scratch = scratch_dir(config.scratch_dir.as_deref())?;
    let scratch_path = utf8_path(scratch.path())?;

    reporter.info(format!("Extracting into {scratch_path}"));
    let started = Instant::now();
    tools.extractor.extract(tarball.path(), scratch.path())?;
    let source_dir = scratch_path.join(config.version.archive_stem());
    if !source_dir.is_dir() {
        return Err(HeadersError::SourceTreeMissing { path: source_dir });
    }
    reporter.elapsed("Extraction", started.elapsed());

    std::fs::create_dir_all(&config.log_dir)?;
    let build_config = BuildConfig::for_source(&source_dir, &config.library, &config.log_dir)
        .with_jobs(config.jobs);
    let builder = Builder::new(build_config, tools.runner);

    reporter.info(format!(
        "Bootstrapping Boost (output in {})",
        config.log_dir.join(crate::builder::BOOTSTRAP_LOG)
    ));
    let started = Instant::now();
    builder.bootstrap()?;
    reporter.elapsed("Bootstrap", started.elapsed());

    reporter.info(format!(
        "Building {} headers (output in {})",
        config.library,
        config.log_dir.join(crate::builder::BUILD_LOG)
    ));
    let started = Instant::now();
    let headers = builder.build()?;
    reporter.elapsed("Build", started.elapsed());

    reporter.info(format!("Installing headers into {}", config.output_dir));
    let started = Instant::now();
    let installed = HeaderInstaller::new(config.output_dir.clone(), config.version)
        .install(&headers, &source_dir)?;
    reporter.elapsed("Install", started.elapsed());

    Ok((download, installed))
}

/// Combine a stage outcome with the tarball release, preferring the stage's
/// error when both failed.
fn settle_release<T>(outcome: Result<T>, closed: Result<()>) -> Result<T> {
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            log::debug!("failed to remove temporary tarball after earlier error: {close_err}");
            Err(err)
        }
    }
}

fn apply_patches(
    config: &HeadersConfig,
    runner: &dyn CommandRunner,
    reporter: &mut Reporter<'_>,
) -> Result<PatchReport> {
    let patches = discover_patches(&config.patches_dir)?;
    let started = Instant::now();
    let report = PatchApplier::new(&config.output_dir, runner).apply_all(&patches, reporter);
    reporter.elapsed("Patching", started.elapsed());
    Ok(report)
}

/// Compare the received digest with the expected one, if any.
///
/// # Errors
///
/// Returns [`HeadersError::ChecksumMismatch`] when they differ.
pub fn verify_checksum(
    url: &str,
    expected: Option<&Sha256Digest>,
    actual: &Sha256Digest,
) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => Err(HeadersError::ChecksumMismatch {
            url: url.to_owned(),
            expected: expected.clone(),
            actual: actual.clone(),
        }),
        _ => Ok(()),
    }
}

fn scratch_dir(parent: Option<&Utf8Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("boost_build_");
    let dir = parent.map_or_else(|| builder.tempdir(), |parent| builder.tempdir_in(parent))?;
    Ok(dir)
}

fn utf8_path(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path.to_path_buf())
        .map_err(|e| HeadersError::NonUtf8Path { path: e.into_path_buf() })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
