//! Error types for header generation.
//!
//! Every variant here is fatal: it aborts the run and leaves the repository
//! however the filesystem operations so far left it. Patch failures are not
//! represented because they are recovered and reported in
//! [`PatchReport`](crate::patches::PatchReport) instead.

use crate::digest::Sha256Digest;
use crate::download::DownloadError;
use crate::extraction::ExtractionError;
use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating and installing Boost headers.
#[derive(Debug, Error)]
pub enum HeadersError {
    /// Fetching the release tarball failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The downloaded tarball does not match the expected digest.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The URL the tarball was fetched from.
        url: String,
        /// The digest supplied on the command line.
        expected: Sha256Digest,
        /// The digest of the bytes actually received.
        actual: Sha256Digest,
    },

    /// Unpacking the tarball failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The tarball unpacked, but not into the expected top-level directory.
    #[error("extracted archive has no source directory at {path}")]
    SourceTreeMissing {
        /// Where the source root was expected.
        path: Utf8PathBuf,
    },

    /// The bootstrap script exited unsuccessfully.
    #[error("failed to run {script} (exit status {status}); see {log}")]
    BootstrapFailed {
        /// The script that was run.
        script: String,
        /// Exit code, or `signal` when the process was killed.
        status: String,
        /// Log file holding the script's output.
        log: Utf8PathBuf,
    },

    /// The build tool exited unsuccessfully.
    #[error("failed to run {tool} install (exit status {status}); see {log}")]
    BuildFailed {
        /// The build tool that was run.
        tool: String,
        /// Exit code, or `signal` when the process was killed.
        status: String,
        /// Log file holding the tool's output.
        log: Utf8PathBuf,
    },

    /// The build reported success but produced no header tree.
    #[error("headers failed to generate: {path} does not exist")]
    HeadersNotGenerated {
        /// Where the header tree was expected.
        path: Utf8PathBuf,
    },

    /// Moving the built artefacts into the repository failed.
    #[error("failed to install {path}: {reason}")]
    InstallFailed {
        /// The destination being written.
        path: Utf8PathBuf,
        /// Description of the underlying failure.
        reason: String,
    },

    /// An external command did not finish in time.
    #[error("{program} timed out after {seconds} seconds")]
    CommandTimedOut {
        /// The program that was killed.
        program: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// A filesystem path could not be represented as UTF-8.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`HeadersError`].
pub type Result<T> = std::result::Result<T, HeadersError>;

/// Render an exit status for error messages.
pub(crate) fn describe_status(status: std::process::ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "signal".to_owned(), |code| code.to_string())
}
