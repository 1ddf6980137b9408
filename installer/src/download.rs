//! Release tarball download.
//!
//! Provides a trait-based abstraction for fetching a Boost source tarball,
//! enabling dependency injection for testing. The production implementation
//! streams the response body through a gzip decoder straight into the
//! destination file, so the archive is never held in memory.

use crate::digest::{HashingReader, Sha256Digest};
use crate::version::BoostVersion;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::OnceLock;
use std::time::Duration;

/// Base URL under which Boost publishes release tarballs.
pub const DEFAULT_MIRROR: &str = "https://archives.boost.io/release";

/// Connection timeout for the release download. The transfer itself is
/// unbounded because source tarballs are well over 100 MiB.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for downloading a release tarball.
///
/// Implementations write the *decompressed* tar stream into `sink` and
/// report the digest of the compressed bytes they received.
///
/// # Examples
///
/// ```no_run
/// use boost_headers::download::{ArchiveDownloader, HttpDownloader, release_url, DEFAULT_MIRROR};
/// use boost_headers::version::BoostVersion;
///
/// let url = release_url(DEFAULT_MIRROR, &BoostVersion::new(1, 82, 0));
/// let mut file = tempfile::tempfile()?;
/// let summary = HttpDownloader.download(&url, &mut file)?;
/// println!("{} bytes unpacked", summary.bytes_written);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveDownloader {
    /// Fetch `url`, decompress it, and write the tar stream into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] when the release does not exist,
    /// [`DownloadError::HttpError`] for other transport failures, and
    /// [`DownloadError::Stream`] when decompression or the write fails.
    fn download(&self, url: &str, sink: &mut File) -> Result<DownloadSummary, DownloadError>;
}

/// What a completed download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Compressed bytes received from the server.
    pub bytes_received: u64,
    /// Decompressed bytes written to the sink.
    pub bytes_written: u64,
    /// Digest of the compressed bytes.
    pub sha256: Sha256Digest,
}

/// Errors arising from the release download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested release was not found (HTTP 404).
    #[error("release not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// Reading, decompressing, or persisting the body failed.
    #[error("failed to stream {url}: {source}")]
    Stream {
        /// The URL being streamed.
        url: String,
        /// The underlying I/O or gzip error.
        #[source]
        source: io::Error,
    },
}

/// Build the tarball URL for `version` under `mirror`.
///
/// # Examples
///
/// ```
/// use boost_headers::download::release_url;
/// use boost_headers::version::BoostVersion;
///
/// let url = release_url("https://mirror.test/release/", &BoostVersion::new(1, 82, 0));
/// assert_eq!(url, "https://mirror.test/release/1.82.0/source/boost_1_82_0.tar.gz");
/// ```
#[must_use]
pub fn release_url(mirror: &str, version: &BoostVersion) -> String {
    format!(
        "{}/{}/source/{}.tar.gz",
        mirror.trim_end_matches('/'),
        version.dotted(),
        version.archive_stem()
    )
}

/// HTTP-based downloader using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl ArchiveDownloader for HttpDownloader {
    fn download(&self, url: &str, sink: &mut File) -> Result<DownloadSummary, DownloadError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let body = response.into_body().into_reader();
        decompress_into(body, sink).map_err(|source| DownloadError::Stream {
            url: url.to_owned(),
            source,
        })
    }
}

/// Gunzip `compressed` into `sink`, hashing the compressed bytes on the way.
///
/// Any bytes after the gzip trailer are drained so the digest covers the
/// whole response body.
///
/// # Errors
///
/// Returns any I/O error from the reader or the sink, including gzip format
/// errors.
pub fn decompress_into<R: Read, W: Write>(
    compressed: R,
    sink: &mut W,
) -> io::Result<DownloadSummary> {
    let mut decoder = GzDecoder::new(HashingReader::new(compressed));
    let bytes_written = io::copy(&mut decoder, sink)?;
    sink.flush()?;

    let mut hashing = decoder.into_inner();
    io::copy(&mut hashing, &mut io::sink())?;

    Ok(DownloadSummary {
        bytes_received: hashing.bytes_read(),
        bytes_written,
        sha256: hashing.finish(),
    })
}

/// Shared `ureq` agent with connection timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
