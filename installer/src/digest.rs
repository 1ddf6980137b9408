//! SHA-256 digest newtype and a hashing reader for streamed downloads.
//!
//! The digest is computed over the compressed bytes exactly as they arrive
//! from the network, so verification never needs a second pass over the
//! tarball.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Errors arising from an invalid digest string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid SHA-256 digest: {reason}")]
pub struct DigestError {
    reason: String,
}

/// A validated hex-encoded SHA-256 digest string.
///
/// Input is accepted in either case and normalized to lowercase.
///
/// # Examples
///
/// ```
/// use boost_headers::digest::Sha256Digest;
///
/// let digest: Sha256Digest = "AB".repeat(32).parse()?;
/// assert_eq!(digest.as_str(), "ab".repeat(32));
/// # Ok::<(), boost_headers::digest::DigestError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compute the digest of an in-memory buffer.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }
}

impl std::str::FromStr for Sha256Digest {
    type Err = DigestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        validate_sha256(value)?;
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_sha256(value: &str) -> Result<(), DigestError> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(DigestError {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(DigestError {
            reason: format!("non-hex character '{bad}'"),
        });
    }
    Ok(())
}

/// A reader adapter that hashes every byte passing through it.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    bytes_read: u64,
}

impl<R: Read> HashingReader<R> {
    /// Wrap `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes_read: 0,
        }
    }

    /// Number of bytes read through the adapter so far.
    #[must_use]
    pub const fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consume the adapter and return the digest of everything read.
    #[must_use]
    pub fn finish(self) -> Sha256Digest {
        Sha256Digest(format!("{:x}", self.hasher.finalize()))
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let count = self.inner.read(buf)?;
        if let Some(chunk) = buf.get(..count) {
            self.hasher.update(chunk);
        }
        self.bytes_read += count as u64;
        Ok(count)
    }
}
