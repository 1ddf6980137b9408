//! Boost release version parsing and derived naming.
//!
//! Boost publishes each release under two spellings of the same version: the
//! dotted form used in URLs (`1.82.0`) and the underscore form used in
//! archive and directory names (`boost_1_82_0`). [`BoostVersion`] parses the
//! user's input once and derives both, so the two can never disagree.

use std::fmt;
use std::str::FromStr;

/// Errors arising from an unparseable version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// The input was empty after trimming.
    #[error("version string is empty")]
    Empty,

    /// The input did not contain exactly `major.minor.patch`.
    #[error("invalid Boost version \"{value}\"; expected [major].[minor].[patch]")]
    Malformed {
        /// The rejected input.
        value: String,
    },

    /// A component does not fit in a `u32`.
    #[error("version component \"{component}\" in \"{value}\" is out of range")]
    OutOfRange {
        /// The rejected input.
        value: String,
        /// The offending component.
        component: String,
    },
}

/// A Boost release version.
///
/// # Examples
///
/// ```
/// use boost_headers::version::BoostVersion;
///
/// let version: BoostVersion = "1.82.0".parse()?;
/// assert_eq!(version.dotted(), "1.82.0");
/// assert_eq!(version.underscored(), "1_82_0");
/// assert_eq!(version.archive_stem(), "boost_1_82_0");
/// # Ok::<(), boost_headers::version::VersionError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoostVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl BoostVersion {
    /// Create a version from its numeric components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Return the major component.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Return the minor component.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Return the patch component.
    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// The dot-separated form, e.g. `1.82.0`.
    #[must_use]
    pub fn dotted(&self) -> String {
        self.joined('.')
    }

    /// The underscore-separated form, e.g. `1_82_0`.
    #[must_use]
    pub fn underscored(&self) -> String {
        self.joined('_')
    }

    /// Name of the release tarball without extension, and of the top-level
    /// directory inside it.
    #[must_use]
    pub fn archive_stem(&self) -> String {
        format!("boost_{}", self.underscored())
    }

    /// File name under which the release README is vendored.
    #[must_use]
    pub fn readme_name(&self) -> String {
        format!("Boost_{}_README.md", self.underscored())
    }

    fn joined(&self, separator: char) -> String {
        format!(
            "{}{separator}{}{separator}{}",
            self.major, self.minor, self.patch
        )
    }
}

impl fmt::Display for BoostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl FromStr for BoostVersion {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let release = release_segment(trimmed);
        let components: Vec<&str> = release.split('.').collect();
        let [major, minor, patch] = components.as_slice() else {
            return Err(VersionError::Malformed {
                value: input.to_owned(),
            });
        };

        Ok(Self {
            major: parse_component(input, major)?,
            minor: parse_component(input, minor)?,
            patch: parse_component(input, patch)?,
        })
    }
}

/// Strip an optional `v` prefix and any pre-release or build suffix, leaving
/// only the leading run of digits and dots.
fn release_segment(input: &str) -> &str {
    let unprefixed = input
        .strip_prefix('v')
        .or_else(|| input.strip_prefix('V'))
        .unwrap_or(input);
    let end = unprefixed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unprefixed.len());
    unprefixed.get(..end).unwrap_or_default().trim_end_matches('.')
}

fn parse_component(input: &str, component: &str) -> Result<u32, VersionError> {
    if component.is_empty() {
        return Err(VersionError::Malformed {
            value: input.to_owned(),
        });
    }
    component.parse().map_err(|_| VersionError::OutOfRange {
        value: input.to_owned(),
        component: component.to_owned(),
    })
}
