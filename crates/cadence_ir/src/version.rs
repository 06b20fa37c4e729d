//! IR format versions.

use std::fmt;

use cadence_foundation::{Error, Result};

/// Highest IR major version this runtime can execute.
pub const SUPPORTED_MAJOR: u32 = 1;

/// A `MAJOR.MINOR` IR format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    /// Major version. Bumped on incompatible changes.
    pub major: u32,
    /// Minor version. Additive changes only.
    pub minor: u32,
}

impl Version {
    /// Parses a version string.
    ///
    /// A missing minor component is read as `0`, so `"1"` equals `"1.0"`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr` if either component is not a number.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(2, '.');
        let bad = || Error::invalid_ir(format!("malformed version string: {s:?}"));

        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(bad)?;
        let minor = match parts.next() {
            Some(p) => p.parse::<u32>().map_err(|_| bad())?,
            None => 0,
        };
        Ok(Self { major, minor })
    }

    /// Returns true if this runtime can execute a module of this version.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        self.major <= SUPPORTED_MAJOR
    }

    /// Parses a version string and checks that it is supported.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr` for a malformed string and `UnsupportedVersion`
    /// when the major version is newer than [`SUPPORTED_MAJOR`].
    pub fn check(s: &str) -> Result<Self> {
        let version = Self::parse(s)?;
        if version.is_supported() {
            Ok(version)
        } else {
            Err(Error::unsupported_version(s, SUPPORTED_MAJOR))
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
