use std::fmt;
use std::str::FromStr;

use super::VersionError;

/// A `major.minor.patch` release number.
///
/// Field order gives the derived `Ord` its lexicographic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    /// Accepts exactly three dot-separated runs of ASCII digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionError::MalformedVersion(s.to_string());

        let mut parts = s.split('.');
        let mut next = || -> Result<u64, VersionError> {
            let part = parts.next().ok_or_else(malformed)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse::<u64>().map_err(|_| malformed())
        };

        let major = next()?;
        let minor = next()?;
        let patch = next()?;

        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Strict ordering check: equal versions are not greater.
pub fn is_greater(a: &SemanticVersion, b: &SemanticVersion) -> bool {
    a > b
}

/// Versions always go up. Passes when there is nothing to compare against.
pub fn assert_monotonic(
    version: &SemanticVersion,
    previous: Option<&SemanticVersion>,
) -> Result<(), VersionError> {
    match previous {
        Some(previous) if !is_greater(version, previous) => Err(VersionError::Regression {
            version: *version,
            previous: *previous,
        }),
        _ => Ok(()),
    }
}
