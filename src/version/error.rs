//! Errors raised while locating, rewriting and validating version strings.

use super::SemanticVersion;

/// Version registry failures.
///
/// Every variant renders as a single line so the CLI can report it as-is.
#[derive(Debug)]
pub enum VersionError {
    /// A location pattern failed to compile or has no capture group
    InvalidPattern { pattern: String, reason: String },
    /// The pattern did not match anywhere in the text
    NotFound { pattern: String },
    /// The pattern matched, but the captured text is not `major.minor.patch`
    MalformedVersion(String),
    /// A location could not be read or parsed
    LocationRead { name: String, cause: anyhow::Error },
    /// The new version does not exceed the previously released one
    Regression {
        version: SemanticVersion,
        previous: SemanticVersion,
    },
    /// Locations disagree about the current version; pairs of location name and text as written
    Mismatch(Vec<(String, String)>),
}

impl std::fmt::Display for VersionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid version pattern '{}': {}", pattern, reason)
            }
            VersionError::NotFound { pattern } => {
                write!(f, "No version matching '{}' found", pattern)
            }
            VersionError::MalformedVersion(text) => {
                write!(
                    f,
                    "'{}' is not a valid version (expected major.minor.patch)",
                    text
                )
            }
            VersionError::LocationRead { name, cause } => {
                write!(f, "Failed to read version from {}: {:#}", name, cause)
            }
            VersionError::Regression { version, previous } => {
                write!(
                    f,
                    "Version {} is not greater than the previous version {}",
                    version, previous
                )
            }
            VersionError::Mismatch(entries) => {
                let listed = entries
                    .iter()
                    .map(|(name, version)| format!("{}={}", name, version))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Versions do not match: {}", listed)
            }
        }
    }
}

impl std::error::Error for VersionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VersionError::LocationRead { cause, .. } => Some(&**cause),
            _ => None,
        }
    }
}
