//! Semantic versions and the patterns used to find them in project files.
//!
//! # Structure
//!
//! - `semantic` - `SemanticVersion` parsing, display and strict ordering
//! - `pattern` - `VersionPattern` extraction and in-place rewriting
//! - `error` - `VersionError`, the failure taxonomy shared with the registry

mod error;
mod pattern;
mod semantic;

pub use error::VersionError;
pub use pattern::VersionPattern;
pub use semantic::{SemanticVersion, assert_monotonic, is_greater};
