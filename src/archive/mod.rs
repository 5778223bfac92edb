mod zip;

use crate::runtime::Runtime;
use anyhow::Result;
use std::path::Path;

pub use self::zip::ZipExtractor;

/// Unpacks an archive into a directory.
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Extract the archive into `extract_to`, flattening a single top-level directory
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()>;
}
