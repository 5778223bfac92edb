use log::{debug, warn};
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Removes registered files and directories when dropped.
///
/// Temporary copies (downloaded archives, test executables staged next to
/// their libraries) are registered here so they disappear on every exit
/// path, including early returns through `?`.
pub struct CleanupGuard<'a, R: Runtime> {
    runtime: &'a R,
    paths: Vec<PathBuf>,
}

impl<'a, R: Runtime> CleanupGuard<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self {
            runtime,
            paths: Vec::new(),
        }
    }

    /// Register a path to be removed when the guard goes out of scope
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    fn cleanup(&mut self) {
        for path in self.paths.drain(..).rev() {
            if !self.runtime.exists(&path) {
                continue;
            }
            debug!("Cleaning up: {:?}", path);
            let result = if self.runtime.is_dir(&path) {
                self.runtime.remove_dir_all(&path)
            } else {
                self.runtime.remove_file(&path)
            };
            if let Err(e) = result {
                warn!("Failed to clean up {:?}: {}", path, e);
            }
        }
    }
}

impl<R: Runtime> Drop for CleanupGuard<'_, R> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
