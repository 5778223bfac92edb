use crate::cleanup::CleanupGuard;
use crate::runtime::Runtime;
use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::Extractor;

/// Extractor for .zip archives
pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let mut reader = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // zip needs Read + Seek; Runtime::open only gives Read
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;
        let mut archive = ZipArchive::new(std::io::Cursor::new(buffer))
            .context("Failed to parse ZIP archive")?;

        // Unpack next to the destination first so a single top-level
        // directory (e.g. "vcpkg-master/") can be stripped.
        let file_name = extract_to
            .file_name()
            .ok_or_else(|| anyhow!("Invalid extraction target {:?}", extract_to))?;
        let staging_dir =
            extract_to.with_file_name(format!("{}_extract", file_name.to_string_lossy()));
        if runtime.exists(&staging_dir) {
            runtime.remove_dir_all(&staging_dir)?;
        }
        runtime.create_dir_all(&staging_dir)?;

        let mut cleanup = CleanupGuard::new(runtime);
        cleanup.add(staging_dir.clone());

        debug!("Unpacking to staging dir: {:?}", staging_dir);

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            let entry_path = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    debug!("Skipping entry with invalid path");
                    continue;
                }
            };

            let full_path = staging_dir.join(&entry_path);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
            } else {
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                let mut dest_file = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;

                // Bootstrap scripts need to keep their executable bit
                #[cfg(unix)]
                if let Some(mode) = entry.unix_mode()
                    && let Err(e) = runtime.set_permissions(&full_path, mode)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
            }
        }

        let entries = runtime
            .read_dir(&staging_dir)
            .context("Failed to read staging directory")?;

        let source_dir = match entries.as_slice() {
            [] => return Err(anyhow!("Archive appears to be empty.")),
            [single] if runtime.is_dir(single) => single.clone(),
            _ => staging_dir.clone(),
        };

        runtime.create_dir_all(extract_to)?;
        debug!("Moving contents from {:?} to {:?}", source_dir, extract_to);
        for item in runtime.read_dir(&source_dir)? {
            let name = item
                .file_name()
                .ok_or_else(|| anyhow!("Invalid archive entry {:?}", item))?;
            runtime.rename(&item, &extract_to.join(name))?;
        }

        info!("Extraction complete.");
        Ok(())
    }
}
