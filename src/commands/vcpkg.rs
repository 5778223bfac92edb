use anyhow::Result;
use std::path::{Path, PathBuf};

use super::config::Config;
use crate::{
    archive::Extractor,
    download::Downloader,
    runtime::Runtime,
    vcpkg::{DEFAULT_PACKAGES, PortUpdater, VcpkgInstaller, VcpkgSource},
};

/// Move the vcpkg port to the version in the primary manifest.
#[tracing::instrument(skip(config))]
pub fn update_port<R: Runtime, D: Downloader, E: Extractor>(
    config: &Config<R, D, E>,
    vcpkg_dir: &Path,
    port: &str,
    triplet: Option<&str>,
) -> Result<String> {
    let vcpkg_dir = config.absolute(vcpkg_dir)?;
    let version = config.registry()?.primary_version()?.version;

    let platform = config.platform()?;
    let updater = PortUpdater::new(&config.runtime, platform, vcpkg_dir, port, triplet)?;
    let sha = updater.update(&version)?;

    println!("Updated port {} to {} (SHA512 {})", port, version, sha);
    Ok(sha)
}

/// Prepare a vcpkg checkout with GameBackbone's dependencies installed.
#[tracing::instrument(skip(config))]
pub async fn install_vcpkg<R: Runtime + 'static, D: Downloader, E: Extractor>(
    config: &Config<R, D, E>,
    source: VcpkgSource,
) -> Result<PathBuf> {
    let source = match source {
        VcpkgSource::Existing(path) => VcpkgSource::Existing(config.absolute(&path)?),
        VcpkgSource::Download { dest_dir, url } => VcpkgSource::Download {
            dest_dir: config.absolute(&dest_dir)?,
            url,
        },
    };

    let installer = VcpkgInstaller::new(
        &config.runtime,
        &config.downloader,
        &config.extractor,
        config.platform()?,
    );
    let root = installer.install(&source, &DEFAULT_PACKAGES).await?;

    println!("vcpkg ready at {}", root.display());
    Ok(root)
}
