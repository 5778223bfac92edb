use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::archive::Extractor;
use crate::cleanup::CleanupGuard;
use crate::download::Downloader;
use crate::platform::Platform;
use crate::runtime::Runtime;

pub const DEFAULT_ARCHIVE_URL: &str = "https://github.com/Microsoft/vcpkg/archive/master.zip";

/// Libraries GameBackbone builds against.
pub const DEFAULT_PACKAGES: [&str; 4] = ["boost", "sfml", "tgui", "box2d"];

const ARCHIVE_NAME: &str = "vcpkg_zip.zip";
const CHECKOUT_DIR: &str = "vcpkg";

/// Where the vcpkg checkout comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VcpkgSource {
    /// A checkout that already exists on disk.
    Existing(PathBuf),
    /// Download `url` and unpack it into `<dest_dir>/vcpkg`.
    Download { dest_dir: PathBuf, url: String },
}

pub struct VcpkgInstaller<'a, R: Runtime, D: Downloader, E: Extractor> {
    runtime: &'a R,
    downloader: &'a D,
    extractor: &'a E,
    platform: Platform,
}

impl<'a, R: Runtime + 'static, D: Downloader, E: Extractor> VcpkgInstaller<'a, R, D, E> {
    pub fn new(runtime: &'a R, downloader: &'a D, extractor: &'a E, platform: Platform) -> Self {
        Self {
            runtime,
            downloader,
            extractor,
            platform,
        }
    }

    /// Download the vcpkg archive and unpack it. The archive never outlives this call.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, dest_dir: &Path, url: &str) -> Result<PathBuf> {
        let checkout = dest_dir.join(CHECKOUT_DIR);
        if self.runtime.exists(&checkout) {
            bail!(
                "{:?} already exists; pass it with --path to reuse it",
                checkout
            );
        }
        self.runtime
            .create_dir_all(dest_dir)
            .with_context(|| format!("Failed to create {:?}", dest_dir))?;

        let archive = dest_dir.join(ARCHIVE_NAME);
        let mut cleanup = CleanupGuard::new(self.runtime);
        cleanup.add(archive.clone());

        self.downloader
            .download(self.runtime, url, &archive)
            .await
            .with_context(|| format!("Failed to download vcpkg from {}", url))?;
        self.extractor
            .extract(self.runtime, &archive, &checkout)
            .with_context(|| format!("Failed to extract {:?}", archive))?;

        Ok(checkout)
    }

    /// Build the vcpkg binary unless the checkout already has one.
    #[tracing::instrument(skip(self))]
    pub fn bootstrap(&self, vcpkg_root: &Path) -> Result<PathBuf> {
        let binary = self.platform.binary_path(vcpkg_root);
        if self.runtime.exists(&binary) {
            info!("vcpkg already bootstrapped at {:?}", binary);
            return Ok(binary);
        }

        if self.platform.script_needs_exec_bit() {
            let script = self.platform.bootstrap_script(vcpkg_root);
            self.runtime
                .set_permissions(&script, 0o755)
                .with_context(|| format!("Failed to make {:?} executable", script))?;
        }

        let (program, args) = self.platform.bootstrap_command(vcpkg_root);
        info!("Bootstrapping vcpkg for {}...", self.platform);
        let code = self
            .runtime
            .run_inherited(&program, &args, vcpkg_root)
            .with_context(|| format!("Failed to run {:?}", program))?;
        if code != Some(0) {
            warn!("Bootstrap exited with {:?}", code);
        }

        if !self.runtime.exists(&binary) {
            bail!("vcpkg binary not built correctly: {:?} is missing", binary);
        }
        Ok(binary)
    }

    /// Install each package in order, stopping at the first failure.
    #[tracing::instrument(skip(self))]
    pub fn install_packages(
        &self,
        binary: &Path,
        vcpkg_root: &Path,
        packages: &[&str],
    ) -> Result<()> {
        for package in packages {
            let spec = self.platform.package_spec(package);
            info!("Installing {}...", spec);
            let args = vec!["install".to_string(), spec.clone()];
            let code = self
                .runtime
                .run_inherited(binary, &args, vcpkg_root)
                .with_context(|| format!("Failed to run {:?}", binary))?;
            if code != Some(0) {
                bail!("vcpkg install {} failed with exit code {:?}", spec, code);
            }
        }
        Ok(())
    }

    /// Obtain a checkout, bootstrap it and install `packages`.
    ///
    /// Returns the checkout directory.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self, source: &VcpkgSource, packages: &[&str]) -> Result<PathBuf> {
        let root = match source {
            VcpkgSource::Existing(path) => {
                if !self.runtime.is_dir(path) {
                    bail!("vcpkg directory {:?} does not exist", path);
                }
                path.clone()
            }
            VcpkgSource::Download { dest_dir, url } => self.fetch(dest_dir, url).await?,
        };

        let binary = self.bootstrap(&root)?;
        self.install_packages(&binary, &root, packages)?;
        info!("vcpkg ready at {:?}", root);
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MockExtractor;
    use crate::download::MockDownloader;
    use crate::runtime::MockRuntime;
    use mockall::Sequence;
    use mockall::predicate::eq;

    fn root() -> PathBuf {
        PathBuf::from("/tools/vcpkg")
    }

    #[test]
    fn test_bootstrap_skipped_when_binary_exists() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(root().join("vcpkg")))
            .returning(|_| true);
        runtime.expect_run_inherited().never();

        let downloader = MockDownloader::new();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);

        assert_eq!(installer.bootstrap(&root()).unwrap(), root().join("vcpkg"));
    }

    #[test]
    fn test_bootstrap_unix_marks_script_executable() {
        let mut runtime = MockRuntime::new();
        let mut seq = Sequence::new();
        // Missing before the bootstrap, present after it
        let mut checks = 0;
        runtime.expect_exists().times(2).returning(move |_| {
            checks += 1;
            checks > 1
        });
        runtime
            .expect_set_permissions()
            .with(eq(root().join("bootstrap-vcpkg.sh")), eq(0o755))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runtime
            .expect_run_inherited()
            .with(
                eq(root().join("bootstrap-vcpkg.sh")),
                eq(Vec::<String>::new()),
                eq(root()),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(Some(0)));

        let downloader = MockDownloader::new();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::MacOs);

        installer.bootstrap(&root()).unwrap();
    }

    #[test]
    fn test_bootstrap_windows_runs_batch_file() {
        let mut runtime = MockRuntime::new();
        let mut seq = Sequence::new();
        // Missing before the bootstrap, present after it
        let mut checks = 0;
        runtime.expect_exists().times(2).returning(move |_| {
            checks += 1;
            checks > 1
        });
        runtime.expect_set_permissions().never();
        runtime
            .expect_run_inherited()
            .withf(|program, args, _| {
                program == Path::new("cmd")
                    && args[0] == "/C"
                    && args[1].ends_with("bootstrap-vcpkg.bat")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(Some(0)));

        let downloader = MockDownloader::new();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Windows);

        assert_eq!(
            installer.bootstrap(&root()).unwrap(),
            root().join("vcpkg.exe")
        );
    }

    #[test_log::test]
    fn test_bootstrap_fails_when_binary_not_built() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);
        runtime.expect_set_permissions().returning(|_, _| Ok(()));
        runtime
            .expect_run_inherited()
            .returning(|_, _, _| Ok(Some(1)));

        let downloader = MockDownloader::new();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);

        let err = installer.bootstrap(&root()).unwrap_err();
        assert!(err.to_string().contains("not built correctly"));
    }

    #[test]
    fn test_install_packages_in_order_with_triplet() {
        let mut runtime = MockRuntime::new();
        let mut seq = Sequence::new();
        for package in DEFAULT_PACKAGES {
            let expected = vec!["install".to_string(), format!("{}:x64-windows", package)];
            runtime
                .expect_run_inherited()
                .with(eq(root().join("vcpkg.exe")), eq(expected), eq(root()))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _| Ok(Some(0)));
        }

        let downloader = MockDownloader::new();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Windows);

        installer
            .install_packages(&root().join("vcpkg.exe"), &root(), &DEFAULT_PACKAGES)
            .unwrap();
    }

    #[test]
    fn test_install_packages_stops_on_failure() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_run_inherited()
            .times(1)
            .returning(|_, _, _| Ok(Some(2)));

        let downloader = MockDownloader::new();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);

        let err = installer
            .install_packages(&root().join("vcpkg"), &root(), &DEFAULT_PACKAGES)
            .unwrap_err();
        assert!(err.to_string().contains("vcpkg install boost failed"));
    }

    #[tokio::test]
    async fn test_install_existing_checkout() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_is_dir()
            .with(eq(root()))
            .returning(|_| true);
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_run_inherited()
            .times(DEFAULT_PACKAGES.len())
            .returning(|_, _, _| Ok(Some(0)));

        let mut downloader = MockDownloader::new();
        downloader.expect_download::<MockRuntime>().never();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);

        let checkout = installer
            .install(&VcpkgSource::Existing(root()), &DEFAULT_PACKAGES)
            .await
            .unwrap();
        assert_eq!(checkout, root());
    }

    #[tokio::test]
    async fn test_install_missing_checkout() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_dir().returning(|_| false);

        let downloader = MockDownloader::new();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);

        let result = installer
            .install(&VcpkgSource::Existing(root()), &DEFAULT_PACKAGES)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_downloads_extracts_and_removes_archive() {
        let dest = PathBuf::from("/tools");
        let archive = dest.join("vcpkg_zip.zip");

        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(dest.join("vcpkg")))
            .times(1)
            .returning(|_| false);
        runtime
            .expect_create_dir_all()
            .with(eq(dest.clone()))
            .returning(|_| Ok(()));
        // Cleanup guard
        runtime
            .expect_exists()
            .with(eq(archive.clone()))
            .times(1)
            .returning(|_| true);
        runtime
            .expect_is_dir()
            .with(eq(archive.clone()))
            .returning(|_| false);
        runtime
            .expect_remove_file()
            .with(eq(archive.clone()))
            .times(1)
            .returning(|_| Ok(()));

        let mut downloader = MockDownloader::new();
        downloader
            .expect_download::<MockRuntime>()
            .withf(|_, url, dest| url == DEFAULT_ARCHIVE_URL && dest.ends_with("vcpkg_zip.zip"))
            .times(1)
            .returning(|_, _, _| Ok(1024));

        let mut extractor = MockExtractor::new();
        extractor
            .expect_extract::<MockRuntime>()
            .withf(|_, archive, to| {
                archive.ends_with("vcpkg_zip.zip") && to == Path::new("/tools/vcpkg")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);
        let checkout = installer.fetch(&dest, DEFAULT_ARCHIVE_URL).await.unwrap();
        assert_eq!(checkout, dest.join("vcpkg"));
    }

    #[tokio::test]
    async fn test_fetch_removes_archive_when_extraction_fails() {
        let dest = PathBuf::from("/tools");
        let archive = dest.join("vcpkg_zip.zip");

        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(dest.join("vcpkg")))
            .returning(|_| false);
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime
            .expect_exists()
            .with(eq(archive.clone()))
            .returning(|_| true);
        runtime.expect_is_dir().returning(|_| false);
        runtime
            .expect_remove_file()
            .with(eq(archive.clone()))
            .times(1)
            .returning(|_| Ok(()));

        let mut downloader = MockDownloader::new();
        downloader
            .expect_download::<MockRuntime>()
            .returning(|_, _, _| Ok(10));

        let mut extractor = MockExtractor::new();
        extractor
            .expect_extract::<MockRuntime>()
            .returning(|_, _, _| Err(anyhow::anyhow!("Archive appears to be empty.")));

        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);
        let err = installer.fetch(&dest, DEFAULT_ARCHIVE_URL).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Archive appears to be empty."));
    }

    #[tokio::test]
    async fn test_fetch_refuses_existing_checkout() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);

        let mut downloader = MockDownloader::new();
        downloader.expect_download::<MockRuntime>().never();
        let extractor = MockExtractor::new();
        let installer = VcpkgInstaller::new(&runtime, &downloader, &extractor, Platform::Linux);

        let err = installer
            .fetch(Path::new("/tools"), DEFAULT_ARCHIVE_URL)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
