use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::{
    archive::{Extractor, ZipExtractor},
    download::{Downloader, HttpDownloader},
    http::HttpClient,
    platform::{DefaultPlatformDetector, Platform, PlatformDetector},
    registry::{LocationsFile, VersionRegistry, default_locations},
    runtime::{Runtime, resolve_against},
};

/// Paths shared by every subcommand, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalOptions {
    pub root: PathBuf,
    pub port_dir: Option<PathBuf>,
    pub locations: Option<PathBuf>,
}

pub struct Config<R: Runtime, D: Downloader, E: Extractor> {
    pub runtime: R,
    pub downloader: D,
    pub extractor: E,
    /// Consulted only by the subcommands that drive vcpkg.
    pub detector: Box<dyn PlatformDetector>,
    /// GameBackbone checkout, absolute.
    pub root: PathBuf,
    /// vcpkg port directory, absolute.
    pub port_dir: Option<PathBuf>,
    /// Replacement location table, absolute.
    pub locations_file: Option<PathBuf>,
}

impl<R: Runtime> Config<R, HttpDownloader, ZipExtractor> {
    pub fn new(runtime: R, options: GlobalOptions) -> Result<Self> {
        Self::with_detector(runtime, options, Box::new(DefaultPlatformDetector))
    }

    pub fn with_detector(
        runtime: R,
        options: GlobalOptions,
        detector: Box<dyn PlatformDetector>,
    ) -> Result<Self> {
        let cwd = runtime.current_dir()?;
        let absolute = |path: &Path| resolve_against(&cwd, path);

        let client = Client::builder().user_agent("gbtool").build()?;
        let downloader = HttpDownloader::new(HttpClient::new(client));

        Ok(Self {
            root: absolute(&options.root),
            port_dir: options.port_dir.as_deref().map(absolute),
            locations_file: options.locations.as_deref().map(absolute),
            runtime,
            downloader,
            extractor: ZipExtractor,
            detector,
        })
    }
}

impl<R: Runtime, D: Downloader, E: Extractor> Config<R, D, E> {
    /// Detect the host platform. Fails on operating systems vcpkg is not bootstrapped on.
    pub fn platform(&self) -> Result<Platform> {
        let platform = self.detector.detect()?;
        debug!("Running on {}", platform);
        Ok(platform)
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn absolute(&self, path: &Path) -> Result<PathBuf> {
        Ok(resolve_against(&self.runtime.current_dir()?, path))
    }

    /// Registry over the locations file when one was given, the built-in table otherwise.
    pub fn registry(&self) -> Result<VersionRegistry<'_, R>> {
        let table = match &self.locations_file {
            Some(path) => LocationsFile::load(&self.runtime, path)?,
            None => default_locations(self.port_dir.as_deref()),
        };
        let locations = table
            .resolve(&self.root)
            .with_context(|| format!("Invalid locations for root {:?}", self.root))?;
        Ok(VersionRegistry::new(&self.runtime, locations))
    }
}
