//! Where GameBackbone keeps its version number.
//!
//! The default table mirrors the project layout; a JSON file with the same
//! shape can replace it for forks that move things around.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, resolve_against};
use crate::version::{VersionError, VersionPattern};

pub const PRIMARY_MANIFEST: &str = "primary manifest";
pub const DOC_CONFIG: &str = "doc config";
pub const CONSUMER_MANIFEST: &str = "consumer manifest";
pub const PACKAGE_PORT: &str = "package port";
pub const PACKAGE_CONTROL: &str = "package control";

const SEMVER: &str = r"([0-9]+\.[0-9]+\.[0-9]+)";

/// One place a version string lives.
#[derive(Debug, Clone)]
pub struct VersionLocation {
    pub name: String,
    pub path: PathBuf,
    pub pattern: VersionPattern,
}

impl VersionLocation {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        pattern: &str,
    ) -> Result<Self, VersionError> {
        Ok(Self {
            name: name.into(),
            path: path.into(),
            pattern: VersionPattern::new(pattern)?,
        })
    }
}

/// Serialized form of a location, as found in a locations file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSpec {
    pub name: String,
    pub path: PathBuf,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationsFile {
    pub locations: Vec<LocationSpec>,
}

impl LocationsFile {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read locations file {:?}", path))?;
        let file: LocationsFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse locations file {:?}", path))?;
        if file.locations.is_empty() {
            anyhow::bail!("Locations file {:?} does not list any locations", path);
        }
        Ok(file)
    }

    /// Compile every pattern and resolve relative paths against `root`.
    pub fn resolve(&self, root: &Path) -> Result<Vec<VersionLocation>> {
        self.locations
            .iter()
            .map(|spec| {
                VersionLocation::new(
                    spec.name.clone(),
                    resolve_against(root, &spec.path),
                    &spec.pattern,
                )
                .with_context(|| format!("Invalid location '{}'", spec.name))
            })
            .collect()
    }
}

/// Version-bearing files of the vcpkg port in `port_dir`.
pub fn port_locations(port_dir: &Path) -> Vec<LocationSpec> {
    vec![
        LocationSpec {
            name: PACKAGE_PORT.to_string(),
            path: port_dir.join("portfile.cmake"),
            pattern: format!(r"REF {}", SEMVER),
        },
        LocationSpec {
            name: PACKAGE_CONTROL.to_string(),
            path: port_dir.join("CONTROL"),
            pattern: format!(r"Version: {}", SEMVER),
        },
    ]
}

/// The GameBackbone location table.
///
/// The port files are only tracked when the vcpkg port directory is known.
/// Pass it as an absolute path; relative paths end up under the repository root.
pub fn default_locations(port_dir: Option<&Path>) -> LocationsFile {
    let mut locations = vec![
        LocationSpec {
            name: PRIMARY_MANIFEST.to_string(),
            path: PathBuf::from("CMakeLists.txt"),
            pattern: format!(r#""GameBackboneProject" VERSION {}"#, SEMVER),
        },
        LocationSpec {
            name: DOC_CONFIG.to_string(),
            path: PathBuf::from("Doxyfile"),
            pattern: format!(r"PROJECT_NUMBER\s+=\s+{}", SEMVER),
        },
        LocationSpec {
            name: CONSUMER_MANIFEST.to_string(),
            path: Path::new("Tests")
                .join("InstallConsumer")
                .join("CMakeLists.txt"),
            pattern: format!(r"find_package\(GameBackbone {}", SEMVER),
        },
    ];

    if let Some(port_dir) = port_dir {
        locations.extend(port_locations(port_dir));
    }

    LocationsFile { locations }
}
