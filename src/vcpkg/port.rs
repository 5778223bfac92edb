use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use regex::{NoExpand, Regex};
use std::path::{Path, PathBuf};

use crate::platform::Platform;
use crate::registry::VersionRegistry;
use crate::registry::locations::{LocationsFile, port_locations};
use crate::runtime::Runtime;
use crate::version::SemanticVersion;

pub const DEFAULT_PORT: &str = "gamebackbone";

/// Written before querying vcpkg so it reports the real hash.
pub const SHA_PLACEHOLDER: &str = "1";

const PORTFILE: &str = "portfile.cmake";

/// Moves the GameBackbone vcpkg port to a new release.
///
/// vcpkg only tells us the archive hash when the recorded one is wrong, so
/// the port is first written with a placeholder hash, installed once, and
/// then rewritten with the hash vcpkg reported.
pub struct PortUpdater<'a, R: Runtime> {
    runtime: &'a R,
    vcpkg_dir: PathBuf,
    port: String,
    binary: PathBuf,
    package_spec: String,
    sha_line_re: Regex,
    actual_hash_re: Regex,
}

impl<'a, R: Runtime> PortUpdater<'a, R> {
    /// `vcpkg_dir` should be absolute; vcpkg is started with it as the working directory.
    pub fn new(
        runtime: &'a R,
        platform: Platform,
        vcpkg_dir: PathBuf,
        port: &str,
        triplet: Option<&str>,
    ) -> Result<Self> {
        let package_spec = match triplet.or(platform.default_triplet()) {
            Some(triplet) => format!("{}:{}", port, triplet),
            None => port.to_string(),
        };
        Ok(Self {
            runtime,
            binary: platform.binary_path(&vcpkg_dir),
            vcpkg_dir,
            port: port.to_string(),
            package_spec,
            sha_line_re: Regex::new(r"SHA512 [^\r\n]+")?,
            actual_hash_re: Regex::new(r"Actual hash:\s*\[?\s*([a-zA-Z0-9]+)\s*\]?")?,
        })
    }

    fn port_subdir(&self) -> PathBuf {
        Path::new("ports").join(&self.port)
    }

    pub fn port_dir(&self) -> PathBuf {
        self.vcpkg_dir.join(self.port_subdir())
    }

    pub fn package_spec(&self) -> &str {
        &self.package_spec
    }

    /// Replace every `SHA512 ...` line, keeping its line ending.
    pub fn set_sha(&self, text: &str, sha: &str) -> Result<String> {
        if !self.sha_line_re.is_match(text) {
            return Err(anyhow!("No SHA512 line found in {}", PORTFILE));
        }
        let replacement = format!("SHA512 {}", sha);
        Ok(self
            .sha_line_re
            .replace_all(text, NoExpand(&replacement))
            .into_owned())
    }

    /// Hash vcpkg reports after a mismatch, e.g. `Actual hash: [ 3f2a... ]`.
    pub fn extract_sha(&self, output: &str) -> Option<String> {
        self.actual_hash_re
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn write_sha(&self, sha: &str) -> Result<()> {
        let portfile = self.port_dir().join(PORTFILE);
        let text = self
            .runtime
            .read_to_string(&portfile)
            .with_context(|| format!("Failed to read {:?}", portfile))?;
        let updated = self.set_sha(&text, sha)?;
        self.runtime
            .write(&portfile, updated.as_bytes())
            .with_context(|| format!("Failed to write {:?}", portfile))
    }

    /// Run the install that is expected to fail and pull the real hash out of it.
    #[tracing::instrument(skip(self))]
    fn query_sha(&self) -> Result<String> {
        let args = vec!["install".to_string(), self.package_spec.clone()];
        info!("Running {:?} install {}", self.binary, self.package_spec);
        let output = self
            .runtime
            .run(&self.binary, &args, &self.vcpkg_dir)
            .with_context(|| format!("Failed to run {:?}", self.binary))?;
        debug!("vcpkg exited with {:?}", output.code);

        self.extract_sha(&output.stdout)
            .or_else(|| self.extract_sha(&output.stderr))
            .ok_or_else(|| {
                anyhow!(
                    "vcpkg did not report an actual hash for {}; output was:\n{}",
                    self.package_spec,
                    output.stdout
                )
            })
    }

    /// Point the port at `version` and record its archive hash.
    ///
    /// The new `REF`, `Version:` and placeholder hash are all prepared in
    /// memory, so a port that cannot be updated is left untouched.
    /// Returns the hash written to the portfile.
    #[tracing::instrument(skip(self))]
    pub fn update(&self, version: &SemanticVersion) -> Result<String> {
        let locations = LocationsFile {
            locations: port_locations(&self.port_subdir()),
        }
        .resolve(&self.vcpkg_dir)?;
        let registry = VersionRegistry::new(self.runtime, locations);

        let mut pending = registry.prepare(version)?;
        let portfile = self.port_dir().join(PORTFILE);
        let write = pending
            .iter_mut()
            .find(|write| write.path == portfile)
            .ok_or_else(|| anyhow!("{:?} is not a tracked port location", portfile))?;
        write.rewritten = self.set_sha(&write.rewritten, SHA_PLACEHOLDER)?;
        registry.commit(pending)?;

        let sha = self.query_sha()?;
        self.write_sha(&sha)?;

        info!("Port {} now at {} ({})", self.port, version, sha);
        Ok(sha)
    }
}
