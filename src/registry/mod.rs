//! Read, validate and rewrite the version across every tracked location.
//!
//! Each call goes back to the files: nothing read here is cached between
//! calls. Updates compute every rewritten file in memory before the first
//! write, so a missing pattern in the last file never leaves the first one
//! modified. Writes themselves are not transactional; if the third of five
//! writes fails, the first two files keep the new version.

pub mod locations;

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;

use crate::runtime::Runtime;
use crate::version::{SemanticVersion, VersionError, assert_monotonic};

pub use locations::{LocationsFile, VersionLocation, default_locations};

/// The version one location carries.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundVersion {
    pub name: String,
    /// Captured text, byte for byte; `1.02.0` stays `1.02.0`.
    pub text: String,
    pub version: SemanticVersion,
}

impl FoundVersion {
    fn parse(name: &str, text: &str) -> Result<Self, VersionError> {
        Ok(Self {
            name: name.to_string(),
            text: text.to_string(),
            version: text.parse()?,
        })
    }
}

/// Versions found at each location, in configuration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VersionSnapshot {
    entries: Vec<FoundVersion>,
}

impl VersionSnapshot {
    pub fn new(entries: Vec<FoundVersion>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FoundVersion] {
        &self.entries
    }

    /// The first configured location's version.
    pub fn primary(&self) -> Option<&FoundVersion> {
        self.entries.first()
    }
}

/// True when every location carries the same text. Empty and single-entry snapshots agree.
pub fn validate_consistency(snapshot: &VersionSnapshot) -> bool {
    match snapshot.entries.split_first() {
        Some((first, rest)) => rest.iter().all(|entry| entry.text == first.text),
        None => true,
    }
}

/// A rewritten file held in memory until every location has been prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub name: String,
    pub path: PathBuf,
    pub original: String,
    pub rewritten: String,
}

pub struct VersionRegistry<'a, R: Runtime> {
    runtime: &'a R,
    locations: Vec<VersionLocation>,
}

impl<'a, R: Runtime> VersionRegistry<'a, R> {
    pub fn new(runtime: &'a R, locations: Vec<VersionLocation>) -> Self {
        Self { runtime, locations }
    }

    pub fn locations(&self) -> &[VersionLocation] {
        &self.locations
    }

    fn read_location(&self, location: &VersionLocation) -> Result<String, VersionError> {
        self.runtime
            .read_to_string(&location.path)
            .map_err(|cause| VersionError::LocationRead {
                name: location.name.clone(),
                cause,
            })
    }

    fn extract(&self, location: &VersionLocation) -> Result<FoundVersion, VersionError> {
        let text = self.read_location(location)?;
        location
            .pattern
            .capture(&text)
            .and_then(|captured| FoundVersion::parse(&location.name, captured))
            .map_err(|e| VersionError::LocationRead {
                name: location.name.clone(),
                cause: anyhow::Error::from(e).context(format!("in {:?}", location.path)),
            })
    }

    /// Read every location. The first failure aborts the whole read.
    #[tracing::instrument(skip(self))]
    pub fn read_all(&self) -> Result<VersionSnapshot, VersionError> {
        let mut entries = Vec::with_capacity(self.locations.len());
        for location in &self.locations {
            let found = self.extract(location)?;
            debug!("{} ({:?}) is at {}", location.name, location.path, found.text);
            entries.push(found);
        }
        Ok(VersionSnapshot::new(entries))
    }

    /// Version of the first configured location.
    pub fn primary_version(&self) -> Result<FoundVersion, VersionError> {
        let location = self.locations.first().ok_or_else(|| VersionError::NotFound {
            pattern: "<no locations configured>".to_string(),
        })?;
        self.extract(location)
    }

    /// Check that the release version went up and that every location agrees.
    #[tracing::instrument(skip(self))]
    pub fn validate(
        &self,
        previous: Option<&SemanticVersion>,
    ) -> Result<VersionSnapshot, VersionError> {
        let snapshot = self.read_all()?;
        if let Some(primary) = snapshot.primary() {
            assert_monotonic(&primary.version, previous)?;
        }
        if !validate_consistency(&snapshot) {
            return Err(VersionError::Mismatch(
                snapshot
                    .entries
                    .iter()
                    .map(|entry| (entry.name.clone(), entry.text.clone()))
                    .collect(),
            ));
        }
        Ok(snapshot)
    }

    /// Read every location and rewrite it in memory. Nothing is written.
    ///
    /// Fails on the first location that cannot be read or has no match.
    #[tracing::instrument(skip(self))]
    pub fn prepare(&self, version: &SemanticVersion) -> Result<Vec<PendingWrite>> {
        let mut pending = Vec::with_capacity(self.locations.len());
        for location in &self.locations {
            let original = self.read_location(location)?;
            let rewritten = location.pattern.rewrite(&original, version).map_err(|e| {
                VersionError::LocationRead {
                    name: location.name.clone(),
                    cause: anyhow::Error::from(e).context(format!("in {:?}", location.path)),
                }
            })?;
            pending.push(PendingWrite {
                name: location.name.clone(),
                path: location.path.clone(),
                original,
                rewritten,
            });
        }
        Ok(pending)
    }

    /// Write prepared files, skipping those whose content did not change.
    ///
    /// Returns the paths written.
    pub fn commit(&self, pending: Vec<PendingWrite>) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for write in pending {
            if write.original == write.rewritten {
                debug!("{} unchanged", write.name);
                continue;
            }
            self.runtime
                .write(&write.path, write.rewritten.as_bytes())
                .with_context(|| {
                    format!(
                        "Failed to write {} ({:?}); files listed before it were already written",
                        write.name, write.path
                    )
                })?;
            info!("Updated {}", write.name);
            changed.push(write.path);
        }
        Ok(changed)
    }

    /// Rewrite every location to `version`.
    ///
    /// Returns the paths whose content actually changed.
    #[tracing::instrument(skip(self))]
    pub fn update_all(&self, version: &SemanticVersion) -> Result<Vec<PathBuf>> {
        let pending = self.prepare(version)?;
        let changed = self.commit(pending)?;
        info!("{} of {} locations now at {}", changed.len(), self.locations.len(), version);
        Ok(changed)
    }
}
