use anyhow::{Context, Result};
use log::info;
use std::io::Write;
use std::path::PathBuf;

use super::config::Config;
use crate::{
    archive::Extractor,
    download::Downloader,
    registry::VersionSnapshot,
    runtime::Runtime,
    version::SemanticVersion,
};

/// Print the primary version as written, with no trailing newline, for use in scripts.
#[tracing::instrument(skip(config))]
pub fn get<R: Runtime, D: Downloader, E: Extractor>(
    config: &Config<R, D, E>,
) -> Result<String> {
    let found = config.registry()?.primary_version()?;
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", found.text)?;
    stdout.flush()?;
    Ok(found.text)
}

/// Check that every location agrees and, when given, that the version moved past `last_version`.
#[tracing::instrument(skip(config))]
pub fn validate<R: Runtime, D: Downloader, E: Extractor>(
    config: &Config<R, D, E>,
    last_version: Option<&str>,
) -> Result<VersionSnapshot> {
    let previous = last_version
        .map(|v| {
            v.parse::<SemanticVersion>()
                .with_context(|| format!("Invalid --last-version '{}'", v))
        })
        .transpose()?;

    let snapshot = config.registry()?.validate(previous.as_ref())?;
    for entry in snapshot.entries() {
        println!("{:<20} {}", entry.name, entry.text);
    }
    if let Some(primary) = snapshot.primary() {
        println!("All {} locations agree on {}", snapshot.entries().len(), primary.text);
    }
    Ok(snapshot)
}

/// Rewrite every location to `version`. Returns the files that changed.
#[tracing::instrument(skip(config))]
pub fn set<R: Runtime, D: Downloader, E: Extractor>(
    config: &Config<R, D, E>,
    version: &str,
) -> Result<Vec<PathBuf>> {
    // Reject bad input before any file is read
    let version: SemanticVersion = version.parse()?;
    let changed = config.registry()?.update_all(&version)?;

    if changed.is_empty() {
        println!("All locations already at {}", version);
    }
    for path in &changed {
        println!("Updated {}", path.display());
    }
    info!("Version set to {}", version);
    Ok(changed)
}
