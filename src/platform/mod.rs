//! Host platform detection and the per-platform vcpkg layout.
//!
//! The platform is detected once per vcpkg command; everything that differs
//! between operating systems (binary name, bootstrap script, triplet) is
//! answered by the `Platform` value instead of comparing OS name strings.

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Operating systems vcpkg can be bootstrapped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// Detect the current platform
    pub fn detect() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style name to a platform.
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            other => Err(anyhow!("Unsupported operating system: {}", other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
        }
    }

    fn binary_name(&self) -> &'static str {
        match self {
            Platform::Windows => "vcpkg.exe",
            Platform::Linux | Platform::MacOs => "vcpkg",
        }
    }

    /// Path of the vcpkg executable inside a checkout.
    pub fn binary_path(&self, vcpkg_root: &Path) -> PathBuf {
        vcpkg_root.join(self.binary_name())
    }

    /// Path of the bootstrap script inside a checkout.
    pub fn bootstrap_script(&self, vcpkg_root: &Path) -> PathBuf {
        match self {
            Platform::Windows => vcpkg_root.join("bootstrap-vcpkg.bat"),
            Platform::Linux | Platform::MacOs => vcpkg_root.join("bootstrap-vcpkg.sh"),
        }
    }

    /// Whether the bootstrap script has to be marked executable before running.
    pub fn script_needs_exec_bit(&self) -> bool {
        !matches!(self, Platform::Windows)
    }

    /// Program and arguments that run the bootstrap script.
    pub fn bootstrap_command(&self, vcpkg_root: &Path) -> (PathBuf, Vec<String>) {
        let script = self.bootstrap_script(vcpkg_root);
        match self {
            Platform::Windows => (
                PathBuf::from("cmd"),
                vec!["/C".to_string(), script.to_string_lossy().into_owned()],
            ),
            Platform::Linux | Platform::MacOs => (script, Vec::new()),
        }
    }

    /// Triplet appended to package names, when the platform needs one.
    pub fn default_triplet(&self) -> Option<&'static str> {
        match self {
            Platform::Windows => Some("x64-windows"),
            Platform::Linux | Platform::MacOs => None,
        }
    }

    /// Package argument for `vcpkg install`, e.g. `sfml:x64-windows`.
    pub fn package_spec(&self, package: &str) -> String {
        match self.default_triplet() {
            Some(triplet) => format!("{}:{}", package, triplet),
            None => package.to_string(),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for platform detection (useful for testing)
#[cfg_attr(test, mockall::automock)]
pub trait PlatformDetector: Send + Sync {
    fn detect(&self) -> Result<Platform>;
}

/// Default platform detector using the compile-time target OS
pub struct DefaultPlatformDetector;

impl PlatformDetector for DefaultPlatformDetector {
    fn detect(&self) -> Result<Platform> {
        Platform::detect()
    }
}
