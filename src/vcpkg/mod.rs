//! vcpkg plumbing: keeping the GameBackbone port current and preparing a
//! checkout with the libraries the engine depends on.

mod install;
mod port;

pub use install::{DEFAULT_ARCHIVE_URL, DEFAULT_PACKAGES, VcpkgInstaller, VcpkgSource};
pub use port::{DEFAULT_PORT, PortUpdater, SHA_PLACEHOLDER};
