pub mod archive;
pub mod cleanup;
pub mod commands;
pub mod download;
pub mod http;
pub mod masstest;
pub mod platform;
pub mod registry;
pub mod runtime;
pub mod vcpkg;
pub mod version;
