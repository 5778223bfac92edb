pub mod config;
mod vcpkg;
mod version;

pub use mass_test::{MassTestArgs, mass_test};
pub use vcpkg::{install_vcpkg, update_port};
pub use version::{get, set, validate};

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use super::config::Config;
    use crate::archive::MockExtractor;
    use crate::download::MockDownloader;
    use crate::platform::{MockPlatformDetector, Platform};
    use crate::runtime::MockRuntime;

    pub type MockConfig = Config<MockRuntime, MockDownloader, MockExtractor>;

    /// Config over mocks, rooted at `/gb`, with the port at `/vcpkg/ports/gamebackbone`.
    pub fn mock_config(runtime: MockRuntime, platform: Platform) -> MockConfig {
        let mut detector = MockPlatformDetector::new();
        detector.expect_detect().returning(move || Ok(platform));
        Config {
            runtime,
            downloader: MockDownloader::new(),
            extractor: MockExtractor::new(),
            detector: Box::new(detector),
            root: PathBuf::from("/gb"),
            port_dir: Some(PathBuf::from("/vcpkg/ports/gamebackbone")),
            locations_file: None,
        }
    }
}
