use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::Path;

/// Fetches a URL into a file created through the runtime.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download<R: Runtime + 'static>(
        &self,
        runtime: &R,
        url: &str,
        dest: &Path,
    ) -> Result<u64>;
}

pub struct HttpDownloader {
    http_client: HttpClient,
}

impl HttpDownloader {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download<R: Runtime + 'static>(
        &self,
        runtime: &R,
        url: &str,
        dest: &Path,
    ) -> Result<u64> {
        download_file(runtime, url, dest, &self.http_client).await
    }
}

/// Downloads a file from a URL to `dest` with retry support.
#[tracing::instrument(skip(runtime, dest, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    info!("Downloading {}...", url);

    let bytes = http_client
        .download_file(url, || {
            runtime
                .create_file(dest)
                .with_context(|| format!("Failed to create {:?}", dest))
        })
        .await?;

    info!("Download complete.");
    Ok(bytes)
}
