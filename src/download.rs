//! Bulk image downloading
//!
//! Streams each URL straight to disk under a random file name, a few requests
//! at a time. Individual failures are expected (dead links, hot-link
//! protection) and only logged.

use crate::error::{CurationError, Result};
use crate::services::ImageIOService;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures_util::stream::TryStreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// Suffix used when a URL carries no usable extension
const DEFAULT_SUFFIX: &str = ".jpg";

/// Longest URL suffix kept verbatim
const MAX_SUFFIX_LEN: usize = 12;

/// Writes the images behind a list of URLs into a folder
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download up to `limit` of `urls` into `destination`, returning how many were written
    ///
    /// # Errors
    /// When `destination` cannot be created, or when `urls` is non-empty and
    /// nothing at all could be downloaded.
    async fn fetch(&self, urls: &[String], destination: &Path, limit: usize) -> Result<usize>;
}

/// File name for a downloaded URL: a fresh UUID plus the URL's extension
#[must_use]
pub fn file_name_for(url: &str) -> String {
    format!("{}{}", uuid::Uuid::new_v4(), url_suffix(url))
}

/// Extension of the last path segment of `url`, `.jpg` when missing or odd
fn url_suffix(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();

    match segment.rfind('.') {
        Some(dot) => {
            let suffix = segment.get(dot..).unwrap_or_default();
            let well_formed = suffix.len() > 1
                && suffix.len() <= MAX_SUFFIX_LEN
                && suffix
                    .chars()
                    .skip(1)
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if well_formed {
                suffix
            } else {
                DEFAULT_SUFFIX
            }
        },
        None => DEFAULT_SUFFIX,
    }
}

/// Concurrent HTTP downloader
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
    concurrency: usize,
}

impl HttpImageFetcher {
    /// Create a downloader running `concurrency` requests at a time
    ///
    /// # Errors
    /// When the HTTP client cannot be built.
    pub fn new(concurrency: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CurationError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            concurrency: concurrency.max(1),
        })
    }

    /// Remove a download that could not be completed
    async fn discard_partial(path: &Path) {
        if let Err(cleanup_err) = tokio::fs::remove_file(path).await {
            log::warn!("Failed to remove partial download {}: {}", path.display(), cleanup_err);
        }
    }

    /// Download a single URL into `destination`
    async fn download_file(&self, url: &str, destination: &Path) -> Result<PathBuf> {
        let local_path = destination.join(file_name_for(url));
        log::debug!("Downloading: {} -> {}", url, local_path.display());

        let response =
            self.client.get(url).send().await.map_err(|e| {
                CurationError::network_error(format!("Failed to download {}", url), e)
            })?;

        if !response.status().is_success() {
            return Err(CurationError::network_error(
                format!("HTTP error {} for {}", response.status(), url),
                std::io::Error::new(std::io::ErrorKind::Other, "HTTP error"),
            ));
        }

        let mut file = tokio::fs::File::create(&local_path)
            .await
            .map_err(|e| CurationError::file_io_error("create file", &local_path, &e))?;

        let mut stream = StreamReader::new(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        let copied = tokio::io::copy(&mut stream, &mut file).await;
        let written = match copied {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                Self::discard_partial(&local_path).await;
                return Err(CurationError::network_error("Failed to read download stream", e));
            },
        };

        if let Err(e) = file.flush().await {
            drop(file);
            Self::discard_partial(&local_path).await;
            return Err(CurationError::file_io_error("flush file", &local_path, &e));
        }

        log::debug!("Downloaded {} bytes to {}", written, local_path.display());
        Ok(local_path)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, urls: &[String], destination: &Path, limit: usize) -> Result<usize> {
        ImageIOService::ensure_dir(destination)?;

        let wanted = urls.len().min(limit);
        if wanted == 0 {
            return Ok(0);
        }

        let downloaded = stream::iter(urls.iter().take(wanted).cloned())
            .map(|url| async move {
                match self.download_file(&url, destination).await {
                    Ok(_) => true,
                    Err(e) => {
                        log::debug!("Couldn't download {}: {}", url, e);
                        false
                    },
                }
            })
            .buffer_unordered(self.concurrency)
            .filter(|ok| futures::future::ready(*ok))
            .count()
            .await;

        log::info!(
            "Downloaded {}/{} images into {}",
            downloaded,
            wanted,
            destination.display()
        );

        if downloaded == 0 {
            return Err(CurationError::network_error(
                format!("No images could be downloaded into {}", destination.display()),
                format!("{} URLs failed", wanted),
            ));
        }

        Ok(downloaded)
    }
}
