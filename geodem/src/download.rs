//! HTTP retrieval of source archives.
//!
//! Only available when the `download` feature is enabled.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::{debug, info, warn};

use crate::error::{DemError, Result};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Redirects followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Configuration for downloading source archives.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of retry attempts on failure.
    pub max_retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 3,
        }
    }
}

impl DownloadConfig {
    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Blocking HTTP downloader with retries.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    config: DownloadConfig,
}

impl Downloader {
    /// Create a new downloader with the given configuration.
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| DemError::DownloadFailed {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download `url` to `dest`, retrying failed attempts.
    ///
    /// The body is streamed to a temporary file next to `dest` and renamed
    /// into place once complete.
    pub fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Brief delay before retry
                std::thread::sleep(Duration::from_millis(500 * attempt as u64));
            }

            match self.do_download(url, dest) {
                Ok(bytes) => {
                    info!(url, dest = %dest.display(), bytes, "Download complete");
                    return Ok(());
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "Download attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DemError::DownloadFailed {
            url: url.to_string(),
            reason: "Unknown error".to_string(),
        }))
    }

    /// Perform a single download attempt, returning the number of bytes written.
    fn do_download(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!(url, "Requesting");
        let mut response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(DemError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let dir = match dest.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        let bytes = response.copy_to(tmp.as_file_mut())?;
        tmp.persist(dest).map_err(|e| DemError::Io(e.error))?;

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_download_config_builder() {
        let config = DownloadConfig::default()
            .with_timeout(60)
            .with_max_retries(5);

        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_invalid_url_fails_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("archive.zip");
        let downloader =
            Downloader::new(DownloadConfig::default().with_max_retries(0)).unwrap();

        assert!(downloader.download("not a url", &dest).is_err());
        assert!(!dest.exists());
    }
}
