//! Archive downloads.
//!
//! The install pipeline fetches archives through the [`Transport`] trait so
//! it can run against an in-memory source in tests. [`HttpTransport`] is the
//! production implementation: it streams the response body straight into
//! the destination file and reports progress through an optional
//! [`ProgressCallback`].
//!
//! There is no retry and no temporary-file rename. A transfer that fails
//! midway leaves the partial file at the destination.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::catalog::USER_AGENT;
use crate::config::Config;
use crate::error::{PvmError, Result};

/// Progress event emitted during downloads.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Download has started.
    Started {
        url: String,
        /// Total size in bytes, or 0 if the server did not say.
        total: u64,
    },
    /// Download progress update.
    Progress {
        /// Bytes downloaded so far.
        downloaded: u64,
        /// Current download speed in bytes per second.
        speed: u64,
    },
    /// Download completed successfully.
    Completed { downloaded: u64 },
    /// Download failed with an error.
    Failed { error: String },
}

/// Callback type for receiving progress updates during downloads.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Minimum interval between progress callback invocations in milliseconds.
const PROGRESS_CALLBACK_INTERVAL_MS: u128 = 100;

/// Fetches the bytes behind a URL into a local file.
pub trait Transport {
    /// Writes the content at `url` to `dest`, creating or truncating it.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`PvmError::Transport`] for connection, status or read failures;
    /// [`PvmError::Filesystem`] if `dest` cannot be written.
    fn download(&self, url: &str, dest: &Path) -> impl Future<Output = Result<u64>> + Send;
}

/// Downloads over HTTP(S) with reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Builds a client with the configured timeouts.
    ///
    /// The connect timeout bounds connection setup and the read timeout
    /// bounds each read, so a stalled transfer is aborted while a slow but
    /// steady one is not.
    ///
    /// # Errors
    ///
    /// Returns [`PvmError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                PvmError::transport_with_source(
                    config.dist_server(),
                    "Failed to create HTTP client",
                    e,
                )
            })?;

        Ok(Self {
            client,
            base_url: config.dist_server().to_string(),
            progress: None,
        })
    }

    /// Reports progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Turns a catalog link into an absolute URL.
    ///
    /// Absolute `http(s)` URLs are returned unchanged; anything else is
    /// appended to the distribution server.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        resolve_url(&self.base_url, url)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PvmError::transport_with_source(url, "Failed to connect", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PvmError::transport(url, format!("HTTP error {status}")));
        }

        let total = response.content_length().unwrap_or(0);
        self.emit(ProgressEvent::Started {
            url: url.to_string(),
            total,
        });

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| PvmError::filesystem("Failed to create file", dest, e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let start_time = Instant::now();
        let mut last_update = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| PvmError::transport_with_source(url, "Failed to read response", e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PvmError::filesystem("Failed to write", dest, e))?;
            downloaded += chunk.len() as u64;

            let now = Instant::now();
            if now.duration_since(last_update).as_millis() >= PROGRESS_CALLBACK_INTERVAL_MS {
                self.emit(ProgressEvent::Progress {
                    downloaded,
                    speed: bytes_per_second(downloaded, start_time.elapsed().as_secs_f64()),
                });
                last_update = now;
            }
        }

        file.flush()
            .await
            .map_err(|e| PvmError::filesystem("Failed to flush", dest, e))?;

        Ok(downloaded)
    }
}

impl Transport for HttpTransport {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let url = self.resolve_url(url);
        debug!("Downloading {url} to {}", dest.display());

        match self.fetch(&url, dest).await {
            Ok(downloaded) => {
                self.emit(ProgressEvent::Completed { downloaded });
                Ok(downloaded)
            }
            Err(e) => {
                self.emit(ProgressEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

fn resolve_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn bytes_per_second(downloaded: u64, elapsed_secs: f64) -> u64 {
    if elapsed_secs > 0.0 {
        (downloaded as f64 / elapsed_secs) as u64
    } else {
        0
    }
}

/// Formats bytes into a human-readable string (KB, MB, GB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats speed (bytes/sec) into a human-readable string.
#[must_use]
pub fn format_speed(speed: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    #[allow(clippy::cast_precision_loss)]
    let speed_f = speed as f64;

    if speed >= MB {
        format!("{:.2} MB/s", speed_f / MB as f64)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed_f / KB as f64)
    } else {
        format!("{speed} B/s")
    }
}
