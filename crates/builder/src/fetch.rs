//! Source download with a checksum-keyed cache
//!
//! Archives land in `<downloads>/<digest>/<file name>`. A cached archive is
//! re-verified before reuse, and a freshly fetched one is verified before it
//! is moved into place, so the cache never holds a file whose digest does not
//! match its directory name.

use cpkg_config::NetworkConfig;
use cpkg_errors::{BuildError, Error};
use cpkg_events::{AppEvent, EventEmitter, EventSender, SourceEvent};
use cpkg_hash::verify_file;
use cpkg_recipe::SourceRef;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Where a mirror URL points
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Http(String),
    Local(PathBuf),
}

impl Location {
    fn parse(url: &str) -> Result<Self, Error> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Self::Http(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if url.contains("://") {
            return Err(BuildError::InvalidUrl {
                url: url.to_string(),
            }
            .into());
        }
        Ok(Self::Local(PathBuf::from(url)))
    }
}

/// Outcome of one download attempt
enum AttemptError {
    Retryable(String),
    Fatal(String),
}

/// Check if an error should trigger a retry
fn should_retry(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.status().is_some_and(|s| s.is_server_error())
}

/// Fetches and verifies source archives
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    downloads: PathBuf,
    network: NetworkConfig,
    events: Option<EventSender>,
}

impl EventEmitter for Fetcher {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl Fetcher {
    /// Create a fetcher storing archives under `downloads`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(downloads: impl Into<PathBuf>, network: NetworkConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(network.timeout())
            .user_agent(concat!("cpkg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            downloads: downloads.into(),
            network,
            events: None,
        })
    }

    #[must_use]
    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    /// Cache location of a source archive
    #[must_use]
    pub fn cache_path(&self, source: &SourceRef) -> PathBuf {
        self.downloads
            .join(&source.checksum.value)
            .join(source.file_name())
    }

    /// Return a verified local copy of the archive
    ///
    /// Mirrors are tried in order. Transport failures move on to the next
    /// mirror; a checksum mismatch is fatal and the bad file is removed.
    ///
    /// # Errors
    /// Returns `HashMismatch`, `NetworkDisabled`, `InvalidUrl`, or
    /// `FetchFailed` once every mirror has failed.
    pub async fn fetch(&self, source: &SourceRef) -> Result<PathBuf, Error> {
        let dest = self.cache_path(source);

        if fs::try_exists(&dest).await.unwrap_or(false) {
            match verify_file(&dest, &source.checksum).await {
                Ok(()) => {
                    self.emit(AppEvent::Source(SourceEvent::CacheHit { path: dest.clone() }));
                    return Ok(dest);
                }
                Err(e) => {
                    self.emit_warning(format!("discarding cached download: {e}"));
                    fs::remove_file(&dest)
                        .await
                        .map_err(|e| Error::io_with_path(&e, &dest))?;
                }
            }
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
        let partial = dest.with_extension("part");

        let mut last_error = String::from("no mirrors");
        for url in &source.urls {
            let fetched = match Location::parse(url)? {
                Location::Local(path) => self.copy_local(&path, &partial).await,
                Location::Http(url) => {
                    if !self.network.allow_downloads {
                        return Err(BuildError::NetworkDisabled { url }.into());
                    }
                    self.download_with_retry(&url, &partial).await
                }
            };
            if let Err(message) = fetched {
                let _ = fs::remove_file(&partial).await;
                last_error = message;
                continue;
            }

            if let Err(e) = verify_file(&partial, &source.checksum).await {
                let _ = fs::remove_file(&partial).await;
                return Err(match e {
                    Error::Build(BuildError::HashMismatch {
                        expected, actual, ..
                    }) => BuildError::HashMismatch {
                        file: url.clone(),
                        expected,
                        actual,
                    }
                    .into(),
                    other => other,
                });
            }
            self.emit(AppEvent::Source(SourceEvent::Verified {
                path: dest.clone(),
                checksum: source.checksum.to_string(),
            }));

            fs::rename(&partial, &dest)
                .await
                .map_err(|e| Error::io_with_path(&e, &dest))?;
            return Ok(dest);
        }

        Err(BuildError::FetchFailed {
            url: source.urls.join(", "),
            message: last_error,
        }
        .into())
    }

    async fn copy_local(&self, path: &Path, dest: &Path) -> Result<(), String> {
        let bytes = fs::copy(path, dest)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;
        self.emit(AppEvent::Source(SourceEvent::DownloadCompleted {
            url: path.display().to_string(),
            bytes,
        }));
        Ok(())
    }

    async fn download_with_retry(&self, url: &str, dest: &Path) -> Result<(), String> {
        let mut last_error = String::new();

        for attempt in 0..=self.network.retries {
            if attempt > 0 {
                self.emit(AppEvent::Source(SourceEvent::DownloadRetry {
                    url: url.to_string(),
                    attempt,
                    error: last_error.clone(),
                }));
                tokio::time::sleep(self.network.retry_delay() * attempt).await;
            }

            self.emit(AppEvent::Source(SourceEvent::DownloadStarted {
                url: url.to_string(),
                attempt,
            }));

            match self.download_once(url, dest).await {
                Ok(bytes) => {
                    self.emit(AppEvent::Source(SourceEvent::DownloadCompleted {
                        url: url.to_string(),
                        bytes,
                    }));
                    return Ok(());
                }
                Err(AttemptError::Fatal(message)) => return Err(message),
                Err(AttemptError::Retryable(message)) => last_error = message,
            }
        }

        Err(last_error)
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<u64, AttemptError> {
        let classify = |e: reqwest::Error| {
            if should_retry(&e) {
                AttemptError::Retryable(e.to_string())
            } else {
                AttemptError::Fatal(e.to_string())
            }
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(classify)?;

        let mut file = fs::File::create(dest)
            .await
            .map_err(|e| AttemptError::Fatal(format!("{}: {e}", dest.display())))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| AttemptError::Fatal(format!("{}: {e}", dest.display())))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| AttemptError::Fatal(format!("{}: {e}", dest.display())))?;

        Ok(written)
    }
}
