//! Package download infrastructure — implements `PackageFetcher`.
//!
//! Streams release archives over HTTP(S) with retry, a fleet-wide
//! concurrency cap, and SHA-256 sidecar verification. A download lands in
//! a `.partial` file and is renamed into place only after its digest
//! matches the sidecar, so the install root never holds a half-written or
//! unverified archive.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::application::ports::{FetchRequest, PackageFetcher};
use crate::application::services::fleet::DownloadThrottle;
use crate::domain::config::SourceConfig;
use crate::domain::error::DownloadError;
use crate::infra::fs::sha256_file;

/// Production `PackageFetcher` backed by reqwest.
pub struct HttpPackageFetcher {
    client: reqwest::Client,
    auth: Option<(String, String)>,
    retry_attempts: u32,
    retry_delay: Duration,
    throttle: DownloadThrottle,
    quiet: bool,
}

impl HttpPackageFetcher {
    /// Build a fetcher from the package-source settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the proxy URL is invalid or the TLS backend
    /// cannot be initialized.
    pub fn new(source: &SourceConfig, throttle: DownloadThrottle, quiet: bool) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")));
        if !source.validate_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(proxy) = &source.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy).with_context(|| format!("invalid proxy URL {proxy}"))?,
            );
        }
        let client = builder.build().context("building HTTP client")?;
        let auth = source
            .username
            .clone()
            .map(|user| (user, source.password.clone().unwrap_or_default()));
        Ok(Self {
            client,
            auth,
            retry_attempts: source.retry_attempts.max(1),
            retry_delay: Duration::from_secs(source.retry_delay_secs),
            throttle,
            quiet,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        match &self.auth {
            Some((user, pass)) => req.basic_auth(user, Some(pass)),
            None => req,
        }
    }

    async fn fetch_digest(&self, url: &str) -> Result<String> {
        let response = self
            .get(url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }
        let body = response.text().await.context("reading checksum sidecar")?;
        parse_checksum(&body).ok_or_else(|| anyhow::anyhow!("malformed checksum sidecar at {url}"))
    }

    async fn download(&self, url: &str, partial: &Path) -> Result<()> {
        let response = self
            .get(url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let total = response.content_length();
        let pb = make_progress_bar(self.quiet, total);

        let mut file = tokio::fs::File::create(partial)
            .await
            .with_context(|| format!("creating {}", partial.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("download interrupted")?;
            file.write_all(&chunk).await.context("writing package")?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await.context("writing package")?;
        pb.finish_and_clear();
        Ok(())
    }
}

impl PackageFetcher for HttpPackageFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<bool> {
        // One slot per package, held across retries, so the fleet-wide
        // cap counts in-flight packages rather than in-flight requests.
        let _permit = self.throttle.acquire().await?;

        let expected = self.fetch_digest(&request.checksum_url).await?;

        if request.dest.exists() {
            if hash_file(&request.dest).await? == expected {
                return Ok(false);
            }
            // Stale or corrupt archive at the destination; replace it.
        }

        let partial = partial_path(&request.dest);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.download(&request.url, &partial).await {
                Ok(()) => break,
                Err(e) if attempt < self.retry_attempts && is_retryable(&e) => {
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) if is_retryable(&e) => {
                    return Err(e.context(DownloadError::Exhausted {
                        url: request.url.clone(),
                        attempts: attempt,
                    }));
                }
                Err(e) => return Err(e),
            }
        }

        let actual = hash_file(&partial).await?;
        if actual != expected {
            let _ = std::fs::remove_file(&partial);
            let package = request.dest.file_name().map_or_else(
                || request.dest.display().to_string(),
                |n| n.to_string_lossy().into_owned(),
            );
            return Err(DownloadError::ChecksumMismatch {
                package,
                expected,
                actual,
            }
            .into());
        }

        std::fs::rename(&partial, &request.dest)
            .with_context(|| format!("finalizing {}", request.dest.display()))?;
        Ok(true)
    }
}

async fn hash_file(path: &Path) -> Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || sha256_file(&path))
        .await
        .context("spawn_blocking for sha256")?
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut s = dest.as_os_str().to_owned();
    s.push(".partial");
    PathBuf::from(s)
}

/// Extract the digest from a `<hex>  <filename>` sidecar body.
fn parse_checksum(body: &str) -> Option<String> {
    let hex = body.split_whitespace().next()?;
    if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_ascii_lowercase())
    } else {
        None
    }
}

/// Server-side failures and transport errors are worth retrying; client
/// errors like 404 and checksum mismatches are not.
fn is_retryable(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<DownloadError>() {
        Some(DownloadError::Status { status, .. }) => *status >= 500,
        Some(_) => false,
        None => true,
    }
}

fn make_progress_bar(quiet: bool, total: Option<u64>) -> indicatif::ProgressBar {
    if quiet {
        return indicatif::ProgressBar::hidden();
    }
    if let Some(t) = total {
        let pb = indicatif::ProgressBar::new(t);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("[{bar:40}] {percent}%")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    } else {
        indicatif::ProgressBar::new_spinner()
    }
}
