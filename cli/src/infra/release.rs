//! Release resolution infrastructure — implements `ReleaseResolver`.
//!
//! Reads the vendor's `latest.json` manifest to learn the newest published
//! agent version. Used by `warden check` and by unpinned converge runs.

use std::time::Duration;

use anyhow::{Context, Result};
use semver::Version;

use crate::application::ports::ReleaseResolver;
use crate::domain::agent::latest_manifest_url;
use crate::domain::config::SourceConfig;

/// Production `ReleaseResolver` backed by the vendor manifest endpoint.
pub struct HttpReleaseResolver {
    url: String,
    auth: Option<(String, String)>,
    timeout: Duration,
}

impl HttpReleaseResolver {
    #[must_use]
    pub fn new(source: &SourceConfig) -> Self {
        Self {
            url: latest_manifest_url(&source.base_url),
            auth: source
                .username
                .clone()
                .map(|user| (user, source.password.clone().unwrap_or_default())),
            timeout: Duration::from_secs(source.timeout_secs),
        }
    }
}

impl ReleaseResolver for HttpReleaseResolver {
    async fn latest_version(&self) -> Result<Version> {
        let url = self.url.clone();
        let auth = self.auth.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || fetch_latest(&url, auth.as_ref(), timeout))
            .await
            .context("spawn_blocking for release check")?
    }
}

fn fetch_latest(url: &str, auth: Option<&(String, String)>, timeout: Duration) -> Result<Version> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let req = agent
        .get(url)
        .set("Accept", "application/json")
        .set("User-Agent", concat!("warden/", env!("CARGO_PKG_VERSION")));
    let req = match auth {
        Some((user, pass)) => req.set(
            "Authorization",
            &format!("Basic {}", base64_encode(format!("{user}:{pass}").as_bytes())),
        ),
        None => req,
    };

    let body: serde_json::Value = match req.call() {
        Ok(resp) => serde_json::from_str(&resp.into_string().context("reading response")?)
            .context("parsing latest-release manifest")?,
        Err(ureq::Error::Status(code, _)) => {
            anyhow::bail!("Cannot check the latest Sentinel release: HTTP {code}")
        }
        Err(_) => anyhow::bail!(
            "Cannot check the latest Sentinel release: no network connection.\n\nPin a version to converge offline."
        ),
    };

    parse_manifest(&body)
}

fn parse_manifest(body: &serde_json::Value) -> Result<Version> {
    let version = body
        .get("version")
        .and_then(|v| v.as_str())
        .context("latest-release manifest has no 'version' field")?;
    Version::parse(version)
        .with_context(|| format!("invalid version '{version}' in latest-release manifest"))
}

/// Encode bytes as standard base64 (for HTTP Basic credentials).
fn base64_encode(input: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut out = String::with_capacity(input.len().div_ceil(3) * 4);
    for chunk in input.chunks(3) {
        let mut buf = 0u32;
        for (i, &byte) in chunk.iter().enumerate() {
            buf |= u32::from(byte) << (16 - 8 * i);
        }
        for i in 0..4 {
            if i <= chunk.len() {
                let idx = ((buf >> (18 - 6 * i)) & 0x3f) as usize;
                out.push(char::from(ALPHABET[idx]));
            } else {
                out.push('=');
            }
        }
    }
    out
}
