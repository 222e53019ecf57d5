//! Domain types and validators for Warden configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access. Loading
//! and saving the files lives in `crate::app`; this module owns the schema
//! and the rules.

use std::path::PathBuf;

use anyhow::Result;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentVariant;
use crate::domain::error::ConfigError;
use crate::domain::state::DesiredAgentState;

// ── Constants ────────────────────────────────────────────────────────────────

/// Vendor package mirror used when the config does not name one.
pub const DEFAULT_BASE_URL: &str = "https://downloads.sentinel-monitor.io/stable";

/// Fleet-wide cap on simultaneous downloads.
pub const DEFAULT_DOWNLOAD_SLOTS: usize = 5;

/// Variant installed when neither config nor flags pick one.
pub const DEFAULT_VARIANT: AgentVariant = AgentVariant::V1;

// ── Host config schema ───────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.warden/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WardenConfig {
    /// Which agent to converge to.
    #[serde(default)]
    pub agent: AgentSelection,
    /// Install root; platform default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_root: Option<PathBuf>,
    /// Where release packages come from.
    #[serde(default)]
    pub source: SourceConfig,
}

/// Agent selection. Stored as plain strings so that validation errors carry
/// our messages rather than serde's.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentSelection {
    /// `v1` or `v2`; defaults to `v1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Pinned version like `7.0.1`; unset accepts any installed version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Package source settings consumed by the download step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the vendor package layout.
    pub base_url: String,
    /// Basic-auth credentials for private mirrors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// HTTP(S) proxy URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Verify TLS certificates. Disable only for internal mirrors with
    /// self-signed chains.
    pub validate_tls: bool,
    /// Download attempts before giving up.
    pub retry_attempts: u32,
    /// Delay between download attempts, in seconds.
    pub retry_delay_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: None,
            password: None,
            proxy: None,
            timeout_secs: 120,
            validate_tls: true,
            retry_attempts: 3,
            retry_delay_secs: 5,
        }
    }
}

// ── Fleet inventory schema ───────────────────────────────────────────────────

/// Inventory file consumed by `warden fleet`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FleetInventory {
    /// Settings applied to every host unless overridden per entry.
    #[serde(default)]
    pub defaults: WardenConfig,
    /// Fleet-wide cap on simultaneous downloads.
    #[serde(default = "default_download_slots")]
    pub downloads: usize,
    /// Managed install roots.
    #[serde(default)]
    pub hosts: Vec<FleetHost>,
}

/// One managed install root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetHost {
    /// Unique name; also the default service instance.
    pub name: String,
    pub install_root: PathBuf,
    /// Service instance scope; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Per-host variant override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Per-host version override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl FleetHost {
    /// Instance name scoping this host's service entries.
    #[must_use]
    pub fn effective_instance(&self) -> &str {
        self.instance.as_deref().unwrap_or(&self.name)
    }
}

fn default_download_slots() -> usize {
    DEFAULT_DOWNLOAD_SLOTS
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Parses a version string from config or flags.
///
/// # Errors
///
/// Returns an error when the value is not a semantic version.
pub fn parse_version(value: &str) -> Result<Version> {
    Version::parse(value).map_err(|_| {
        ConfigError::InvalidVersion {
            value: value.to_string(),
        }
        .into()
    })
}

/// Resolves merged variant/version strings into a typed desired state.
///
/// Callers merge flag and file values first (flags win); this function only
/// parses and applies the variant default.
///
/// # Errors
///
/// Returns an error when the variant is unknown or the version malformed.
pub fn desired_from_parts(
    variant: Option<&str>,
    version: Option<&str>,
) -> Result<DesiredAgentState> {
    let variant = match variant {
        Some(raw) => raw.parse::<AgentVariant>()?,
        None => DEFAULT_VARIANT,
    };
    let version = version.map(parse_version).transpose()?;
    Ok(DesiredAgentState { variant, version })
}

/// Validates the package source settings.
///
/// # Errors
///
/// Returns an error when the base URL is not HTTP(S) or the retry/timeout
/// settings are out of range.
pub fn validate_source(source: &SourceConfig) -> Result<()> {
    if !source.base_url.starts_with("http://") && !source.base_url.starts_with("https://") {
        return Err(ConfigError::InvalidValue {
            key: "source.base_url".to_string(),
            value: source.base_url.clone(),
            reason: "Expected an http:// or https:// URL.".to_string(),
        }
        .into());
    }
    if source.retry_attempts == 0 {
        return Err(ConfigError::InvalidValue {
            key: "source.retry_attempts".to_string(),
            value: source.retry_attempts.to_string(),
            reason: "At least one attempt is required.".to_string(),
        }
        .into());
    }
    if source.timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "source.timeout_secs".to_string(),
            value: source.timeout_secs.to_string(),
            reason: "Timeout must be at least one second.".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Validates a fleet inventory: at least one host, unique names, a sane
/// download cap, and parseable per-host overrides.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_inventory(inventory: &FleetInventory) -> Result<()> {
    if inventory.hosts.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "hosts".to_string(),
            value: "[]".to_string(),
            reason: "An inventory needs at least one host.".to_string(),
        }
        .into());
    }
    if inventory.downloads == 0 {
        return Err(ConfigError::InvalidValue {
            key: "downloads".to_string(),
            value: "0".to_string(),
            reason: "The download cap must be at least 1.".to_string(),
        }
        .into());
    }
    let mut seen = std::collections::HashSet::new();
    for host in &inventory.hosts {
        if !seen.insert(host.name.as_str()) {
            return Err(ConfigError::DuplicateHost {
                name: host.name.clone(),
            }
            .into());
        }
        desired_for_host(host, &inventory.defaults)?;
    }
    validate_source(&inventory.defaults.source)?;
    Ok(())
}

/// Resolves the desired state for one fleet host, applying inventory
/// defaults where the entry has no override.
///
/// # Errors
///
/// Returns an error when the merged variant or version is invalid.
pub fn desired_for_host(host: &FleetHost, defaults: &WardenConfig) -> Result<DesiredAgentState> {
    desired_from_parts(
        host.variant.as_deref().or(defaults.agent.variant.as_deref()),
        host.version.as_deref().or(defaults.agent.version.as_deref()),
    )
}

// ── Unit tests ───────────────────────────────────────────────────────────────
