//! Agent variant identity and release naming rules.
//!
//! Pure data about the two Sentinel agent generations: executable, config,
//! service, and package names, plus the vendor download-URL layout. No I/O.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// The two mutually exclusive generations of the Sentinel agent.
///
/// Exactly one generation is ever the convergence target; the other is
/// removed when found. Presence is modelled explicitly (see
/// `domain::state`), never inferred from loosely-typed flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentVariant {
    /// Classic daemon, shipped as `sentineld`.
    V1,
    /// Next-generation agent, shipped as `sentinel2`.
    V2,
}

/// Both variants in the fixed order observations and plans iterate them.
pub const VARIANTS: [AgentVariant; 2] = [AgentVariant::V1, AgentVariant::V2];

impl AgentVariant {
    /// The variant this one replaces (or is replaced by).
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::V1 => Self::V2,
            Self::V2 => Self::V1,
        }
    }

    /// Executable file name on the current platform.
    #[must_use]
    pub fn executable_name(self) -> &'static str {
        match (self, cfg!(windows)) {
            (Self::V1, false) => "sentineld",
            (Self::V1, true) => "sentineld.exe",
            (Self::V2, false) => "sentinel2",
            (Self::V2, true) => "sentinel2.exe",
        }
    }

    /// Config file name. One per variant, even though both variants share
    /// the install directory.
    #[must_use]
    pub fn config_name(self) -> &'static str {
        match self {
            Self::V1 => "sentineld.conf",
            Self::V2 => "sentinel2.conf",
        }
    }

    /// Base name of the release package for this variant.
    #[must_use]
    pub fn package_base(self) -> &'static str {
        match self {
            Self::V1 => "sentinel_agent",
            Self::V2 => "sentinel_agent2",
        }
    }

    /// Service-manager name, optionally scoped to a fleet instance.
    ///
    /// systemd hosts use template-unit naming (`sentinel-agent@edge-01`);
    /// Windows service names take a dash suffix instead.
    #[must_use]
    pub fn service_name(self, instance: Option<&str>) -> String {
        let base = match self {
            Self::V1 => "sentinel-agent",
            Self::V2 => "sentinel-agent2",
        };
        match instance {
            Some(inst) if cfg!(windows) => format!("{base}-{inst}"),
            Some(inst) => format!("{base}@{inst}"),
            None => base.to_string(),
        }
    }

    /// Display name the agent registers under. Observation only counts a
    /// service entry as ours when this matches exactly.
    #[must_use]
    pub fn display_name(self, instance: Option<&str>) -> String {
        let base = match self {
            Self::V1 => "Sentinel Agent",
            Self::V2 => "Sentinel Agent 2",
        };
        match instance {
            Some(inst) => format!("{base} ({inst})"),
            None => base.to_string(),
        }
    }

    /// Short label used in config files, CLI flags, and JSON output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl fmt::Display for AgentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgentVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(ConfigError::UnknownVariant {
                value: other.to_string(),
            }),
        }
    }
}

// ── Release naming ────────────────────────────────────────────────────────────

/// Map the host OS and architecture to the vendor's release naming.
///
/// # Errors
///
/// Returns an error when the vendor publishes no package for this platform.
pub fn release_platform() -> Result<(&'static str, &'static str)> {
    let os = match std::env::consts::OS {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "windows",
        other => bail!("No Sentinel agent packages are published for OS: {other}"),
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => bail!("No Sentinel agent packages are published for architecture: {other}"),
    };
    Ok((os, arch))
}

/// Package file name for a variant and version on the current platform,
/// e.g. `sentinel_agent2-7.0.1-linux-amd64.tar.gz`.
///
/// # Errors
///
/// Returns an error when the platform has no published packages.
pub fn package_name(variant: AgentVariant, version: &Version) -> Result<String> {
    let (os, arch) = release_platform()?;
    Ok(format!(
        "{}-{}-{}-{}.tar.gz",
        variant.package_base(),
        version,
        os,
        arch
    ))
}

/// Download URL under the vendor layout `<base>/<major.minor>/<version>/<package>`.
///
/// # Errors
///
/// Returns an error when the platform has no published packages.
pub fn package_url(base_url: &str, variant: AgentVariant, version: &Version) -> Result<String> {
    let name = package_name(variant, version)?;
    Ok(format!(
        "{}/{}.{}/{}/{}",
        base_url.trim_end_matches('/'),
        version.major,
        version.minor,
        version,
        name
    ))
}

/// URL of the SHA-256 sidecar published next to every package.
#[must_use]
pub fn checksum_url(package_url: &str) -> String {
    format!("{package_url}.sha256")
}

/// URL of the vendor's latest-release manifest.
#[must_use]
pub fn latest_manifest_url(base_url: &str) -> String {
    format!("{}/latest.json", base_url.trim_end_matches('/'))
}

// Compile-time constant pattern — cannot fail to compile.
#[allow(clippy::expect_used)]
static VERSION_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)\b").expect("valid regex")
});

/// Extract the product version from an agent `-V` banner.
///
/// Both generations print a first line such as
/// `sentineld (Sentinel Agent) 7.0.1` or
/// `sentinel2 (Sentinel Agent 2) 7.0.1 (revision 4f2c91a)`; the first
/// semver token on the first line is the product version.
#[must_use]
pub fn parse_version_banner(output: &str) -> Option<Version> {
    let first_line = output.lines().next()?;
    let token = VERSION_TOKEN_RE.captures(first_line)?.get(1)?.as_str();
    Version::parse(token).ok()
}
