//! Filesystem layout of a managed install root.
//!
//! Pure path derivation. All I/O against these paths happens in `crate::infra`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use semver::Version;

use crate::domain::agent::{AgentVariant, package_name};

/// Layout of one Sentinel install root.
///
/// Both agent variants share a single root:
///
/// ```text
/// <root>/
///   bin/                       agent executables
///   conf/                      per-variant config files
///   staging/                   scratch dir packages unpack into
///   sentinel_agent*-<v>.tar.gz cached release archives
/// ```
///
/// A fleet `instance` scopes the expected service and display names so that
/// several roots can coexist on one box; it never changes any path.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
    instance: Option<String>,
}

impl InstallLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            instance: None,
        }
    }

    #[must_use]
    pub fn with_instance(root: impl Into<PathBuf>, instance: Option<String>) -> Self {
        Self {
            root: root.into(),
            instance,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    #[must_use]
    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("conf")
    }

    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    #[must_use]
    pub fn executable(&self, variant: AgentVariant) -> PathBuf {
        self.bin_dir().join(variant.executable_name())
    }

    #[must_use]
    pub fn config_file(&self, variant: AgentVariant) -> PathBuf {
        self.conf_dir().join(variant.config_name())
    }

    /// Where the release archive for `variant`/`version` is cached.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform has no published packages.
    pub fn package_path(&self, variant: AgentVariant, version: &Version) -> Result<PathBuf> {
        Ok(self.root.join(package_name(variant, version)?))
    }

    /// Service-manager name expected for `variant` on this root.
    #[must_use]
    pub fn service_name(&self, variant: AgentVariant) -> String {
        variant.service_name(self.instance.as_deref())
    }

    /// Display name a service entry must carry to count as ours.
    #[must_use]
    pub fn expected_display_name(&self, variant: AgentVariant) -> String {
        variant.display_name(self.instance.as_deref())
    }
}

/// Default install root for the current platform.
#[must_use]
pub fn default_install_root() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files\Sentinel")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/usr/local/sentinel")
    } else {
        PathBuf::from("/opt/sentinel")
    }
}
