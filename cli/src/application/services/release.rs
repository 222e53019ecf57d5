//! Application service — release check use-case.
//!
//! Compares the latest published agent version against the pin and the
//! installed version. Imports only from `crate::domain` and
//! `crate::application::ports`.

use anyhow::Result;
use semver::Version;

use crate::application::ports::ReleaseResolver;

/// How the host relates to the latest published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCheck {
    pub latest: Version,
    /// Version pinned in config or flags, if any.
    pub pinned: Option<Version>,
    /// Version of the installed target binary, if any.
    pub installed: Option<Version>,
}

impl ReleaseCheck {
    /// True when converging would move to a newer version: the pin — or,
    /// unpinned, the installed version — is behind the latest release. A
    /// host with nothing installed and no pin always counts.
    #[must_use]
    pub fn update_available(&self) -> bool {
        match (&self.pinned, &self.installed) {
            (Some(pinned), _) => *pinned < self.latest,
            (None, Some(installed)) => *installed < self.latest,
            (None, None) => true,
        }
    }
}

/// Resolve the latest release and relate it to this host.
///
/// # Errors
///
/// Returns an error when the release manifest cannot be fetched or parsed.
pub async fn check_release(
    resolver: &impl ReleaseResolver,
    pinned: Option<Version>,
    installed: Option<Version>,
) -> Result<ReleaseCheck> {
    let latest = resolver.latest_version().await?;
    Ok(ReleaseCheck {
        latest,
        pinned,
        installed,
    })
}
