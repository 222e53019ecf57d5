//! Agent executable inspection — implements `BinaryInspector`.

use std::path::Path;

use anyhow::Result;
use semver::Version;

use crate::application::ports::{BinaryInspector, CommandRunner};
use crate::domain::agent::parse_version_banner;
use crate::domain::error::ObservationError;

/// Reads the product version of an installed agent by invoking the
/// executable with `-V` and parsing its banner.
pub struct AgentBinaryInspector<R> {
    runner: R,
}

impl<R: CommandRunner> AgentBinaryInspector<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> BinaryInspector for AgentBinaryInspector<R> {
    async fn stat_version(&self, path: &Path) -> Result<Option<Version>> {
        if !path.is_file() {
            return Ok(None);
        }

        let program = path.to_string_lossy().into_owned();
        let output =
            self.runner
                .run(&program, &["-V"])
                .await
                .map_err(|e| ObservationError::Binary {
                    path: program.clone(),
                    reason: format!("{e:#}"),
                })?;

        if !output.status.success() {
            return Err(ObservationError::VersionUnreadable {
                path: program,
                reason: format!(
                    "'-V' exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        match parse_version_banner(&banner) {
            Some(version) => Ok(Some(version)),
            None => Err(ObservationError::VersionUnreadable {
                path: program,
                reason: format!(
                    "no version token in banner: {:?}",
                    banner.lines().next().unwrap_or_default()
                ),
            }
            .into()),
        }
    }
}
