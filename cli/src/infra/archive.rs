//! Archive extraction infrastructure — implements `ArchiveExtractor`.

use std::path::{Component, Path};

use anyhow::{Context, Result};

use crate::application::ports::ArchiveExtractor;
use crate::domain::error::ExtractionError;

/// Unpacks `.tar.gz` release packages.
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
            .await
            .context("spawn_blocking for extraction")?
    }
}

fn extract_blocking(archive: &Path, dest: &Path) -> Result<()> {
    // Unpack into an empty directory; entries from a previously staged
    // package must not survive into this one.
    if dest.exists() {
        std::fs::remove_dir_all(dest).with_context(|| format!("clearing {}", dest.display()))?;
    }
    std::fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;

    let file =
        std::fs::File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
    let entries = tar
        .entries()
        .with_context(|| format!("reading {}", archive.display()))?;
    for entry in entries {
        let mut entry = entry.with_context(|| format!("reading {}", archive.display()))?;
        let path = entry
            .path()
            .context("reading archive entry path")?
            .into_owned();
        if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ExtractionError::PathTraversal {
                entry: path.display().to_string(),
            }
            .into());
        }
        entry
            .unpack_in(dest)
            .with_context(|| format!("unpacking {}", path.display()))?;
    }
    Ok(())
}
