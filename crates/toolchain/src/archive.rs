//! Source archive extraction.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Unpack a `.tar.gz` archive into `dest`.
///
/// Returns the path of every extracted entry, in archive order. Entries that
/// would land outside `dest` are skipped.
pub fn extract_targz(data: &[u8], dest: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;

    let decoder = GzDecoder::new(data);
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .map_err(|e| Error::ExtractionFailed(e.to_string()))?;

    let mut extracted = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::ExtractionFailed(e.to_string()))?;
        let relative = entry
            .path()
            .map_err(|e| Error::ExtractionFailed(e.to_string()))?
            .into_owned();

        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| Error::ExtractionFailed(format!("{}: {e}", relative.display())))?;

        if unpacked {
            extracted.push(dest.join(&relative));
        } else {
            log::warn!("skipping archive entry outside target: {}", relative.display());
        }
    }

    log::debug!("extracted {} entries into {}", extracted.len(), dest.display());
    Ok(extracted)
}
