//! Host artifacts debrig reconciles
//!
//! Each type here implements [`declarative::ManagedResource`] or
//! [`declarative::ToggleResource`]:
//! - [`SigningKey`]: a repository key file in the keyring directory
//! - [`SourceEntry`]: one registration line in the managed source list
//! - [`SourcePackages`]: the `deb-src` line toggled around `build-dep`
//! - [`SourceTree`], [`DirectoryTree`]: unpacked sources and installation prefixes

pub mod signing_key;
pub mod source_entry;
pub mod source_toggle;
pub mod trees;

pub use signing_key::SigningKey;
pub use source_entry::{RepositoryRegistration, SourceEntry};
pub use source_toggle::SourcePackages;
pub use trees::{DirectoryTree, SourceTree};

use anyhow::{Context, Result};
use declarative::StepFailure;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a text file, treating a missing file as `None`
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Create `dir` and its missing ancestors, returning the topmost one created
pub(crate) fn create_dir_tracked(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let topmost = dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .last()
        .map(Path::to_path_buf);

    fs::create_dir_all(dir)?;
    Ok(topmost)
}

/// Remove what [`create_dir_tracked`] created after `failure`
///
/// A cleanup error is appended to the failure message.
pub(crate) fn unwind_created(created: Option<PathBuf>, mut failure: StepFailure) -> StepFailure {
    if let Some(dir) = created
        && let Err(e) = fs::remove_dir_all(&dir)
    {
        failure.message = format!(
            "{} (could not remove {}: {e})",
            failure.message,
            dir.display()
        );
    }
    failure
}
