//! Resource trait for idempotent reconciliation
//!
//! A ManagedResource is an external, file-backed artifact that can be
//! observed, created and removed. The reconciler never assumes prior
//! state: it observes, compares, and mutates at most once.

use crate::error::StepFailure;
use crate::types::ResourceState;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Core trait for reconciled resources
///
/// # Example
///
/// ```ignore
/// use declarative::{ManagedResource, ResourceState, StepFailure};
///
/// #[derive(Debug)]
/// struct MarkerFile { path: PathBuf }
///
/// impl ManagedResource for MarkerFile {
///     fn name(&self) -> &str { "marker" }
///     fn location(&self) -> &Path { &self.path }
///
///     fn observe(&self) -> anyhow::Result<ResourceState> {
///         Ok(if self.path.exists() { ResourceState::present() } else { ResourceState::Absent })
///     }
///
///     fn create(&self) -> Result<(), StepFailure> {
///         std::fs::write(&self.path, b"")?;
///         Ok(())
///     }
///
///     fn remove(&self) -> anyhow::Result<()> {
///         std::fs::remove_file(&self.path)?;
///         Ok(())
///     }
/// }
/// ```
pub trait ManagedResource {
    /// Human-readable name (e.g. "signing key", "repository entry")
    fn name(&self) -> &str;

    /// Filesystem location backing this resource
    ///
    /// The reconciler checkpoints this path before a creating action so a
    /// failure can be unwound to the exact state observed at entry.
    fn location(&self) -> &Path;

    /// Read the current state from the system
    fn observe(&self) -> Result<ResourceState>;

    /// Perform the creating action
    ///
    /// Only called when `observe` reported the resource absent.
    fn create(&self) -> std::result::Result<(), StepFailure>;

    /// Perform the removing action
    ///
    /// Only called when `observe` reported the resource present.
    fn remove(&self) -> Result<()>;

    /// Capture the backing location before mutation
    fn checkpoint(&self) -> Result<Checkpoint> {
        Checkpoint::capture(self.location())
    }
}

/// Snapshot of a filesystem location, restorable byte-for-byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkpoint {
    /// Nothing existed at the path
    Missing(PathBuf),
    /// A regular file with these contents existed
    File { path: PathBuf, contents: Vec<u8> },
    /// A directory existed (creating actions never modify existing directories)
    Directory(PathBuf),
}

impl Checkpoint {
    /// Snapshot whatever currently lives at `path`
    pub fn capture(path: &Path) -> Result<Self> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::Missing(path.to_path_buf()));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
            }
        };

        if metadata.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }

        let contents =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::File {
            path: path.to_path_buf(),
            contents,
        })
    }

    /// Put the location back exactly as it was captured
    pub fn restore(&self) -> Result<()> {
        match self {
            Self::Missing(path) => match fs::symlink_metadata(path) {
                Ok(m) if m.is_dir() => fs::remove_dir_all(path)
                    .with_context(|| format!("Failed to remove {}", path.display())),
                Ok(_) => fs::remove_file(path)
                    .with_context(|| format!("Failed to remove {}", path.display())),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
            },
            Self::File { path, contents } => fs::write(path, contents)
                .with_context(|| format!("Failed to restore {}", path.display())),
            Self::Directory(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checkpoint_missing_restore_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.asc");

        let checkpoint = Checkpoint::capture(&path).unwrap();
        assert_eq!(checkpoint, Checkpoint::Missing(path.clone()));

        fs::write(&path, b"half written").unwrap();
        checkpoint.restore().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_checkpoint_missing_restore_removes_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefix");

        let checkpoint = Checkpoint::capture(&path).unwrap();
        fs::create_dir_all(path.join("bin")).unwrap();
        checkpoint.restore().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_checkpoint_file_restore_rewrites_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debrig.list");
        fs::write(&path, b"deb http://a b c\n").unwrap();

        let checkpoint = Checkpoint::capture(&path).unwrap();
        fs::write(&path, b"deb http://a b c\ndeb http://x y z").unwrap();
        checkpoint.restore().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"deb http://a b c\n");
    }

    #[test]
    fn test_checkpoint_missing_restore_is_noop_when_still_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never-created");
        let checkpoint = Checkpoint::capture(&path).unwrap();
        checkpoint.restore().unwrap();
        assert!(!path.exists());
    }
}
