//! Directory trees: unpacked sources and installation prefixes

use anyhow::{Context, Result};
use declarative::{ManagedResource, ResourceState, StepFailure};
use std::fs;
use std::path::{Path, PathBuf};
use toolchain::Transport;
use toolchain::archive::extract_targz;

/// A directory that is only ever removed as a whole
///
/// An owned tree carries a marker file written when debrig created it. A
/// directory without the marker is reported absent, so removal never touches
/// a directory debrig did not install.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    name: String,
    path: PathBuf,
    marker: Option<Marker>,
}

#[derive(Debug, Clone)]
struct Marker {
    file: PathBuf,
    stamp: String,
}

impl DirectoryTree {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            marker: None,
        }
    }

    /// A tree that is only present while `marker` exists inside it
    pub fn owned(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        marker: &str,
        stamp: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            marker: Some(Marker {
                file: path.join(marker),
                stamp: stamp.into(),
            }),
            path,
        }
    }

    /// The directory exists but lacks the ownership marker
    pub fn is_foreign(&self) -> bool {
        self.path.is_dir() && self.marker.as_ref().is_some_and(|m| !m.file.is_file())
    }
}

impl ManagedResource for DirectoryTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn observe(&self) -> Result<ResourceState> {
        if !self.path.is_dir() {
            return Ok(ResourceState::Absent);
        }
        Ok(match &self.marker {
            Some(marker) if !marker.file.is_file() => {
                log::debug!("{} has no {}", self.path.display(), marker.file.display());
                ResourceState::Absent
            }
            Some(marker) => ResourceState::Present {
                details: fs::read_to_string(&marker.file)
                    .ok()
                    .map(|stamp| stamp.trim().to_string()),
            },
            None => ResourceState::present(),
        })
    }

    fn create(&self) -> Result<(), StepFailure> {
        let created = super::create_dir_tracked(&self.path)?;
        if let Some(marker) = &self.marker {
            fs::write(&marker.file, format!("{}\n", marker.stamp))
                .map_err(|e| super::unwind_created(created, e.into()))?;
        }
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        fs::remove_dir_all(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))
    }
}

/// An unpacked source archive
///
/// Present once `dir` holds a tree with a `configure` script, either at its
/// top or one level down (the archive's own root directory).
pub struct SourceTree<'a> {
    url: String,
    dir: PathBuf,
    transport: &'a dyn Transport,
}

impl std::fmt::Debug for SourceTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTree")
            .field("url", &self.url)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl<'a> SourceTree<'a> {
    pub fn new(url: impl Into<String>, dir: impl Into<PathBuf>, transport: &'a dyn Transport) -> Self {
        Self {
            url: url.into(),
            dir: dir.into(),
            transport,
        }
    }

    /// Directory containing `configure`, if the tree is unpacked
    pub fn source_dir(&self) -> Option<PathBuf> {
        find_configure(&self.dir)
    }

    /// Unpack into a staging directory next to `dir`, then swap it in
    ///
    /// A leftover `dir` without a configure script is replaced; it is only
    /// deleted once the new tree is in place.
    fn unpack(&self, bytes: &[u8], parent: &Path) -> Result<(), StepFailure> {
        let staging = tempfile::Builder::new()
            .prefix(".unpack-")
            .tempdir_in(parent)?;
        let tree = staging.path().join("tree");

        let extracted = extract_targz(bytes, &tree).map_err(|e| StepFailure::new(e.to_string()))?;
        log::debug!("Unpacked {} entries from {}", extracted.len(), self.url);

        if find_configure(&tree).is_none() {
            return Err(StepFailure::new(format!(
                "{} does not contain a configure script",
                self.url
            )));
        }

        let previous = staging.path().join("previous");
        let replacing = self.dir.exists();
        if replacing {
            log::debug!("Replacing incomplete tree at {}", self.dir.display());
            fs::rename(&self.dir, &previous)?;
        }
        if let Err(e) = fs::rename(&tree, &self.dir) {
            if replacing {
                fs::rename(&previous, &self.dir)?;
            }
            return Err(e.into());
        }

        staging.close()?;
        Ok(())
    }
}

fn find_configure(dir: &Path) -> Option<PathBuf> {
    if dir.join("configure").is_file() {
        return Some(dir.to_path_buf());
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.join("configure").is_file())
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

impl ManagedResource for SourceTree<'_> {
    fn name(&self) -> &str {
        "source tree"
    }

    fn location(&self) -> &Path {
        &self.dir
    }

    fn observe(&self) -> Result<ResourceState> {
        Ok(match self.source_dir() {
            Some(dir) => ResourceState::Present {
                details: Some(dir.display().to_string()),
            },
            None => ResourceState::Absent,
        })
    }

    fn create(&self) -> Result<(), StepFailure> {
        let bytes = self.transport.fetch(&self.url).map_err(|e| {
            StepFailure::new(e.to_string()).with_exit_code(e.exit_code)
        })?;

        let parent = self
            .dir
            .parent()
            .with_context(|| format!("{} has no parent directory", self.dir.display()))?;
        let created = super::create_dir_tracked(parent)?;

        self.unpack(&bytes, parent)
            .map_err(|failure| super::unwind_created(created, failure))
    }

    fn remove(&self) -> Result<()> {
        fs::remove_dir_all(&self.dir)
            .with_context(|| format!("Failed to remove {}", self.dir.display()))
    }
}
