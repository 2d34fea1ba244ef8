//! One-line repository registrations in the managed source list

use anyhow::{Context, Result};
use declarative::{ManagedResource, ResourceState, StepFailure};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::read_optional;

/// A repository as apt sees it: `type [options] uri suite components...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRegistration {
    pub kind: String,
    pub options: BTreeMap<String, String>,
    pub uri: String,
    pub suite: String,
    pub components: Vec<String>,
}

impl RepositoryRegistration {
    /// Render the source-list line
    pub fn line(&self) -> String {
        let mut parts = vec![self.kind.clone()];

        if !self.options.is_empty() {
            let options: Vec<String> = self
                .options
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            parts.push(format!("[{}]", options.join(" ")));
        }

        parts.push(self.uri.clone());
        parts.push(self.suite.clone());
        parts.extend(self.components.iter().cloned());
        parts.join(" ")
    }
}

/// A registration line inside a shared list file
#[derive(Debug, Clone)]
pub struct SourceEntry {
    line: String,
    path: PathBuf,
}

impl SourceEntry {
    pub fn new(registration: &RepositoryRegistration, path: impl Into<PathBuf>) -> Self {
        Self {
            line: registration.line(),
            path: path.into(),
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    fn matches(&self, candidate: &str) -> bool {
        candidate.trim() == self.line
    }
}

impl ManagedResource for SourceEntry {
    fn name(&self) -> &str {
        "repository entry"
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn observe(&self) -> Result<ResourceState> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(ResourceState::Absent);
        };

        if content.lines().any(|l| self.matches(l)) {
            Ok(ResourceState::Present {
                details: Some(self.line.clone()),
            })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn create(&self) -> Result<(), StepFailure> {
        let existing = read_optional(&self.path)?.unwrap_or_default();

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if !existing.is_empty() && !existing.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        writeln!(file, "{}", self.line)?;
        file.sync_all()?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let content = read_optional(&self.path)?.unwrap_or_default();

        let kept: Vec<&str> = content.lines().filter(|l| !self.matches(l)).collect();

        if kept.iter().all(|l| l.trim().is_empty()) {
            log::debug!("{} has no entries left, deleting it", self.path.display());
            return fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()));
        }

        let mut rewritten = kept.join("\n");
        rewritten.push('\n');
        fs::write(&self.path, rewritten)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Outcome, ensure_absent, ensure_present};
    use tempfile::TempDir;

    fn docker() -> RepositoryRegistration {
        RepositoryRegistration {
            kind: "deb".to_string(),
            options: BTreeMap::from([
                ("arch".to_string(), "amd64".to_string()),
                (
                    "signed-by".to_string(),
                    "/etc/apt/keyrings/docker.asc".to_string(),
                ),
            ]),
            uri: "https://download.docker.com/linux/ubuntu".to_string(),
            suite: "jammy".to_string(),
            components: vec!["stable".to_string()],
        }
    }

    fn hash(path: &Path) -> Option<blake3::Hash> {
        fs::read(path).ok().map(|bytes| blake3::hash(&bytes))
    }

    #[test]
    fn test_line_rendering() {
        assert_eq!(
            docker().line(),
            "deb [arch=amd64 signed-by=/etc/apt/keyrings/docker.asc] \
             https://download.docker.com/linux/ubuntu jammy stable"
        );

        let bare = RepositoryRegistration {
            options: BTreeMap::new(),
            ..docker()
        };
        assert_eq!(
            bare.line(),
            "deb https://download.docker.com/linux/ubuntu jammy stable"
        );
    }

    #[test]
    fn test_ensure_present_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("debrig.list");
        let entry = SourceEntry::new(&docker(), &path);

        assert_eq!(ensure_present(&entry).unwrap(), Outcome::Created);
        let before = hash(&path);

        assert_eq!(ensure_present(&entry).unwrap(), Outcome::Unchanged);
        assert_eq!(hash(&path), before);
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{}\n", entry.line()));
    }

    #[test]
    fn test_whitespace_around_existing_line_still_matches() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("debrig.list");
        let entry = SourceEntry::new(&docker(), &path);
        fs::write(&path, format!("  {}  \n", entry.line())).unwrap();

        assert_eq!(ensure_present(&entry).unwrap(), Outcome::Unchanged);
    }

    #[test]
    fn test_append_adds_missing_newline() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("debrig.list");
        fs::write(&path, "deb http://apt.llvm.org/jammy/ llvm-toolchain-jammy-18 main").unwrap();

        let entry = SourceEntry::new(&docker(), &path);
        ensure_present(&entry).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with("stable\n"));
    }

    #[test]
    fn test_remove_keeps_other_registrations() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("debrig.list");
        let other = "deb http://apt.llvm.org/jammy/ llvm-toolchain-jammy-18 main";
        fs::write(&path, format!("{other}\n")).unwrap();

        let entry = SourceEntry::new(&docker(), &path);
        ensure_present(&entry).unwrap();
        assert_eq!(ensure_absent(&entry).unwrap(), Outcome::Removed);

        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{other}\n"));

        let before = hash(&path);
        assert_eq!(ensure_absent(&entry).unwrap(), Outcome::Unchanged);
        assert_eq!(hash(&path), before);
    }

    #[test]
    fn test_remove_last_entry_deletes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("debrig.list");
        let entry = SourceEntry::new(&docker(), &path);

        ensure_present(&entry).unwrap();
        ensure_absent(&entry).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_absent() {
        let temp = TempDir::new().unwrap();
        let entry = SourceEntry::new(&docker(), temp.path().join("none.list"));
        assert!(entry.observe().unwrap().is_absent());
        assert_eq!(ensure_absent(&entry).unwrap(), Outcome::Unchanged);
    }
}
