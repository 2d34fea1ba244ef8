//! Temporary `deb-src` access in the primary source list
//!
//! Only the one-line format is understood. The toggle is keyed on the first
//! active `deb` line whose suite is the release codename; the matching
//! `deb-src` line has the same options, URI, suite and components.

use anyhow::{Context, Result, bail};
use declarative::{ToggleResource, ToggleState};
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed one-line source entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceLine {
    kind: String,
    options: Option<String>,
    uri: String,
    suite: String,
    components: Vec<String>,
}

impl SourceLine {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (kind, rest) = line.split_once(char::is_whitespace)?;
        let rest = rest.trim_start();

        let (options, rest) = if let Some(inner) = rest.strip_prefix('[') {
            let (options, rest) = inner.split_once(']')?;
            (Some(options.trim().to_string()), rest)
        } else {
            (None, rest)
        };

        let mut fields = rest.split_whitespace();
        let uri = fields.next()?.to_string();
        let suite = fields.next()?.to_string();
        let components = fields.map(ToString::to_string).collect();

        Some(Self {
            kind: kind.to_string(),
            options,
            uri,
            suite,
            components,
        })
    }

    fn render(&self) -> String {
        let mut parts = vec![self.kind.clone()];
        if let Some(options) = &self.options {
            parts.push(format!("[{options}]"));
        }
        parts.push(self.uri.clone());
        parts.push(self.suite.clone());
        parts.extend(self.components.iter().cloned());
        parts.join(" ")
    }

    fn same_repository(&self, other: &Self) -> bool {
        self.uri == other.uri && self.suite == other.suite
    }
}

/// Text of a commented-out line, if it is one
fn uncommented(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix('#').map(str::trim_start)
}

/// Where the toggle stands in the current file
#[derive(Debug)]
struct Scan {
    /// Index of the keyed `deb` line
    deb_index: usize,
    /// The `deb-src` line that should exist while enabled
    wanted: SourceLine,
    /// Index of an active matching `deb-src` line
    active: Option<usize>,
    /// Index of a commented matching `deb-src` line
    commented: Option<usize>,
}

/// The source-package repository for one release codename
#[derive(Debug, Clone)]
pub struct SourcePackages {
    path: PathBuf,
    codename: String,
}

impl SourcePackages {
    pub fn new(path: impl Into<PathBuf>, codename: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            codename: codename.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scan(&self, content: &str) -> Result<Scan> {
        let lines: Vec<&str> = content.lines().collect();

        let Some((deb_index, deb)) = lines.iter().enumerate().find_map(|(i, l)| {
            SourceLine::parse(l)
                .filter(|s| s.kind == "deb" && s.suite == self.codename)
                .map(|s| (i, s))
        }) else {
            bail!(
                "{} has no active `deb ... {} ...` line (deb822 .sources files are not supported)",
                self.path.display(),
                self.codename
            );
        };

        let wanted = SourceLine {
            kind: "deb-src".to_string(),
            ..deb
        };

        let matches = |line: &str| {
            SourceLine::parse(line)
                .is_some_and(|s| s.kind == "deb-src" && s.same_repository(&wanted))
        };

        let active = lines
            .iter()
            .position(|l| !l.trim_start().starts_with('#') && matches(l));
        let commented = lines
            .iter()
            .position(|l| uncommented(l).is_some_and(matches));

        Ok(Scan {
            deb_index,
            wanted,
            active,
            commented,
        })
    }

    fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).with_context(|| format!("Failed to read {}", self.path.display()))
    }
}

impl ToggleResource for SourcePackages {
    /// The file exactly as it was before enabling
    type Undo = Vec<u8>;

    fn name(&self) -> &str {
        "source-package repository"
    }

    fn observe(&self) -> Result<ToggleState> {
        let bytes = self.read()?;
        let scan = self.scan(&String::from_utf8_lossy(&bytes))?;

        Ok(match (scan.active, scan.commented) {
            (Some(_), _) => ToggleState::Enabled,
            (None, Some(_)) => ToggleState::Disabled,
            (None, None) => ToggleState::Missing,
        })
    }

    fn enable(&self, from: ToggleState) -> Result<Vec<u8>> {
        let original = self.read()?;
        let content = String::from_utf8_lossy(&original).into_owned();
        let scan = self.scan(&content)?;

        let mut lines: Vec<String> = content.lines().map(ToString::to_string).collect();

        match (from, scan.commented) {
            (ToggleState::Disabled, Some(index)) => {
                let text = uncommented(&lines[index]).unwrap_or_default().to_string();
                log::debug!("Uncommenting line {} of {}", index + 1, self.path.display());
                lines[index] = text;
            }
            (ToggleState::Missing, _) => {
                log::debug!("Inserting `{}` into {}", scan.wanted.render(), self.path.display());
                lines.insert(scan.deb_index + 1, scan.wanted.render());
            }
            (state, _) => bail!("cannot enable {} from state {state}", self.name()),
        }

        let mut rewritten = lines.join("\n");
        rewritten.push('\n');
        fs::write(&self.path, rewritten)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        Ok(original)
    }

    fn restore(&self, undo: Vec<u8>) -> Result<()> {
        fs::write(&self.path, undo)
            .with_context(|| format!("Failed to restore {}", self.path.display()))
    }
}
