//! Core types for the dpkg package database.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Installation state of a package as reported by `${db:Status-Status}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageState {
    /// Fully installed and configured
    Installed,
    /// Removed, configuration files remain
    ConfigFiles,
    /// Unpacked but not configured
    Unpacked,
    /// Configuration started but did not finish
    HalfConfigured,
    /// Installation started but did not finish
    HalfInstalled,
    /// Waiting on another package's trigger processing
    TriggersAwaited,
    /// Trigger processing pending
    TriggersPending,
    /// Known to dpkg but not installed
    NotInstalled,
}

impl PackageState {
    /// Parse the dpkg status word.
    pub fn from_status(s: &str) -> Option<Self> {
        match s.trim() {
            "installed" => Some(Self::Installed),
            "config-files" => Some(Self::ConfigFiles),
            "unpacked" => Some(Self::Unpacked),
            "half-configured" => Some(Self::HalfConfigured),
            "half-installed" => Some(Self::HalfInstalled),
            "triggers-awaited" => Some(Self::TriggersAwaited),
            "triggers-pending" => Some(Self::TriggersPending),
            "not-installed" => Some(Self::NotInstalled),
            _ => None,
        }
    }

    /// Whether anything of the package is left on disk (a purge would do work).
    pub fn leaves_traces(&self) -> bool {
        !matches!(self, Self::NotInstalled)
    }

    /// The dpkg status word.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::ConfigFiles => "config-files",
            Self::Unpacked => "unpacked",
            Self::HalfConfigured => "half-configured",
            Self::HalfInstalled => "half-installed",
            Self::TriggersAwaited => "triggers-awaited",
            Self::TriggersPending => "triggers-pending",
            Self::NotInstalled => "not-installed",
        }
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of the package database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Package name without architecture qualifier
    pub name: String,
    /// Installed (or last known) version, empty when never installed
    pub version: String,
    /// Installation state
    pub state: PackageState,
}

impl Selection {
    /// Create a record.
    pub fn new(name: impl Into<String>, version: impl Into<String>, state: PackageState) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            state,
        }
    }

    /// Shorthand for an installed package.
    pub fn installed(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, PackageState::Installed)
    }
}

/// Format string handed to `dpkg-query --show --showformat`.
pub const SELECTION_FORMAT: &str = "${Package}\\t${Version}\\t${db:Status-Status}\\n";

/// Parse `dpkg-query` output produced with [`SELECTION_FORMAT`].
pub fn parse_selections(output: &str) -> Result<Vec<Selection>> {
    let mut selections = Vec::new();

    for (idx, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let (Some(name), Some(version), Some(status)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::Parse {
                line: idx + 1,
                content: line.to_string(),
            });
        };

        let state = PackageState::from_status(status).ok_or_else(|| Error::Parse {
            line: idx + 1,
            content: line.to_string(),
        })?;

        selections.push(Selection::new(name.trim(), version.trim(), state));
    }

    Ok(selections)
}

/// Names of packages that still leave traces on disk and match any pattern.
///
/// The result is sorted and free of duplicates (multi-arch packages appear
/// once per architecture in the database).
pub fn matching_names(selections: &[Selection], patterns: &[Regex]) -> Vec<String> {
    let mut names: Vec<String> = selections
        .iter()
        .filter(|s| s.state.leaves_traces())
        .filter(|s| patterns.iter().any(|p| p.is_match(&s.name)))
        .map(|s| s.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}
