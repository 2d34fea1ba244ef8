//! Version sets and compatibility matching.
//!
//! A [`VersionSet`] holds the installable major versions of one component,
//! ascending. [`highest_common`] walks the preferred set from newest to
//! oldest and binary-searches each candidate in the other set.

use crate::error::NoCompatibleVersion;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Ascending list of integer major versions.
///
/// Values come from the package index, which lists each package once.
/// Duplicates are not removed; they would only indicate a broken index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionSet(Vec<u32>);

impl VersionSet {
    /// Build a set from arbitrary values, sorting them ascending.
    pub fn new(mut versions: Vec<u32>) -> Self {
        versions.sort_unstable();
        Self(versions)
    }

    /// Versions from package names of the exact form `<prefix><digits>`.
    ///
    /// `gcc-12` yields 12 for prefix `gcc-`; `gcc-12-base` and `gcc-doc`
    /// are ignored.
    pub fn from_package_names<I, S>(names: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let versions = names
            .into_iter()
            .filter_map(|name| {
                let suffix = name.as_ref().strip_prefix(prefix)?;
                if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                suffix.parse().ok()
            })
            .collect();
        Self::new(versions)
    }

    /// The versions, ascending.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Highest version, if any.
    pub fn highest(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Number of versions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no versions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Binary-search membership.
    pub fn contains(&self, version: u32) -> bool {
        contains_sorted(&self.0, version)
    }
}

impl From<Vec<u32>> for VersionSet {
    fn from(versions: Vec<u32>) -> Self {
        Self::new(versions)
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Binary search over an ascending slice.
pub fn contains_sorted(haystack: &[u32], needle: u32) -> bool {
    let mut lo = 0;
    let mut hi = haystack.len();

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match haystack[mid].cmp(&needle) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return true,
        }
    }

    false
}

/// Greatest value of `preferred` that is also in `available`.
///
/// `preferred` is scanned from its highest element down; each candidate is
/// binary-searched in `available`. An empty input fails without probing.
pub fn highest_common(
    available: &VersionSet,
    preferred: &VersionSet,
) -> Result<u32, NoCompatibleVersion> {
    let no_match = || NoCompatibleVersion {
        set_a: available.0.clone(),
        set_b: preferred.0.clone(),
    };

    if available.is_empty() || preferred.is_empty() {
        return Err(no_match());
    }

    preferred
        .0
        .iter()
        .rev()
        .copied()
        .find(|&candidate| available.contains(candidate))
        .ok_or_else(no_match)
}
