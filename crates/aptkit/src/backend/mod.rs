//! Backend abstraction for APT operations.
//!
//! The [`Backend`] trait defines the interface for interacting with the
//! package manager, allowing for different implementations (real CLI, mock
//! for testing).
//!
//! # Testing
//!
//! Use [`MockBackend`] to exercise callers without touching the host:
//!
//! ```
//! use aptkit::backend::{Backend, Invocation, MockBackend};
//!
//! let mock = MockBackend::new();
//! mock.install(&["clang-18".to_string()]).unwrap();
//!
//! assert_eq!(
//!     mock.invocations(),
//!     vec![Invocation::Install(vec!["clang-18".to_string()])]
//! );
//! assert!(mock.list_selections().unwrap()[0].name == "clang-18");
//! ```

pub mod apt;

use crate::error::{Error, Result};
use crate::types::{PackageState, Selection};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Backend trait for APT operations.
///
/// Queries (`list_selections`, `available_packages`, `architecture`) never
/// change the host. Every other method is a mutation.
pub trait Backend: Send + Sync {
    /// Every package known to the dpkg database, in any state.
    fn list_selections(&self) -> Result<Vec<Selection>>;

    /// Package names in the configured repositories starting with `prefix`.
    fn available_packages(&self, prefix: &str) -> Result<Vec<String>>;

    /// The host's dpkg architecture (e.g. `amd64`).
    fn architecture(&self) -> Result<String>;

    /// Refresh the package index.
    fn update(&self) -> Result<()>;

    /// Install all `packages` in one transaction.
    fn install(&self, packages: &[String]) -> Result<()>;

    /// Purge all `packages` (binaries and configuration) in one transaction.
    fn purge(&self, packages: &[String]) -> Result<()>;

    /// Remove automatically installed dependencies nothing needs anymore.
    fn autoremove(&self) -> Result<()>;

    /// Drop obsolete downloaded archives.
    fn autoclean(&self) -> Result<()>;

    /// Install the build dependencies of a source package.
    fn build_dep(&self, package: &str) -> Result<()>;
}

/// Get the default backend (real apt-get CLI).
pub fn default_backend() -> apt::AptBackend {
    apt::AptBackend::new()
}

/// A mutating call recorded by [`MockBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `apt-get update`
    Update,
    /// `apt-get install` of the listed packages
    Install(Vec<String>),
    /// `apt-get purge` of the listed packages
    Purge(Vec<String>),
    /// `apt-get autoremove`
    Autoremove,
    /// `apt-get autoclean`
    Autoclean,
    /// `apt-get build-dep` of a source package
    BuildDep(String),
}

impl Invocation {
    /// The apt-get verb this invocation corresponds to
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Install(_) => "install",
            Self::Purge(_) => "purge",
            Self::Autoremove => "autoremove",
            Self::Autoclean => "autoclean",
            Self::BuildDep(_) => "build-dep",
        }
    }

    fn command_line(&self) -> String {
        match self {
            Self::Install(names) | Self::Purge(names) => {
                format!("apt-get {} -y {}", self.verb(), names.join(" "))
            }
            Self::BuildDep(name) => format!("apt-get build-dep -y {name}"),
            _ => format!("apt-get {} -y", self.verb()),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

#[derive(Debug, Default)]
struct MockState {
    selections: Vec<Selection>,
    available: BTreeSet<String>,
    unavailable: BTreeSet<String>,
    failures: HashMap<&'static str, (i32, String)>,
    invocations: Vec<Invocation>,
    architecture: Option<String>,
}

/// Mock backend for testing without touching the package database.
///
/// Installs and purges update the in-memory database, so repeated runs
/// observe the effect of earlier ones.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the package database.
    pub fn add_selection(&self, selection: Selection) {
        self.lock().selections.push(selection);
    }

    /// Make packages visible to `available_packages`.
    pub fn add_available<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().available.extend(names.into_iter().map(Into::into));
    }

    /// Make `install` of this package fail with "Unable to locate package".
    pub fn mark_unavailable(&self, name: impl Into<String>) {
        self.lock().unavailable.insert(name.into());
    }

    /// Make every invocation with this verb fail with the given diagnostic.
    pub fn fail_on(&self, verb: &'static str, exit_code: i32, stderr: impl Into<String>) {
        self.lock().failures.insert(verb, (exit_code, stderr.into()));
    }

    /// Set the reported architecture (defaults to `amd64`).
    pub fn set_architecture(&self, arch: impl Into<String>) {
        self.lock().architecture = Some(arch.into());
    }

    /// Every mutating call, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().invocations.clone()
    }

    /// Number of recorded calls with the given verb.
    pub fn count(&self, verb: &str) -> usize {
        self.lock()
            .invocations
            .iter()
            .filter(|i| i.verb() == verb)
            .count()
    }

    /// Whether a package is recorded as installed.
    pub fn is_installed(&self, name: &str) -> bool {
        self.lock()
            .selections
            .iter()
            .any(|s| s.name == name && s.state == PackageState::Installed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record the invocation and apply any configured failure.
    fn record(&self, invocation: Invocation) -> Result<()> {
        let mut state = self.lock();
        let command = invocation.command_line();
        let failure = state.failures.get(invocation.verb()).cloned();
        state.invocations.push(invocation);

        match failure {
            Some((code, stderr)) => Err(Error::from_apt_output(&command, Some(code), &stderr)),
            None => Ok(()),
        }
    }
}

impl Backend for MockBackend {
    fn list_selections(&self) -> Result<Vec<Selection>> {
        Ok(self.lock().selections.clone())
    }

    fn available_packages(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .available
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn architecture(&self) -> Result<String> {
        Ok(self
            .lock()
            .architecture
            .clone()
            .unwrap_or_else(|| "amd64".to_string()))
    }

    fn update(&self) -> Result<()> {
        self.record(Invocation::Update)
    }

    fn install(&self, packages: &[String]) -> Result<()> {
        self.record(Invocation::Install(packages.to_vec()))?;

        let mut state = self.lock();
        if let Some(missing) = packages.iter().find(|p| state.unavailable.contains(*p)) {
            return Err(Error::from_apt_output(
                &format!("apt-get install -y {}", packages.join(" ")),
                Some(100),
                &format!("E: Unable to locate package {missing}"),
            ));
        }

        for name in packages {
            state.selections.retain(|s| &s.name != name);
            state.selections.push(Selection::installed(name, "0"));
        }
        Ok(())
    }

    fn purge(&self, packages: &[String]) -> Result<()> {
        self.record(Invocation::Purge(packages.to_vec()))?;
        self.lock()
            .selections
            .retain(|s| !packages.contains(&s.name));
        Ok(())
    }

    fn autoremove(&self) -> Result<()> {
        self.record(Invocation::Autoremove)
    }

    fn autoclean(&self) -> Result<()> {
        self.record(Invocation::Autoclean)
    }

    fn build_dep(&self, package: &str) -> Result<()> {
        self.record(Invocation::BuildDep(package.to_string()))
    }
}
