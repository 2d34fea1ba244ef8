//! Things debrig can install and purge
//!
//! A [`Target`] knows which resources and packages make up one provisioned
//! component. The orchestrator decides which of its phases run.

pub mod interpreter;
pub mod repository;

pub use interpreter::InterpreterTarget;
pub use repository::RepositoryTarget;

use aptkit::Backend;
use regex::Regex;
use toolchain::{BuildDriver, Transport};

use crate::distro::DistroIdentity;
use crate::engine::report::PhaseReport;
use crate::error::Result;
use crate::schema::PathsConfig;

/// Collaborators every target works through
pub struct Environment<'a> {
    pub apt: &'a dyn Backend,
    pub transport: &'a dyn Transport,
    pub build: &'a dyn BuildDriver,
    pub distro: &'a DistroIdentity,
    pub paths: &'a PathsConfig,
}

impl std::fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("distro", self.distro)
            .field("paths", self.paths)
            .finish_non_exhaustive()
    }
}

/// A provisioned component
pub trait Target {
    /// Display name (e.g. `repository llvm`)
    fn name(&self) -> String;

    /// Executables that must be on PATH before anything runs
    fn required_tools(&self) -> Vec<&'static str>;

    /// Remove everything this target owns
    fn purge(&self, env: &Environment<'_>) -> Result<PhaseReport>;

    /// Bring this target to its installed state
    fn install(&self, env: &Environment<'_>) -> Result<PhaseReport>;
}

/// Tools every target drives
pub const APT_TOOLS: &[&str] = &["apt-get", "apt-cache", "dpkg", "dpkg-query"];

/// Purge every installed package matching `patterns`, then tidy up.
///
/// Nothing matching is not an error: no purge command runs at all.
pub(crate) fn purge_matching(
    env: &Environment<'_>,
    patterns: &[Regex],
    report: &mut PhaseReport,
) -> Result<()> {
    if patterns.is_empty() {
        return Ok(());
    }

    let selections = env.apt.list_selections()?;
    let names = aptkit::matching_names(&selections, patterns);

    if names.is_empty() {
        log::info!("No installed packages match the purge patterns");
        return Ok(());
    }

    log::info!("Purging {} package(s): {}", names.len(), names.join(" "));
    env.apt.purge(&names)?;
    env.apt.autoremove()?;
    env.apt.autoclean()?;

    report.purged = names;
    Ok(())
}
