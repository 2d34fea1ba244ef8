//! Python built from source with a compatible compiler

use anyhow::Context;
use declarative::{Outcome, Phase, ensure_absent, ensure_present, with_toggle};
use std::path::PathBuf;
use toolchain::{BuildRecipe, Compiler, VersionSet, highest_common};

use super::{APT_TOOLS, Environment, Target, purge_matching};
use crate::engine::report::PhaseReport;
use crate::error::{ProvisionError, Result};
use crate::resource::{DirectoryTree, SourcePackages, SourceTree};
use crate::schema::PythonConfig;

/// Written into the prefix once debrig has installed an interpreter there
const PREFIX_MARKER: &str = ".debrig-python";

/// One interpreter release
#[derive(Debug, Clone)]
pub struct InterpreterTarget {
    config: PythonConfig,
}

/// Release-specific locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub source_url: String,
    pub prefix: PathBuf,
    pub source_root: PathBuf,
    /// Versioned executable `make altinstall` produces
    pub binary: PathBuf,
}

impl InterpreterTarget {
    pub fn new(config: PythonConfig) -> Self {
        Self { config }
    }

    pub fn layout(&self) -> Result<Layout> {
        let vars = self.config.vars()?;
        let series = vars.get("series").unwrap_or_default().to_string();
        let prefix = PathBuf::from(vars.expand(&self.config.prefix)?);

        Ok(Layout {
            source_url: vars.expand(&self.config.source_url)?,
            source_root: self
                .config
                .build_root
                .join(format!("python-{}", self.config.version)),
            binary: prefix.join("bin").join(format!("python{series}")),
            prefix,
        })
    }

    /// Pick the newest compiler both the index and this release support
    fn choose_compiler(&self, env: &Environment<'_>) -> Result<Compiler> {
        let prefix = &self.config.compiler_prefix;
        let available =
            VersionSet::from_package_names(env.apt.available_packages(prefix)?, prefix);
        let supported = VersionSet::new(self.config.compatible_compilers.clone());
        log::debug!("{prefix}<N> available {available}, supported {supported}");

        let major = highest_common(&available, &supported)?;
        Compiler::from_family(prefix, major)
            .with_context(|| format!("Unsupported compiler family {prefix}"))
            .map_err(ProvisionError::from)
    }

    fn owned_prefix(&self, layout: &Layout) -> DirectoryTree {
        DirectoryTree::owned(
            "installation prefix",
            &layout.prefix,
            PREFIX_MARKER,
            format!("python {}", self.config.version),
        )
    }

    fn jobs(&self) -> usize {
        match self.config.jobs {
            0 => std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            n => n,
        }
    }
}

impl Target for InterpreterTarget {
    fn name(&self) -> String {
        format!("python {}", self.config.version)
    }

    fn required_tools(&self) -> Vec<&'static str> {
        let mut tools = APT_TOOLS.to_vec();
        tools.push("make");
        tools
    }

    fn purge(&self, env: &Environment<'_>) -> Result<PhaseReport> {
        let mut report = PhaseReport::new(Phase::Purge);
        let layout = self.layout()?;

        let prefix = self.owned_prefix(&layout);
        if prefix.is_foreign() {
            log::warn!(
                "{} was not installed by debrig, leaving it in place",
                layout.prefix.display()
            );
        }
        report.record("installation prefix", ensure_absent(&prefix)?);

        let sources = DirectoryTree::new("source tree", &layout.source_root);
        report.record("source tree", ensure_absent(&sources)?);

        let patterns = self
            .config
            .purge_regexes()
            .context("Invalid [python] purge patterns")?;
        purge_matching(env, &patterns, &mut report)?;

        Ok(report)
    }

    fn install(&self, env: &Environment<'_>) -> Result<PhaseReport> {
        let mut report = PhaseReport::new(Phase::Install);
        let layout = self.layout()?;

        // deb-src is only needed while build-dep resolves
        let source_packages = SourcePackages::new(&env.paths.sources_list, env.distro.codename());
        with_toggle(&source_packages, || -> Result<()> {
            env.apt.update()?;
            env.apt.build_dep(&self.config.build_dep_package)?;
            Ok(())
        })?;
        env.apt.update()?;

        let compiler = self.choose_compiler(env)?;
        report.notes.push(format!("compiler {}", compiler.cc));
        let packages = compiler.packages();
        env.apt.install(&packages)?;
        report.installed.extend(packages);

        if layout.binary.exists() {
            log::info!("{} already installed", layout.binary.display());
            report.record("interpreter", Outcome::Unchanged);
            return Ok(report);
        }

        let tree = SourceTree::new(&layout.source_url, &layout.source_root, env.transport);
        report.record("source tree", ensure_present(&tree)?);

        let source_dir = tree.source_dir().with_context(|| {
            format!("No configure script under {}", layout.source_root.display())
        })?;

        let recipe = BuildRecipe {
            source_dir,
            prefix: layout.prefix.clone(),
            compiler,
            configure_flags: self.config.configure_flags.clone(),
            jobs: self.jobs(),
            run_tests: self.config.run_tests,
        };
        env.build.build(&recipe)?;
        report.record("interpreter", Outcome::Created);
        report.record("installation prefix", ensure_present(&self.owned_prefix(&layout))?);

        Ok(report)
    }
}
