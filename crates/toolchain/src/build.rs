//! Native configure/make builds.
//!
//! A [`BuildRecipe`] describes one autotools-style build. [`BuildRecipe::steps`]
//! expands it into the exact commands; a [`BuildDriver`] runs them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

/// A versioned C/C++ compiler pair, e.g. `gcc-12` / `g++-12`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compiler {
    /// Major version.
    pub major: u32,
    /// C compiler executable.
    pub cc: String,
    /// C++ compiler executable.
    pub cxx: String,
}

impl Compiler {
    /// The GNU compiler pair for a major version.
    pub fn gcc(major: u32) -> Self {
        Self {
            major,
            cc: format!("gcc-{major}"),
            cxx: format!("g++-{major}"),
        }
    }

    /// The compiler pair for a package family prefix (`gcc-` or `clang-`).
    pub fn from_family(prefix: &str, major: u32) -> Option<Self> {
        match prefix {
            "gcc-" => Some(Self::gcc(major)),
            "clang-" => Some(Self {
                major,
                cc: format!("clang-{major}"),
                cxx: format!("clang++-{major}"),
            }),
            _ => None,
        }
    }

    /// Package names providing this compiler pair.
    ///
    /// The clang package ships `clang++-N` itself.
    pub fn packages(&self) -> Vec<String> {
        if self.cc.starts_with("clang-") {
            vec![self.cc.clone()]
        } else {
            vec![self.cc.clone(), self.cxx.clone()]
        }
    }
}

/// One build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecipe {
    /// Unpacked source tree (contains `configure`).
    pub source_dir: PathBuf,
    /// Installation prefix.
    pub prefix: PathBuf,
    /// Compiler pair exported as `CC`/`CXX`.
    pub compiler: Compiler,
    /// Extra flags passed to `configure`.
    pub configure_flags: Vec<String>,
    /// Parallel make jobs.
    pub jobs: usize,
    /// Run the test suite before installing.
    pub run_tests: bool,
}

/// One command of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Short step name (configure, make, test, install).
    pub name: &'static str,
    /// Program to run, relative to the source tree or from `PATH`.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
}

impl BuildStep {
    /// The step as a shell-like command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl BuildRecipe {
    /// The commands this build runs, in order.
    ///
    /// Installation uses `make altinstall` so the system interpreter's
    /// unversioned entry points are never overwritten.
    pub fn steps(&self) -> Vec<BuildStep> {
        let mut configure_args = vec![format!("--prefix={}", self.prefix.display())];
        configure_args.extend(self.configure_flags.iter().cloned());

        let mut steps = vec![
            BuildStep {
                name: "configure",
                program: "./configure".to_string(),
                args: configure_args,
            },
            BuildStep {
                name: "make",
                program: "make".to_string(),
                args: vec![format!("-j{}", self.jobs.max(1))],
            },
        ];

        if self.run_tests {
            steps.push(BuildStep {
                name: "test",
                program: "make".to_string(),
                args: vec!["test".to_string()],
            });
        }

        steps.push(BuildStep {
            name: "install",
            program: "make".to_string(),
            args: vec!["altinstall".to_string()],
        });

        steps
    }
}

/// Runs build recipes.
pub trait BuildDriver: Send + Sync {
    /// Run every step of `recipe`, stopping at the first failure.
    fn build(&self, recipe: &BuildRecipe) -> Result<()>;
}

/// Driver running `configure` and `make` on the host.
#[derive(Debug, Clone, Default)]
pub struct MakeBuild;

impl MakeBuild {
    fn run_step(source_dir: &Path, compiler: &Compiler, step: &BuildStep) -> Result<()> {
        let command = step.command_line();
        log::info!("{}: {command}", step.name);

        let status = Command::new(&step.program)
            .args(&step.args)
            .current_dir(source_dir)
            .env("CC", &compiler.cc)
            .env("CXX", &compiler.cxx)
            .status()
            .map_err(|e| Error::io(source_dir.join(&step.program), e))?;

        if !status.success() {
            return Err(Error::BuildFailed {
                step: step.name.to_string(),
                command,
                exit_code: status.code(),
            });
        }

        Ok(())
    }
}

impl BuildDriver for MakeBuild {
    fn build(&self, recipe: &BuildRecipe) -> Result<()> {
        which::which("make").map_err(|_| Error::ToolNotFound("make".to_string()))?;

        for step in recipe.steps() {
            Self::run_step(&recipe.source_dir, &recipe.compiler, &step)?;
        }
        Ok(())
    }
}

/// Mock driver recording recipes instead of building them.
#[derive(Debug, Clone, Default)]
pub struct MockBuild {
    recipes: Arc<Mutex<Vec<BuildRecipe>>>,
    fail_step: Arc<Mutex<Option<&'static str>>>,
}

impl MockBuild {
    /// Create a new mock driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every build fail at the named step.
    pub fn fail_at(&self, step: &'static str) {
        *lock(&self.fail_step) = Some(step);
    }

    /// Every recipe handed to [`BuildDriver::build`].
    pub fn recipes(&self) -> Vec<BuildRecipe> {
        lock(&self.recipes).clone()
    }
}

impl BuildDriver for MockBuild {
    fn build(&self, recipe: &BuildRecipe) -> Result<()> {
        lock(&self.recipes).push(recipe.clone());

        if let Some(name) = *lock(&self.fail_step)
            && let Some(step) = recipe.steps().into_iter().find(|s| s.name == name)
        {
            return Err(Error::BuildFailed {
                step: name.to_string(),
                command: step.command_line(),
                exit_code: Some(2),
            });
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(run_tests: bool) -> BuildRecipe {
        BuildRecipe {
            source_dir: PathBuf::from("/usr/local/src/Python-3.12.1"),
            prefix: PathBuf::from("/opt/python/3.12.1"),
            compiler: Compiler::gcc(12),
            configure_flags: vec!["--enable-optimizations".to_string()],
            jobs: 8,
            run_tests,
        }
    }

    #[test]
    fn test_compiler_gcc() {
        let compiler = Compiler::gcc(12);
        assert_eq!(compiler.cc, "gcc-12");
        assert_eq!(compiler.cxx, "g++-12");
        assert_eq!(compiler.packages(), vec!["gcc-12", "g++-12"]);
    }

    #[test]
    fn test_compiler_from_family() {
        assert_eq!(Compiler::from_family("gcc-", 13), Some(Compiler::gcc(13)));

        let clang = Compiler::from_family("clang-", 18).unwrap();
        assert_eq!(clang.cxx, "clang++-18");
        assert_eq!(clang.packages(), vec!["clang-18"]);

        assert!(Compiler::from_family("icc-", 1).is_none());
    }

    #[test]
    fn test_steps_without_tests() {
        let steps: Vec<String> = recipe(false).steps().iter().map(BuildStep::command_line).collect();
        assert_eq!(
            steps,
            vec![
                "./configure --prefix=/opt/python/3.12.1 --enable-optimizations",
                "make -j8",
                "make altinstall",
            ]
        );
    }

    #[test]
    fn test_steps_with_tests() {
        let names: Vec<&str> = recipe(true).steps().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["configure", "make", "test", "install"]);
    }

    #[test]
    fn test_zero_jobs_means_one() {
        let mut r = recipe(false);
        r.jobs = 0;
        assert_eq!(r.steps()[1].command_line(), "make -j1");
    }

    #[test]
    fn test_mock_build_records_and_fails() {
        let mock = MockBuild::new();
        mock.build(&recipe(false)).unwrap();
        assert_eq!(mock.recipes().len(), 1);

        mock.fail_at("make");
        let err = mock.build(&recipe(false)).unwrap_err();
        assert!(matches!(err, Error::BuildFailed { ref step, .. } if step == "make"));
    }
}
