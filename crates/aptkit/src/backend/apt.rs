//! Real APT backend using `apt-get`, `apt-cache` and `dpkg-query`.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{SELECTION_FORMAT, Selection, parse_selections};
use std::process::{Command, Output};

/// Backend that executes real apt commands.
///
/// Mutating commands run non-interactively. When a lock timeout is set,
/// apt itself waits that long for another process to release the package
/// database lock before failing.
#[derive(Debug, Clone)]
pub struct AptBackend {
    apt_get: String,
    lock_timeout: Option<u32>,
}

impl Default for AptBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AptBackend {
    /// Create a backend using `apt-get` from `PATH`.
    pub fn new() -> Self {
        Self {
            apt_get: "apt-get".to_string(),
            lock_timeout: None,
        }
    }

    /// Wait up to `seconds` for the package database lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, seconds: u32) -> Self {
        self.lock_timeout = Some(seconds);
        self
    }

    /// Arguments for one apt-get verb.
    fn apt_get_args(&self, verb: &str, packages: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(packages.len() + 4);
        if let Some(seconds) = self.lock_timeout {
            args.push("-o".to_string());
            args.push(format!("DPkg::Lock::Timeout={seconds}"));
        }
        args.push(verb.to_string());
        args.push("-y".to_string());
        args.extend(packages.iter().cloned());
        args
    }

    /// Run a program and return its raw output.
    fn run(program: &str, args: &[&str]) -> Result<(String, Output)> {
        let command = display_command(program, args);
        log::debug!("running {command}");

        let output = Command::new(program)
            .args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .output()
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;

        Ok((command, output))
    }

    /// Run a program and check for success.
    fn run_checked(program: &str, args: &[&str]) -> Result<String> {
        let (command, output) = Self::run(program, args)?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_apt_output(&command, output.status.code(), &stderr));
        }

        Ok(stdout)
    }

    /// Run an apt-get verb with `-y`.
    fn apt_get(&self, verb: &str, packages: &[String]) -> Result<()> {
        let args = self.apt_get_args(verb, packages);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let stdout = Self::run_checked(&self.apt_get, &args)?;
        for line in stdout.lines() {
            log::debug!("{line}");
        }
        Ok(())
    }
}

impl Backend for AptBackend {
    fn list_selections(&self) -> Result<Vec<Selection>> {
        let stdout = Self::run_checked("dpkg-query", &["--show", "--showformat", SELECTION_FORMAT])?;
        parse_selections(&stdout)
    }

    fn available_packages(&self, prefix: &str) -> Result<Vec<String>> {
        let stdout = Self::run_checked("apt-cache", &["pkgnames", prefix])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    fn architecture(&self) -> Result<String> {
        let stdout = Self::run_checked("dpkg", &["--print-architecture"])?;
        Ok(stdout.trim().to_string())
    }

    fn update(&self) -> Result<()> {
        self.apt_get("update", &[])
    }

    fn install(&self, packages: &[String]) -> Result<()> {
        self.apt_get("install", packages)
    }

    fn purge(&self, packages: &[String]) -> Result<()> {
        self.apt_get("purge", packages)
    }

    fn autoremove(&self) -> Result<()> {
        self.apt_get("autoremove", &[])
    }

    fn autoclean(&self) -> Result<()> {
        self.apt_get("autoclean", &[])
    }

    fn build_dep(&self, package: &str) -> Result<()> {
        self.apt_get("build-dep", &[package.to_string()])
    }
}

fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        assert_eq!(
            display_command("apt-get", &["install", "-y", "clang-18"]),
            "apt-get install -y clang-18"
        );
        assert_eq!(display_command("dpkg", &[]), "dpkg");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = AptBackend::run_checked("debrig-no-such-program", &["--version"]).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert_eq!(err.category(), crate::ErrorCategory::AptNotFound);
    }

    #[test]
    fn test_apt_get_args() {
        let backend = AptBackend::new();
        assert_eq!(
            backend.apt_get_args("purge", &["clang-18".to_string()]),
            vec!["purge", "-y", "clang-18"]
        );
    }

    #[test]
    fn test_apt_get_args_with_lock_timeout() {
        let backend = AptBackend::new().with_lock_timeout(120);
        assert_eq!(
            backend.apt_get_args("update", &[]),
            vec!["-o", "DPkg::Lock::Timeout=120", "update", "-y"]
        );
    }
}
