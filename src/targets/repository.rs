//! Third-party repositories and the package family they provide

use anyhow::Context;
use declarative::{Phase, ensure_absent, ensure_present};
use std::path::PathBuf;
use toolchain::VersionSet;

use super::{APT_TOOLS, Environment, Target, purge_matching};
use crate::config::{REPOSITORY_VARS, Vars};
use crate::engine::report::PhaseReport;
use crate::error::{ProvisionError, Result};
use crate::resource::{RepositoryRegistration, SigningKey, SourceEntry};
use crate::schema::RepositoryProfile;

/// A configured repository profile
#[derive(Debug, Clone)]
pub struct RepositoryTarget {
    name: String,
    profile: RepositoryProfile,
}

/// A profile with every registration template resolved
#[derive(Debug, Clone)]
pub struct ResolvedRepository {
    pub key_url: String,
    pub key_path: PathBuf,
    pub registration: RepositoryRegistration,
    vars: Vars,
}

impl RepositoryTarget {
    pub fn new(name: impl Into<String>, profile: RepositoryProfile) -> Self {
        Self {
            name: name.into(),
            profile,
        }
    }

    /// Resolve key location and source line for this host
    pub fn resolve(&self, env: &Environment<'_>) -> Result<ResolvedRepository> {
        let mut vars = Vars::new(REPOSITORY_VARS);
        vars.set("codename", env.distro.codename());
        vars.set("distributor", env.distro.distributor_id());
        vars.set("arch", env.apt.architecture()?);
        if let Some(version) = self.profile.version {
            vars.set("version", version.to_string());
        }

        let key_file = vars.expand(&self.profile.key_file_name(&self.name))?;
        let key_path = env.paths.keyring_dir.join(key_file);

        let mut options = self
            .profile
            .options
            .iter()
            .map(|(key, value)| Ok((key.clone(), vars.expand(value)?)))
            .collect::<anyhow::Result<std::collections::BTreeMap<_, _>>>()?;
        options.insert("signed-by".to_string(), key_path.display().to_string());

        let registration = RepositoryRegistration {
            kind: vars.expand(&self.profile.kind)?,
            options,
            uri: vars.expand(&self.profile.uri)?,
            suite: vars.expand(&self.profile.suite)?,
            components: self
                .profile
                .components
                .iter()
                .map(|c| vars.expand(c))
                .collect::<anyhow::Result<_>>()?,
        };

        Ok(ResolvedRepository {
            key_url: vars.expand(&self.profile.key_url)?,
            key_path,
            registration,
            vars,
        })
    }

    /// Bind `{version}`: configured, else the highest the index offers
    fn bind_version(&self, env: &Environment<'_>, vars: &mut Vars) -> Result<Option<u32>> {
        if let Some(version) = self.profile.version {
            return Ok(Some(version));
        }

        let Some(probe) = &self.profile.version_probe else {
            return Ok(None);
        };

        let names = env.apt.available_packages(probe)?;
        let available = VersionSet::from_package_names(&names, probe);
        log::debug!("{probe}<N> available: {available}");

        let version = available
            .highest()
            .ok_or_else(|| ProvisionError::NoVersionAvailable {
                probe: probe.clone(),
            })?;
        vars.set("version", version.to_string());
        Ok(Some(version))
    }

    fn expand_all(vars: &Vars, templates: &[String]) -> Result<Vec<String>> {
        templates
            .iter()
            .map(|t| vars.expand(t).map_err(ProvisionError::from))
            .collect()
    }
}

impl Target for RepositoryTarget {
    fn name(&self) -> String {
        format!("repository {}", self.name)
    }

    fn required_tools(&self) -> Vec<&'static str> {
        APT_TOOLS.to_vec()
    }

    fn purge(&self, env: &Environment<'_>) -> Result<PhaseReport> {
        let mut report = PhaseReport::new(Phase::Purge);
        let resolved = self.resolve(env)?;

        let key = SigningKey::new(&resolved.key_url, &resolved.key_path, env.transport);
        report.record("signing key", ensure_absent(&key)?);

        let entry = SourceEntry::new(&resolved.registration, &env.paths.managed_list);
        report.record("repository entry", ensure_absent(&entry)?);

        let patterns = self
            .profile
            .purge_regexes()
            .with_context(|| format!("Invalid purge patterns for {}", self.name))?;
        purge_matching(env, &patterns, &mut report)?;

        Ok(report)
    }

    fn install(&self, env: &Environment<'_>) -> Result<PhaseReport> {
        let mut report = PhaseReport::new(Phase::Install);
        let resolved = self.resolve(env)?;

        let key = SigningKey::new(&resolved.key_url, &resolved.key_path, env.transport);
        report.record("signing key", ensure_present(&key)?);

        let entry = SourceEntry::new(&resolved.registration, &env.paths.managed_list);
        report.record("repository entry", ensure_present(&entry)?);

        env.apt.update()?;

        let mut vars = resolved.vars;
        if let Some(version) = self.bind_version(env, &mut vars)? {
            report.notes.push(format!("version {version}"));
        }

        let required = Self::expand_all(&vars, &self.profile.packages)?;
        if !required.is_empty() {
            env.apt.install(&required)?;
            report.installed.extend(required);
        }

        for package in Self::expand_all(&vars, &self.profile.optional_packages)? {
            match env.apt.install(std::slice::from_ref(&package)) {
                Ok(()) => report.installed.push(package),
                Err(e) if e.is_not_found() => {
                    log::warn!("Optional package {package} is not available, skipping");
                    report.skipped_optional.push(package);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_profiles;
    use crate::targets::fixture::Fixture;
    use aptkit::{Invocation, Selection};
    use declarative::Outcome;
    use std::collections::BTreeMap;
    use std::fs;

    const KEY: &[u8] = b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQINBF\n-----END PGP PUBLIC KEY BLOCK-----\n";

    fn example_profile() -> RepositoryProfile {
        RepositoryProfile {
            key_url: "https://example.com/{distributor}/key.asc".to_string(),
            key_file: None,
            kind: "deb".to_string(),
            options: BTreeMap::from([("arch".to_string(), "{arch}".to_string())]),
            uri: "https://example.com/{distributor}".to_string(),
            suite: "{codename}".to_string(),
            components: vec!["stable".to_string()],
            version: None,
            version_probe: None,
            packages: vec!["example-tool".to_string(), "example-lib".to_string()],
            optional_packages: Vec::new(),
            purge_patterns: vec![r"^example-".to_string()],
        }
    }

    #[test]
    fn test_resolve_renders_registration() {
        let fx = Fixture::new();
        let target = RepositoryTarget::new("example", example_profile());
        let resolved = target.resolve(&fx.env()).unwrap();

        assert_eq!(resolved.key_url, "https://example.com/debian/key.asc");
        assert_eq!(resolved.key_path, fx.paths.keyring_dir.join("example.asc"));
        assert_eq!(
            resolved.registration.line(),
            format!(
                "deb [arch=amd64 signed-by={}] https://example.com/debian bookworm stable",
                resolved.key_path.display()
            )
        );
    }

    #[test]
    fn test_install_fresh_host() {
        let fx = Fixture::new();
        fx.transport
            .add_response("https://example.com/debian/key.asc", KEY.to_vec());
        let target = RepositoryTarget::new("example", example_profile());

        let report = target.install(&fx.env()).unwrap();

        assert_eq!(report.outcome("signing key"), Some(Outcome::Created));
        assert_eq!(report.outcome("repository entry"), Some(Outcome::Created));
        assert_eq!(
            fx.apt.invocations(),
            vec![
                Invocation::Update,
                Invocation::Install(vec!["example-tool".to_string(), "example-lib".to_string()]),
            ]
        );
        assert!(fs::read_to_string(&fx.paths.managed_list)
            .unwrap()
            .contains("https://example.com/debian bookworm stable"));
    }

    #[test]
    fn test_probe_binds_highest_version() {
        let fx = Fixture::new();
        let profile = builtin_profiles().remove("postgresql").unwrap();
        fx.transport.add_response(&profile.key_url, KEY.to_vec());
        fx.apt.add_available([
            "postgresql-15",
            "postgresql-16",
            "postgresql-17",
            "postgresql-common",
            "postgresql-client-17",
        ]);

        let report = RepositoryTarget::new("postgresql", profile)
            .install(&fx.env())
            .unwrap();

        assert_eq!(report.notes, vec!["version 17"]);
        assert!(fx.apt.is_installed("postgresql-17"));
        assert!(fx.apt.is_installed("postgresql-client-17"));
        assert!(fx.apt.is_installed("postgresql-doc-17"));
    }

    #[test]
    fn test_probe_without_candidates_fails() {
        let fx = Fixture::new();
        let profile = builtin_profiles().remove("postgresql").unwrap();
        fx.transport.add_response(&profile.key_url, KEY.to_vec());

        let err = RepositoryTarget::new("postgresql", profile)
            .install(&fx.env())
            .unwrap_err();

        assert!(matches!(err, ProvisionError::NoVersionAvailable { .. }));
        assert_eq!(fx.apt.count("install"), 0);
    }

    #[test]
    fn test_optional_not_found_is_skipped() {
        let fx = Fixture::new();
        let mut profile = example_profile();
        profile.optional_packages = vec!["example-extra".to_string(), "example-docs".to_string()];
        fx.transport
            .add_response("https://example.com/debian/key.asc", KEY.to_vec());
        fx.apt.mark_unavailable("example-extra");

        let report = RepositoryTarget::new("example", profile)
            .install(&fx.env())
            .unwrap();

        assert_eq!(report.skipped_optional, vec!["example-extra"]);
        assert!(fx.apt.is_installed("example-docs"));
    }

    #[test]
    fn test_required_not_found_is_fatal() {
        let fx = Fixture::new();
        fx.transport
            .add_response("https://example.com/debian/key.asc", KEY.to_vec());
        fx.apt.mark_unavailable("example-lib");

        let err = RepositoryTarget::new("example", example_profile())
            .install(&fx.env())
            .unwrap_err();

        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_purge_removes_family_and_tidies() {
        let fx = Fixture::new();
        fx.apt.add_selection(Selection::installed("example-tool", "1.0"));
        fx.apt.add_selection(Selection::installed("unrelated", "2.0"));
        let target = RepositoryTarget::new("example", example_profile());

        let report = target.purge(&fx.env()).unwrap();

        assert_eq!(report.outcome("signing key"), Some(Outcome::Unchanged));
        assert_eq!(report.purged, vec!["example-tool"]);
        assert_eq!(
            fx.apt.invocations(),
            vec![
                Invocation::Purge(vec!["example-tool".to_string()]),
                Invocation::Autoremove,
                Invocation::Autoclean,
            ]
        );
        assert!(fx.apt.is_installed("unrelated"));
    }

    #[test]
    fn test_key_download_failure_stops_before_apt() {
        let fx = Fixture::new();
        let target = RepositoryTarget::new("example", example_profile());

        let err = target.install(&fx.env()).unwrap_err();

        assert_eq!(err.exit_code(), 6);
        assert!(matches!(err, ProvisionError::Transport { exit_code: 22, .. }));
        assert!(fx.apt.invocations().is_empty());
        assert!(!fx.paths.keyring_dir.join("example.asc").exists());
        assert!(!fx.paths.managed_list.exists());
    }

    #[test]
    fn test_non_key_response_is_a_creation_failure() {
        let fx = Fixture::new();
        fx.transport.add_response(
            "https://example.com/debian/key.asc",
            b"<html>moved</html>".to_vec(),
        );
        let target = RepositoryTarget::new("example", example_profile());

        let err = target.install(&fx.env()).unwrap_err();

        assert_eq!(err.exit_code(), 7);
        assert!(fx.apt.invocations().is_empty());
        assert!(!fx.paths.keyring_dir.join("example.asc").exists());
    }
}
