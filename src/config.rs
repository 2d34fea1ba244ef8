//! Config loading, built-in repository profiles, and template expansion

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::schema::{DebrigConfig, PythonConfig, RepositoryProfile};

/// Placeholders a repository profile may use
pub const REPOSITORY_VARS: &[&str] = &["codename", "distributor", "arch", "version"];

/// Placeholders the interpreter settings may use
pub const PYTHON_VARS: &[&str] = &["release", "series"];

/// Fields of a repository profile that shape the registration itself
const REGISTRATION_FIELDS: &[&str] = &["key_url", "key_file", "uri", "suite", "components", "options"];

/// A loaded configuration and where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub source: Option<PathBuf>,
    pub config: DebrigConfig,
}

/// Resolve, read, merge built-ins, and validate
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let source = paths::config_file(explicit)?;

    let config = match &source {
        Some(path) => DebrigConfig::from_file(path)?,
        None => DebrigConfig::default(),
    }
    .with_builtins();

    config.validate()?;
    Ok(LoadedConfig { source, config })
}

impl DebrigConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Add built-in profiles the file does not override
    pub fn with_builtins(mut self) -> Self {
        for (name, profile) in builtin_profiles() {
            self.repositories.entry(name).or_insert(profile);
        }
        self
    }

    /// Look up a repository profile by name
    pub fn profile(&self, name: &str) -> Result<&RepositoryProfile> {
        self.repositories.get(name).with_context(|| {
            let known: Vec<&str> = self.repositories.keys().map(String::as_str).collect();
            format!(
                "Unknown repository profile '{name}' (available: {})",
                known.join(", ")
            )
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in &self.repositories {
            profile
                .validate()
                .with_context(|| format!("Invalid repository profile '{name}'"))?;
        }

        self.python.validate().context("Invalid [python] section")?;
        Ok(())
    }
}

impl RepositoryProfile {
    /// Every template string of the profile, labelled by field
    fn templates(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("key_url", self.key_url.as_str()),
            ("kind", self.kind.as_str()),
            ("uri", self.uri.as_str()),
            ("suite", self.suite.as_str()),
        ];
        if let Some(key_file) = &self.key_file {
            fields.push(("key_file", key_file));
        }
        fields.extend(self.components.iter().map(|c| ("components", c.as_str())));
        fields.extend(self.options.values().map(|v| ("options", v.as_str())));
        fields.extend(self.packages.iter().map(|p| ("packages", p.as_str())));
        fields.extend(
            self.optional_packages
                .iter()
                .map(|p| ("optional_packages", p.as_str())),
        );
        fields
    }

    /// Compiled purge patterns
    pub fn purge_regexes(&self) -> Result<Vec<Regex>> {
        compile_patterns(&self.purge_patterns)
    }

    /// Check placeholders, version binding, and patterns
    pub fn validate(&self) -> Result<()> {
        let mut needs_version = false;

        for (field, template) in self.templates() {
            for name in placeholders(template)? {
                if !REPOSITORY_VARS.contains(&name) {
                    bail!("unknown placeholder {{{name}}} in {field}: \"{template}\"");
                }
                if name == "version" {
                    if REGISTRATION_FIELDS.contains(&field) && self.version.is_none() {
                        bail!(
                            "{field} uses {{version}}, which needs an explicit `version` \
                             (a probe can only run once the repository is registered)"
                        );
                    }
                    needs_version = true;
                }
            }
        }

        if needs_version && self.version.is_none() && self.version_probe.is_none() {
            bail!("packages use {{version}} but neither `version` nor `version_probe` is set");
        }

        if self.packages.is_empty() && self.optional_packages.is_empty() {
            bail!("no packages listed");
        }

        self.purge_regexes()?;
        Ok(())
    }

    /// Key file name inside the keyring directory
    pub fn key_file_name(&self, profile_name: &str) -> String {
        self.key_file
            .clone()
            .unwrap_or_else(|| format!("{profile_name}.asc"))
    }
}

impl PythonConfig {
    /// `(major, minor, patch)` of the configured release
    pub fn release(&self) -> Result<(u32, u32, u32)> {
        let parts: Vec<&str> = self.version.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            bail!("python version must look like 3.12.1, got '{}'", self.version);
        };
        let parse = |s: &str| -> Result<u32> {
            s.parse()
                .with_context(|| format!("invalid python version '{}'", self.version))
        };
        Ok((parse(major)?, parse(minor)?, parse(patch)?))
    }

    /// Template variables for a release
    pub fn vars(&self) -> Result<Vars> {
        let (major, minor, _) = self.release()?;
        let mut vars = Vars::new(PYTHON_VARS);
        vars.set("release", &self.version);
        vars.set("series", format!("{major}.{minor}"));
        Ok(vars)
    }

    /// Compiled purge patterns
    pub fn purge_regexes(&self) -> Result<Vec<Regex>> {
        compile_patterns(&self.purge_patterns)
    }

    /// Check release format, templates, and compiler list
    pub fn validate(&self) -> Result<()> {
        let vars = self.vars()?;
        vars.expand(&self.source_url)?;

        let prefix = vars.expand(&self.prefix)?;
        if !placeholders(&self.prefix)?
            .iter()
            .any(|name| PYTHON_VARS.contains(name))
        {
            bail!(
                "prefix must be release-specific (use {{release}} or {{series}}), got \"{}\"",
                self.prefix
            );
        }
        if !Path::new(&prefix).is_absolute() {
            bail!("prefix must be an absolute path, got \"{prefix}\"");
        }

        if toolchain::Compiler::from_family(&self.compiler_prefix, 0).is_none() {
            bail!(
                "compiler_prefix must be \"gcc-\" or \"clang-\", got \"{}\"",
                self.compiler_prefix
            );
        }
        if !self.compatible_compilers.is_sorted() {
            bail!(
                "compatible_compilers must be ascending, got {:?}",
                self.compatible_compilers
            );
        }

        self.purge_regexes()?;
        Ok(())
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("Invalid purge pattern '{p}'")))
        .collect()
}

// ============================================================================
// Templates
// ============================================================================

/// Values substituted into `{name}` placeholders
#[derive(Debug, Clone)]
pub struct Vars {
    known: &'static [&'static str],
    values: BTreeMap<&'static str, String>,
}

impl Vars {
    /// An empty set of bindings accepting the given names
    pub fn new(known: &'static [&'static str]) -> Self {
        Self {
            known,
            values: BTreeMap::new(),
        }
    }

    /// Bind a placeholder
    pub fn set(&mut self, name: &'static str, value: impl Into<String>) {
        self.values.insert(name, value.into());
    }

    /// Current binding of a placeholder
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Substitute every placeholder; unknown or unbound names are errors
    pub fn expand(&self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .with_context(|| format!("unterminated placeholder in \"{template}\""))?;
            let name = &after[..close];

            if !self.known.contains(&name) {
                bail!("unknown placeholder {{{name}}} in \"{template}\"");
            }
            let value = self
                .values
                .get(name)
                .with_context(|| format!("placeholder {{{name}}} in \"{template}\" has no value"))?;

            out.push_str(value);
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Names of every `{placeholder}` in a template
pub fn placeholders(template: &str) -> Result<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .with_context(|| format!("unterminated placeholder in \"{template}\""))?;
        names.push(&after[..close]);
        rest = &after[close + 1..];
    }

    Ok(names)
}

// ============================================================================
// Built-in profiles
// ============================================================================

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Profiles available without any config file
pub fn builtin_profiles() -> BTreeMap<String, RepositoryProfile> {
    let mut profiles = BTreeMap::new();

    profiles.insert(
        "llvm".to_string(),
        RepositoryProfile {
            key_url: "https://apt.llvm.org/llvm-snapshot.gpg.key".to_string(),
            key_file: None,
            kind: "deb".to_string(),
            options: BTreeMap::new(),
            uri: "http://apt.llvm.org/{codename}/".to_string(),
            suite: "llvm-toolchain-{codename}-{version}".to_string(),
            components: strings(&["main"]),
            version: Some(18),
            version_probe: None,
            packages: strings(&[
                "clang-{version}",
                "lld-{version}",
                "lldb-{version}",
                "llvm-{version}-dev",
            ]),
            optional_packages: strings(&[
                "clangd-{version}",
                "clang-format-{version}",
                "clang-tidy-{version}",
                "libc++-{version}-dev",
                "libc++abi-{version}-dev",
                "libunwind-{version}-dev",
                "libclang-rt-{version}-dev",
            ]),
            purge_patterns: strings(&[
                r"^(clang|clangd|clang-format|clang-tidy|lld|lldb|llvm)-[0-9]+",
                r"^lib(llvm|clang-cpp|clang-rt-|c\+\+|c\+\+abi|unwind|omp|lldb)-?[0-9]+",
                r"^python3-(clang|lldb)-[0-9]+$",
            ]),
        },
    );

    profiles.insert(
        "docker".to_string(),
        RepositoryProfile {
            key_url: "https://download.docker.com/linux/{distributor}/gpg".to_string(),
            key_file: None,
            kind: "deb".to_string(),
            options: BTreeMap::from([("arch".to_string(), "{arch}".to_string())]),
            uri: "https://download.docker.com/linux/{distributor}".to_string(),
            suite: "{codename}".to_string(),
            components: strings(&["stable"]),
            version: None,
            version_probe: None,
            packages: strings(&[
                "docker-ce",
                "docker-ce-cli",
                "containerd.io",
                "docker-buildx-plugin",
                "docker-compose-plugin",
            ]),
            optional_packages: strings(&["docker-ce-rootless-extras"]),
            purge_patterns: strings(&[
                r"^docker-ce(-cli|-rootless-extras)?$",
                r"^containerd\.io$",
                r"^docker-(buildx|compose)-plugin$",
            ]),
        },
    );

    profiles.insert(
        "postgresql".to_string(),
        RepositoryProfile {
            key_url: "https://www.postgresql.org/media/keys/ACCC4CF8.asc".to_string(),
            key_file: None,
            kind: "deb".to_string(),
            options: BTreeMap::new(),
            uri: "https://apt.postgresql.org/pub/repos/apt".to_string(),
            suite: "{codename}-pgdg".to_string(),
            components: strings(&["main"]),
            version: None,
            version_probe: Some("postgresql-".to_string()),
            packages: strings(&["postgresql-{version}", "postgresql-client-{version}"]),
            optional_packages: strings(&["postgresql-doc-{version}"]),
            purge_patterns: strings(&[
                r"^postgresql(-client|-doc)?-[0-9]+$",
                r"^postgresql-(client-)?common$",
            ]),
        },
    );

    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_vars() -> Vars {
        let mut vars = Vars::new(REPOSITORY_VARS);
        vars.set("codename", "jammy");
        vars.set("distributor", "ubuntu");
        vars.set("arch", "amd64");
        vars
    }

    #[test]
    fn test_expand_known_placeholders() {
        let vars = repo_vars();
        assert_eq!(
            vars.expand("https://download.docker.com/linux/{distributor} {codename}")
                .unwrap(),
            "https://download.docker.com/linux/ubuntu jammy"
        );
        assert_eq!(vars.expand("no placeholders").unwrap(), "no placeholders");
    }

    #[test]
    fn test_expand_unknown_placeholder_fails() {
        let err = repo_vars().expand("{release}").unwrap_err();
        assert!(err.to_string().contains("unknown placeholder {release}"));
    }

    #[test]
    fn test_expand_unbound_placeholder_fails() {
        let err = repo_vars().expand("clang-{version}").unwrap_err();
        assert!(err.to_string().contains("has no value"));
    }

    #[test]
    fn test_expand_unterminated_fails() {
        assert!(repo_vars().expand("clang-{version").is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholders("llvm-toolchain-{codename}-{version}").unwrap(),
            vec!["codename", "version"]
        );
    }

    #[test]
    fn test_builtin_profiles_are_valid() {
        for (name, profile) in builtin_profiles() {
            profile
                .validate()
                .unwrap_or_else(|e| panic!("{name}: {e:#}"));
        }
    }

    #[test]
    fn test_probe_cannot_bind_registration_fields() {
        let mut profile = builtin_profiles().remove("llvm").unwrap();
        profile.version = None;
        profile.version_probe = Some("clang-".to_string());

        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("explicit `version`"));
    }

    #[test]
    fn test_unbindable_version_is_rejected() {
        let mut profile = builtin_profiles().remove("postgresql").unwrap();
        profile.version_probe = None;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_invalid_purge_pattern_is_rejected() {
        let mut profile = builtin_profiles().remove("docker").unwrap();
        profile.purge_patterns = vec!["(unclosed".to_string()];
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_user_profile_overrides_builtin() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [repositories.llvm]
            key_url = "https://mirror.example.com/llvm.key"
            uri = "https://mirror.example.com/llvm/{codename}/"
            suite = "llvm-toolchain-{codename}-{version}"
            version = 17
            packages = ["clang-{version}"]
            "#,
        )
        .unwrap();

        let loaded = load(Some(&path)).unwrap();
        let llvm = loaded.config.profile("llvm").unwrap();
        assert_eq!(llvm.version, Some(17));
        assert!(llvm.optional_packages.is_empty());
        assert!(loaded.config.profile("docker").is_ok());
        assert_eq!(loaded.source, Some(path));
    }

    #[test]
    fn test_unknown_profile_lists_available() {
        let config = DebrigConfig::default().with_builtins();
        let err = config.profile("nope").unwrap_err();
        assert!(err.to_string().contains("docker, llvm, postgresql"));
    }

    #[test]
    fn test_python_release_vars() {
        let python = PythonConfig::default();
        let vars = python.vars().unwrap();
        assert_eq!(vars.get("series"), Some("3.12"));
        assert_eq!(
            vars.expand(&python.source_url).unwrap(),
            "https://www.python.org/ftp/python/3.12.8/Python-3.12.8.tgz"
        );
    }

    #[test]
    fn test_python_bad_release() {
        let python = PythonConfig {
            version: "3.12".to_string(),
            ..Default::default()
        };
        assert!(python.validate().is_err());
    }

    #[test]
    fn test_python_unknown_compiler_family() {
        let python = PythonConfig {
            compiler_prefix: "icc-".to_string(),
            ..Default::default()
        };
        assert!(python.validate().is_err());
    }

    #[test]
    fn test_python_shared_prefix_is_rejected() {
        for prefix in ["/usr/local", "/opt/python", "/"] {
            let python = PythonConfig {
                prefix: prefix.to_string(),
                ..Default::default()
            };
            let err = python.validate().unwrap_err();
            assert!(err.to_string().contains("release-specific"), "{prefix}: {err}");
        }
    }

    #[test]
    fn test_python_relative_prefix_is_rejected() {
        let python = PythonConfig {
            prefix: "python-{series}".to_string(),
            ..Default::default()
        };
        assert!(python.validate().is_err());
    }

    #[test]
    fn test_python_series_prefix_is_accepted() {
        let python = PythonConfig {
            prefix: "/opt/python{series}".to_string(),
            ..Default::default()
        };
        assert!(python.validate().is_ok());
    }

    #[test]
    fn test_python_compilers_must_be_ascending() {
        let python = PythonConfig {
            compatible_compilers: vec![12, 11],
            ..Default::default()
        };
        assert!(python.validate().is_err());
    }
}
