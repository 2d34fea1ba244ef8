use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ============================================================================
// Main Config Schema
// ============================================================================

/// The debrig configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebrigConfig {
    /// Host file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Package manager behaviour
    #[serde(default)]
    pub apt: AptConfig,

    /// Repository profiles by name (merged over the built-in ones)
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryProfile>,

    /// Interpreter build settings
    #[serde(default)]
    pub python: PythonConfig,
}

// ============================================================================
// Paths
// ============================================================================

/// Files and directories debrig reads or writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Primary one-line-style source list (deb-src toggling happens here)
    pub sources_list: PathBuf,
    /// Shared list file holding every registration debrig adds
    pub managed_list: PathBuf,
    /// Directory for repository signing keys
    pub keyring_dir: PathBuf,
    /// Distro identity file
    pub os_release: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sources_list: PathBuf::from("/etc/apt/sources.list"),
            managed_list: PathBuf::from("/etc/apt/sources.list.d/debrig.list"),
            keyring_dir: PathBuf::from("/etc/apt/keyrings"),
            os_release: PathBuf::from("/etc/os-release"),
        }
    }
}

// ============================================================================
// APT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AptConfig {
    /// Seconds apt waits for another process to release the package lock
    pub lock_timeout: Option<u32>,
}

// ============================================================================
// Repository Profiles
// ============================================================================

/// A third-party repository and the package family it provides
///
/// String fields are templates: `{codename}`, `{distributor}`, `{arch}` and
/// `{version}` are substituted before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryProfile {
    /// Where the signing key is published
    pub key_url: String,

    /// Key file name inside the keyring directory (default `<name>.asc`)
    #[serde(default)]
    pub key_file: Option<String>,

    /// Source type
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Extra `[key=value]` options (`signed-by` is always added)
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    /// Repository base URI
    pub uri: String,

    /// Distribution/suite
    pub suite: String,

    /// Components
    #[serde(default = "default_components")]
    pub components: Vec<String>,

    /// Explicit major version bound to `{version}`
    #[serde(default)]
    pub version: Option<u32>,

    /// Package prefix used to find the highest available version
    #[serde(default)]
    pub version_probe: Option<String>,

    /// Packages installed in one transaction
    #[serde(default)]
    pub packages: Vec<String>,

    /// Packages installed one by one; "not found" is tolerated
    #[serde(default)]
    pub optional_packages: Vec<String>,

    /// Regexes matching every package of this family (for purge)
    #[serde(default)]
    pub purge_patterns: Vec<String>,
}

fn default_kind() -> String {
    "deb".to_string()
}

fn default_components() -> Vec<String> {
    vec!["main".to_string()]
}

// ============================================================================
// Python
// ============================================================================

/// Interpreter built from source
///
/// `source_url` and `prefix` accept `{release}` (e.g. `3.12.1`) and
/// `{series}` (e.g. `3.12`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PythonConfig {
    /// Release to build
    pub version: String,
    /// Source tarball URL
    pub source_url: String,
    /// Installation prefix, absolute and specific to one release
    pub prefix: String,
    /// Directory source trees are unpacked into
    pub build_root: PathBuf,
    /// Package prefix of the C compiler (`gcc-` gives `gcc-12`)
    pub compiler_prefix: String,
    /// Compiler majors this interpreter release is known to build with, ascending
    pub compatible_compilers: Vec<u32>,
    /// Source package whose build dependencies are installed
    pub build_dep_package: String,
    /// Extra `configure` flags
    pub configure_flags: Vec<String>,
    /// Parallel make jobs (0 = number of CPUs)
    pub jobs: usize,
    /// Run the test suite before installing
    pub run_tests: bool,
    /// Regexes of packages removed on purge
    pub purge_patterns: Vec<String>,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            version: "3.12.8".to_string(),
            source_url: "https://www.python.org/ftp/python/{release}/Python-{release}.tgz"
                .to_string(),
            prefix: "/opt/python/{release}".to_string(),
            build_root: PathBuf::from("/usr/local/src/debrig"),
            compiler_prefix: "gcc-".to_string(),
            compatible_compilers: vec![9, 10, 11, 12, 13, 14],
            build_dep_package: "python3".to_string(),
            configure_flags: vec!["--enable-optimizations".to_string()],
            jobs: 0,
            run_tests: false,
            purge_patterns: Vec::new(),
        }
    }
}
