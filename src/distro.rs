//! Distro identity from os-release

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::path::Path;

use crate::runner;

/// Who the host says it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroIdentity {
    id: String,
    codename: String,
    version_id: Option<String>,
    pretty_name: Option<String>,
}

impl DistroIdentity {
    /// Build an identity directly
    pub fn new(id: &str, codename: &str) -> Self {
        Self {
            id: id.to_lowercase(),
            codename: codename.to_string(),
            version_id: None,
            pretty_name: None,
        }
    }

    /// Read the os-release file, asking `lsb_release` when it has no codename
    pub fn detect(os_release: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(os_release)
            .with_context(|| format!("Could not read {}", os_release.display()))?;

        let fields = parse_os_release(&content);
        let Some(id) = fields.get("ID") else {
            bail!("{} has no ID field", os_release.display());
        };

        let codename = match codename_field(&fields) {
            Some(codename) => codename.to_string(),
            None => {
                log::debug!("No codename in {}, asking lsb_release", os_release.display());
                runner::run_capture("lsb_release", &["-cs"])
                    .context("Could not determine the distribution codename")?
            }
        };

        if codename.is_empty() {
            bail!("Distribution codename is empty");
        }

        Ok(Self {
            id: id.to_lowercase(),
            codename,
            version_id: fields.get("VERSION_ID").cloned(),
            pretty_name: fields.get("PRETTY_NAME").cloned(),
        })
    }

    /// Release codename (e.g. `bookworm`, `jammy`)
    pub fn codename(&self) -> &str {
        &self.codename
    }

    /// Lowercase distributor id (e.g. `debian`, `ubuntu`)
    pub fn distributor_id(&self) -> &str {
        &self.id
    }

    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }

    /// Human-readable name for reports
    pub fn display_name(&self) -> String {
        self.pretty_name
            .clone()
            .unwrap_or_else(|| format!("{} ({})", self.id, self.codename))
    }
}

fn codename_field(fields: &HashMap<String, String>) -> Option<&str> {
    ["VERSION_CODENAME", "UBUNTU_CODENAME"]
        .iter()
        .filter_map(|key| fields.get(*key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

/// Parse `KEY=value` lines, unquoting values
fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BOOKWORM: &str = r#"PRETTY_NAME="Debian GNU/Linux 12 (bookworm)"
NAME="Debian GNU/Linux"
VERSION_ID="12"
VERSION="12 (bookworm)"
VERSION_CODENAME=bookworm
ID=debian
"#;

    const JAMMY: &str = r#"NAME="Ubuntu"
VERSION="22.04.4 LTS (Jammy Jellyfish)"
ID=ubuntu
ID_LIKE=debian
VERSION_ID="22.04"
UBUNTU_CODENAME=jammy
"#;

    fn write(content: &str) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("os-release");
        std::fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[test]
    fn test_detect_debian() {
        let (_temp, path) = write(BOOKWORM);
        let distro = DistroIdentity::detect(&path).unwrap();

        assert_eq!(distro.codename(), "bookworm");
        assert_eq!(distro.distributor_id(), "debian");
        assert_eq!(distro.version_id(), Some("12"));
        assert_eq!(distro.display_name(), "Debian GNU/Linux 12 (bookworm)");
    }

    #[test]
    fn test_detect_falls_back_to_ubuntu_codename() {
        let (_temp, path) = write(JAMMY);
        let distro = DistroIdentity::detect(&path).unwrap();

        assert_eq!(distro.codename(), "jammy");
        assert_eq!(distro.distributor_id(), "ubuntu");
    }

    #[test]
    fn test_detect_without_id_fails() {
        let (_temp, path) = write("VERSION_CODENAME=bookworm\n");
        assert!(DistroIdentity::detect(&path).is_err());
    }

    #[test]
    fn test_detect_missing_file_fails() {
        assert!(DistroIdentity::detect(Path::new("/nonexistent/os-release")).is_err());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"12\""), "12");
        assert_eq!(unquote("'x y'"), "x y");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\"unbalanced"), "\"unbalanced");
    }

    #[test]
    fn test_new_lowercases_id() {
        let distro = DistroIdentity::new("Ubuntu", "noble");
        assert_eq!(distro.distributor_id(), "ubuntu");
        assert_eq!(distro.display_name(), "ubuntu (noble)");
    }
}
