//! Config file resolution for debrig
//!
//! # Resolution Priority
//!
//! 1. `--config PATH` on the command line
//! 2. `DEBRIG_CONFIG` environment variable
//! 3. `/etc/debrig/config.toml` (system-wide, usual when run under sudo)
//! 4. `$XDG_CONFIG_HOME/debrig/config.toml`, then `~/.config/debrig/config.toml`
//!
//! An explicit path (1 or 2) must exist. The other locations are only used
//! when present; with none of them, built-in defaults apply.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Environment variable for config file override
pub const ENV_CONFIG: &str = "DEBRIG_CONFIG";

/// System-wide config file
pub const SYSTEM_CONFIG: &str = "/etc/debrig/config.toml";

/// Find the config file to load, if any
pub fn config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    // 1. Command line
    if let Some(path) = explicit {
        let path = expand_path(&path.to_string_lossy());
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        log::debug!("Using config from --config: {}", path.display());
        return Ok(Some(path));
    }

    // 2. Environment variable
    if let Ok(value) = std::env::var(ENV_CONFIG)
        && !value.is_empty()
    {
        let path = expand_path(&value);
        if !path.exists() {
            bail!("Config file from {ENV_CONFIG} not found: {}", path.display());
        }
        log::debug!("Using config from {ENV_CONFIG}: {}", path.display());
        return Ok(Some(path));
    }

    // 3. + 4. Well-known locations
    for candidate in candidates() {
        if candidate.is_file() {
            log::debug!("Using config: {}", candidate.display());
            return Ok(Some(candidate));
        }
    }

    log::debug!("No config file found, using built-in defaults");
    Ok(None)
}

/// Well-known config locations, in priority order
fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        paths.push(PathBuf::from(xdg_config).join("debrig").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config").join("debrig").join("config.toml"));
    }

    paths
}

/// Expand `~` and environment variables in a path string
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_must_exist() {
        let result = config_file(Some(Path::new("/nonexistent/debrig.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_config_is_used() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let found = config_file(Some(&path)).unwrap();
        assert_eq!(found, Some(path));
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/x"), home.join("x"));
        }
    }

    #[test]
    fn test_expand_path_absolute_unchanged() {
        assert_eq!(expand_path("/etc/debrig"), PathBuf::from("/etc/debrig"));
    }

    #[test]
    fn test_candidates_start_with_system_config() {
        let paths = candidates();
        assert_eq!(paths[0], PathBuf::from(SYSTEM_CONFIG));
    }
}
