//! Repository signing key stored in the keyring directory

use anyhow::{Context, Result};
use declarative::{ManagedResource, ResourceState, StepFailure};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use toolchain::Transport;

const ARMOR_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";

/// OpenPGP packet tag of a public key
const PUBLIC_KEY_TAG: u8 = 6;

/// How fetched key material is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// ASCII-armored, stored as `.asc`
    Armored,
    /// Binary packets, stored as `.gpg`
    Binary,
}

impl KeyFormat {
    /// Recognize OpenPGP public key material
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
        if text.trim_start().starts_with(ARMOR_HEADER) {
            return Some(Self::Armored);
        }

        let first = *bytes.first()?;
        if first & 0x80 == 0 {
            return None;
        }
        let tag = if first & 0x40 == 0 {
            (first >> 2) & 0x0f
        } else {
            first & 0x3f
        };
        (tag == PUBLIC_KEY_TAG).then_some(Self::Binary)
    }

    /// File extension apt expects for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Armored => "asc",
            Self::Binary => "gpg",
        }
    }
}

/// A signing key fetched from `url` into `path`
pub struct SigningKey<'a> {
    url: String,
    path: PathBuf,
    transport: &'a dyn Transport,
}

impl std::fmt::Debug for SigningKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("url", &self.url)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<'a> SigningKey<'a> {
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>, transport: &'a dyn Transport) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            transport,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn expected_format(&self) -> Option<KeyFormat> {
        match self.path.extension()?.to_str()? {
            "asc" => Some(KeyFormat::Armored),
            "gpg" => Some(KeyFormat::Binary),
            _ => None,
        }
    }

    /// Fetched bytes must be a key in the format the file name promises
    fn validate(&self, bytes: &[u8]) -> Result<(), StepFailure> {
        let Some(format) = KeyFormat::detect(bytes) else {
            return Err(StepFailure::new(format!(
                "{} did not return an OpenPGP public key",
                self.url
            )));
        };

        if let Some(expected) = self.expected_format()
            && expected != format
        {
            return Err(StepFailure::new(format!(
                "{} returned a {} key but {} expects .{}; set key_file to a .{} name",
                self.url,
                match format {
                    KeyFormat::Armored => "armored",
                    KeyFormat::Binary => "binary",
                },
                self.path.display(),
                expected.extension(),
                format.extension()
            )));
        }

        Ok(())
    }
}

impl ManagedResource for SigningKey<'_> {
    fn name(&self) -> &str {
        "signing key"
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn observe(&self) -> Result<ResourceState> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => Ok(ResourceState::Present {
                details: Some(format!("{} bytes", meta.len())),
            }),
            Ok(_) => anyhow::bail!("{} exists but is not a file", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ResourceState::Absent),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}", self.path.display())),
        }
    }

    fn create(&self) -> Result<(), StepFailure> {
        let bytes = self.transport.fetch(&self.url).map_err(|e| {
            StepFailure::new(e.to_string()).with_exit_code(e.exit_code)
        })?;

        self.validate(&bytes)?;

        let created = match self.path.parent() {
            Some(parent) => super::create_dir_tracked(parent)?,
            None => None,
        };

        fs::write(&self.path, &bytes)
            .and_then(|()| fs::set_permissions(&self.path, fs::Permissions::from_mode(0o644)))
            .map_err(|e| super::unwind_created(created, e.into()))
    }

    fn remove(&self) -> Result<()> {
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Outcome, ReconcileError, ensure_absent, ensure_present};
    use tempfile::TempDir;
    use toolchain::MockTransport;

    const URL: &str = "https://example.com/key.asc";
    const ARMORED: &[u8] = b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQINBF\n-----END PGP PUBLIC KEY BLOCK-----\n";
    /// Old-format public key packet header followed by a version byte
    const BINARY: &[u8] = &[0x99, 0x02, 0x0d, 0x04];

    #[test]
    fn test_detect_key_format() {
        assert_eq!(KeyFormat::detect(ARMORED), Some(KeyFormat::Armored));
        assert_eq!(KeyFormat::detect(BINARY), Some(KeyFormat::Binary));
        assert_eq!(KeyFormat::detect(&[0xc6, 0x01]), Some(KeyFormat::Binary));
        assert_eq!(KeyFormat::detect(b"<html>not found</html>"), None);
        assert_eq!(KeyFormat::detect(&[0x88, 0x00]), None);
        assert_eq!(KeyFormat::detect(b""), None);
    }

    #[test]
    fn test_create_writes_key_with_mode() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("keyrings").join("llvm.asc");
        let transport = MockTransport::new();
        transport.add_response(URL, ARMORED.to_vec());

        let key = SigningKey::new(URL, &path, &transport);
        assert_eq!(ensure_present(&key).unwrap(), Outcome::Created);

        assert_eq!(fs::read(&path).unwrap(), ARMORED);
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        assert_eq!(ensure_present(&key).unwrap(), Outcome::Unchanged);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_transport_failure_keeps_exit_code_and_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keyrings");
        let path = dir.join("llvm.asc");
        let transport = MockTransport::new();
        transport.add_failure(URL, 6);

        let key = SigningKey::new(URL, &path, &transport);
        let err = ensure_present(&key).unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::ResourceCreationFailed {
                exit_code: Some(6),
                ..
            }
        ));
        assert!(!path.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_failed_write_removes_every_created_directory() {
        let temp = TempDir::new().unwrap();
        let name = format!("{}.asc", "k".repeat(300));
        let path = temp.path().join("etc/apt/keyrings").join(name);
        let transport = MockTransport::new();
        transport.add_response(URL, ARMORED.to_vec());

        let failure = SigningKey::new(URL, &path, &transport).create().unwrap_err();

        assert!(failure.exit_code.is_none());
        assert!(!temp.path().join("etc").exists());
    }

    #[test]
    fn test_non_key_content_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docker.asc");
        let transport = MockTransport::new();
        transport.add_response(URL, b"<html>moved</html>".to_vec());

        let key = SigningKey::new(URL, &path, &transport);
        let err = ensure_present(&key).unwrap_err();
        assert!(err.to_string().contains("did not return an OpenPGP public key"));
        assert!(!path.exists());
    }

    #[test]
    fn test_binary_key_needs_gpg_name() {
        let temp = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.add_response(URL, BINARY.to_vec());

        let asc = SigningKey::new(URL, temp.path().join("pg.asc"), &transport);
        let err = ensure_present(&asc).unwrap_err();
        assert!(err.to_string().contains("set key_file to a .gpg name"));

        let gpg = SigningKey::new(URL, temp.path().join("pg.gpg"), &transport);
        assert_eq!(ensure_present(&gpg).unwrap(), Outcome::Created);
    }

    #[test]
    fn test_remove_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("llvm.asc");
        let transport = MockTransport::new();
        transport.add_response(URL, ARMORED.to_vec());
        let key = SigningKey::new(URL, &path, &transport);

        assert_eq!(ensure_absent(&key).unwrap(), Outcome::Unchanged);
        ensure_present(&key).unwrap();
        assert_eq!(ensure_absent(&key).unwrap(), Outcome::Removed);
        assert_eq!(ensure_absent(&key).unwrap(), Outcome::Unchanged);
        assert!(!path.exists());
    }
}
