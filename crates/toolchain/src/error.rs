//! Error types for toolchain operations.
//!
//! This module provides error types for version matching,
//! source fetching, extraction and native builds.

use std::io;
use std::path::PathBuf;

/// Result type alias for toolchain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code reported when a host name cannot be resolved.
pub const EXIT_RESOLVE: i32 = 6;
/// Exit code reported when the connection cannot be established.
pub const EXIT_CONNECT: i32 = 7;
/// Exit code reported for an HTTP error status.
pub const EXIT_HTTP_STATUS: i32 = 22;
/// Exit code reported when the transfer timed out.
pub const EXIT_TIMEOUT: i32 = 28;
/// Exit code reported for any other receive failure.
pub const EXIT_RECEIVE: i32 = 56;

/// A fetch failed.
///
/// `exit_code` follows curl's numbering so the upstream failure can always
/// be reported as a number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to fetch {url}: {message} (exit code {exit_code})")]
pub struct TransportError {
    /// URL that was requested.
    pub url: String,
    /// What went wrong.
    pub message: String,
    /// curl-compatible exit code.
    pub exit_code: i32,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(url: impl Into<String>, message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
            exit_code,
        }
    }

    /// Map a `ureq` failure to its curl-compatible exit code.
    pub fn from_ureq(url: &str, err: &ureq::Error) -> Self {
        let exit_code = match err {
            ureq::Error::HostNotFound => EXIT_RESOLVE,
            ureq::Error::ConnectionFailed => EXIT_CONNECT,
            ureq::Error::StatusCode(_) => EXIT_HTTP_STATUS,
            ureq::Error::Timeout(_) => EXIT_TIMEOUT,
            ureq::Error::Io(io_err) => match io_err.kind() {
                io::ErrorKind::TimedOut => EXIT_TIMEOUT,
                io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
                    EXIT_CONNECT
                }
                _ => EXIT_RECEIVE,
            },
            _ => EXIT_RECEIVE,
        };

        let message = match err {
            ureq::Error::StatusCode(code) => format!("HTTP {code}"),
            other => other.to_string(),
        };

        Self::new(url, message, exit_code)
    }
}

/// No value is present in both version sets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no compatible version: available {set_a:?}, supported {set_b:?}")]
pub struct NoCompatibleVersion {
    /// The binary-searched set.
    pub set_a: Vec<u32>,
    /// The preference-ordered candidate set.
    pub set_b: Vec<u32>,
}

/// Errors that can occur during toolchain operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fetching a remote resource failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Version matching found nothing.
    #[error(transparent)]
    NoCompatibleVersion(#[from] NoCompatibleVersion),

    /// Failed to decode an archive.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A build step exited non-zero.
    #[error("{step} failed: `{command}` exited with {}", display_code(.exit_code))]
    BuildFailed {
        /// Build step (configure, make, ...).
        step: String,
        /// Full command line.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        exit_code: Option<i32>,
    },

    /// Required program not found in `PATH`.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_status_maps_to_22() {
        let err = TransportError::from_ureq(
            "https://apt.llvm.org/llvm-snapshot.gpg.key",
            &ureq::Error::StatusCode(404),
        );
        assert_eq!(err.exit_code, EXIT_HTTP_STATUS);
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_transport_host_not_found_maps_to_6() {
        let err = TransportError::from_ureq("https://nowhere.invalid/", &ureq::Error::HostNotFound);
        assert_eq!(err.exit_code, EXIT_RESOLVE);
    }

    #[test]
    fn test_transport_io_timeout_maps_to_28() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        let err = TransportError::from_ureq("https://example.com/", &ureq::Error::Io(io_err));
        assert_eq!(err.exit_code, EXIT_TIMEOUT);
    }

    #[test]
    fn test_no_compatible_version_display() {
        let err = NoCompatibleVersion {
            set_a: vec![15],
            set_b: vec![16, 17],
        };
        assert_eq!(
            err.to_string(),
            "no compatible version: available [15], supported [16, 17]"
        );
    }

    #[test]
    fn test_build_failed_display() {
        let err = Error::BuildFailed {
            step: "configure".to_string(),
            command: "./configure --prefix=/opt/python".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(
            err.to_string(),
            "configure failed: `./configure --prefix=/opt/python` exited with code 1"
        );
    }
}
