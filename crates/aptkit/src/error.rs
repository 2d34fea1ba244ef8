//! Error types for APT and dpkg operations.
//!
//! APT reports failures as free-form text on stderr. Errors are categorized
//! from that text on a best-effort basis; anything that does not match a
//! known diagnostic stays a plain [`Error::CommandFailed`] and must be
//! treated as a hard failure.

use thiserror::Error;

/// Categories of APT errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Package unknown to the configured repositories
    NotFound,
    /// The dpkg/apt lock is held by another process
    Locked,
    /// Repository or mirror unreachable
    Network,
    /// Not running with enough privileges
    Permission,
    /// apt/dpkg binaries missing
    AptNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Actionable advice for this category, if there is any.
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::NotFound => Some("Check the package name and that its repository is registered"),
            Self::Locked => Some("Wait for the other package manager process to finish"),
            Self::Network => Some("Check your network connection and the repository URI"),
            Self::Permission => Some("Run the command as root"),
            Self::AptNotFound => Some("This tool only supports Debian-family hosts"),
            Self::Other => None,
        }
    }
}

/// Errors that can occur during APT operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Package not found in any configured repository
    #[error("package not found: {name}")]
    NotFound {
        /// Name of the package that could not be found
        name: String,
        /// The command that reported it
        command: String,
        /// Exit code of that command
        exit_code: Option<i32>,
    },

    /// dpkg or apt lock held by another process
    #[error("package database is locked: {message}")]
    Locked {
        /// Diagnostic from apt
        message: String,
        /// The command that reported it
        command: String,
        /// Exit code of that command
        exit_code: Option<i32>,
    },

    /// Command exited non-zero
    #[error("`{command}` failed with exit code {}: {stderr}", display_code(.exit_code))]
    CommandFailed {
        /// Full command line
        command: String,
        /// Exit code, if the process was not killed by a signal
        exit_code: Option<i32>,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// Command could not be spawned at all
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        /// Full command line
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// dpkg-query output did not have the expected shape
    #[error("unexpected dpkg-query output at line {line}: {content}")]
    Parse {
        /// Line number (1-indexed)
        line: usize,
        /// The offending line
        content: String,
    },
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Locked { .. } => ErrorCategory::Locked,
            Error::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorCategory::AptNotFound
            }
            Error::CommandFailed { stderr, .. } => classify(stderr),
            _ => ErrorCategory::Other,
        }
    }

    /// Whether the failure was classified as "package not found".
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// The command line that failed.
    pub fn command(&self) -> Option<&str> {
        match self {
            Error::NotFound { command, .. }
            | Error::Locked { command, .. }
            | Error::CommandFailed { command, .. }
            | Error::Spawn { command, .. } => Some(command),
            Error::Parse { .. } => None,
        }
    }

    /// Exit code of the failed command, if it ran.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::NotFound { exit_code, .. }
            | Error::Locked { exit_code, .. }
            | Error::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Create an error from apt command output.
    ///
    /// Analyzes stderr to categorize the error. Only the diagnostics listed
    /// here are recognized; everything else stays `CommandFailed`.
    pub fn from_apt_output(command: &str, exit_code: Option<i32>, stderr: &str) -> Self {
        match classify(stderr) {
            ErrorCategory::NotFound => Error::NotFound {
                name: missing_package_name(stderr).unwrap_or_else(|| "unknown".to_string()),
                command: command.to_string(),
                exit_code,
            },
            ErrorCategory::Locked => Error::Locked {
                message: stderr.trim().to_string(),
                command: command.to_string(),
                exit_code,
            },
            _ => Error::CommandFailed {
                command: command.to_string(),
                exit_code,
                stderr: stderr.trim().to_string(),
            },
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

fn classify(stderr: &str) -> ErrorCategory {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("unable to locate package")
        || stderr_lower.contains("has no installation candidate")
        || stderr_lower.contains("couldn't find any package by")
    {
        return ErrorCategory::NotFound;
    }

    if stderr_lower.contains("could not get lock")
        || stderr_lower.contains("unable to acquire the dpkg frontend lock")
    {
        return ErrorCategory::Locked;
    }

    if stderr_lower.contains("temporary failure resolving")
        || stderr_lower.contains("failed to fetch")
        || stderr_lower.contains("could not connect")
        || stderr_lower.contains("connection timed out")
    {
        return ErrorCategory::Network;
    }

    if stderr_lower.contains("permission denied") || stderr_lower.contains("are you root?") {
        return ErrorCategory::Permission;
    }

    ErrorCategory::Other
}

/// Pull the package name out of "E: Unable to locate package foo" /
/// "E: Package 'foo' has no installation candidate".
fn missing_package_name(stderr: &str) -> Option<String> {
    for line in stderr.lines() {
        if let Some(rest) = line.split("Unable to locate package").nth(1) {
            let name = rest.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
        if line.contains("has no installation candidate")
            && let Some(quoted) = line.split('\'').nth(1)
        {
            return Some(quoted.to_string());
        }
    }
    None
}

/// Result type for APT operations.
pub type Result<T> = std::result::Result<T, Error>;
