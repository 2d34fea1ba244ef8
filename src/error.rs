//! Error taxonomy and process exit codes

use declarative::{PlanError, ReconcileError};
use thiserror::Error;
use toolchain::NoCompatibleVersion;

/// Everything that can abort a provisioning run
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Invalid flag combination
    #[error(transparent)]
    Usage(#[from] PlanError),

    /// Required executables are not installed
    #[error("missing required tools: {}", .tools.join(", "))]
    MissingTool { tools: Vec<String> },

    /// Not running as root
    #[error("this command must be run as root (try sudo)")]
    InsufficientPrivilege,

    /// A package manager or build command exited non-zero
    #[error("`{command}` failed{}: {message}", exit_suffix(.exit_code))]
    ExternalCommandFailed {
        command: String,
        exit_code: Option<i32>,
        message: String,
        hint: Option<&'static str>,
    },

    /// Fetching a remote artifact failed; `exit_code` is the transport's own
    #[error("{resource}: {cause}")]
    Transport {
        resource: String,
        cause: String,
        exit_code: i32,
    },

    /// A resource could not be reconciled
    #[error(transparent)]
    Reconcile(ReconcileError),

    /// No toolchain pairing is possible
    #[error(transparent)]
    NoCompatibleVersion(#[from] NoCompatibleVersion),

    /// Nothing in the package index matched a version probe
    #[error("no package matching {probe}<N> is available")]
    NoVersionAvailable { probe: String },

    /// Configuration or any other internal failure
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with exit code {c}"))
        .unwrap_or_default()
}

impl ProvisionError {
    /// Process exit code for this failure category
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::MissingTool { .. } => 3,
            Self::InsufficientPrivilege => 4,
            Self::ExternalCommandFailed { .. } => 5,
            Self::Transport { .. } => 6,
            Self::Reconcile(_) => 7,
            Self::NoCompatibleVersion(_) | Self::NoVersionAvailable { .. } => 8,
            Self::Other(_) => 1,
        }
    }

    /// Short hint shown under the error message
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::MissingTool { .. } => Some("Install the listed tools with apt-get and re-run"),
            Self::InsufficientPrivilege => Some("Re-run the same command with sudo"),
            Self::Usage(_) => Some("Use at most one of --install/--purge, or --replace alone"),
            Self::NoCompatibleVersion(_) => {
                Some("Adjust compatible_compilers in the [python] section of the config")
            }
            Self::Transport { .. } => Some("Check network access and the URL in the config"),
            Self::ExternalCommandFailed { hint, .. } => *hint,
            _ => None,
        }
    }
}

/// Creating actions only report an exit code when a download failed
impl From<ReconcileError> for ProvisionError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::ResourceCreationFailed {
                resource,
                cause,
                exit_code: Some(exit_code),
            } => Self::Transport {
                resource,
                cause,
                exit_code,
            },
            other => Self::Reconcile(other),
        }
    }
}

impl From<aptkit::Error> for ProvisionError {
    fn from(err: aptkit::Error) -> Self {
        Self::ExternalCommandFailed {
            command: err.command().unwrap_or("dpkg-query").to_string(),
            exit_code: err.exit_code(),
            message: match &err {
                aptkit::Error::CommandFailed { stderr, .. } => last_line(stderr),
                other => other.to_string(),
            },
            hint: err.category().advice(),
        }
    }
}

impl From<toolchain::Error> for ProvisionError {
    fn from(err: toolchain::Error) -> Self {
        match err {
            toolchain::Error::Transport(e) => Self::Transport {
                resource: "download".to_string(),
                exit_code: e.exit_code,
                cause: e.to_string(),
            },
            toolchain::Error::NoCompatibleVersion(e) => Self::NoCompatibleVersion(e),
            toolchain::Error::BuildFailed {
                step,
                command,
                exit_code,
            } => Self::ExternalCommandFailed {
                command,
                exit_code,
                message: format!("{step} step failed"),
                hint: Some("Re-run with -vv to see the build output"),
            },
            toolchain::Error::ToolNotFound(tool) => Self::MissingTool { tools: vec![tool] },
            other => Self::Other(other.into()),
        }
    }
}

/// apt prints its real complaint last
fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no diagnostic output")
        .to_string()
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
