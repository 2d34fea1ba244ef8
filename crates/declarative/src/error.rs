//! Error types for reconciliation and planning

use thiserror::Error;

/// Failure of the external step inside a creating action.
///
/// Carries the upstream exit code when the step was an external process
/// or transport, so callers can report it verbatim.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StepFailure {
    /// What went wrong
    pub message: String,
    /// Exit code reported by the external step, if any
    pub exit_code: Option<i32>,
}

impl StepFailure {
    /// Create a failure without an exit code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: None,
        }
    }

    /// Attach the exit code of the failing external step
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

impl From<std::io::Error> for StepFailure {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<anyhow::Error> for StepFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

/// Errors raised while reconciling a resource
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The creating action failed; any partial artifact was unwound first
    #[error("failed to create {resource}: {cause}")]
    ResourceCreationFailed {
        resource: String,
        cause: String,
        exit_code: Option<i32>,
    },

    /// The creating action failed and the partial artifact could not be unwound
    #[error("failed to create {resource}: {cause} (cleanup also failed: {cleanup})")]
    UnwindFailed {
        resource: String,
        cause: String,
        cleanup: String,
    },

    /// Removing the resource failed
    #[error("failed to remove {resource}: {source}")]
    RemovalFailed {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    /// Reading the observed state failed
    #[error("failed to inspect {resource}: {source}")]
    ObservationFailed {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    /// Switching a toggle resource on failed
    #[error("failed to enable {resource}: {source}")]
    ToggleFailed {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    /// Restoring a toggle resource to its entry state failed
    #[error("failed to restore {resource}: {source}")]
    RestoreFailed {
        resource: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ReconcileError {
    /// Name of the resource the error concerns
    pub fn resource(&self) -> &str {
        match self {
            Self::ResourceCreationFailed { resource, .. }
            | Self::UnwindFailed { resource, .. }
            | Self::RemovalFailed { resource, .. }
            | Self::ObservationFailed { resource, .. }
            | Self::ToggleFailed { resource, .. }
            | Self::RestoreFailed { resource, .. } => resource,
        }
    }
}

/// Errors raised while resolving user intent into a plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// `--replace` combined with `--install` or `--purge`
    #[error("--replace cannot be combined with --install or --purge")]
    ConflictingIntent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failure_exit_code() {
        let failure = StepFailure::new("download failed").with_exit_code(22);
        assert_eq!(failure.exit_code, Some(22));
        assert_eq!(failure.to_string(), "download failed");
    }

    #[test]
    fn test_step_failure_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let failure = StepFailure::from(io);
        assert!(failure.exit_code.is_none());
        assert!(failure.message.contains("denied"));
    }

    #[test]
    fn test_reconcile_error_resource() {
        let err = ReconcileError::ResourceCreationFailed {
            resource: "signing key".to_string(),
            cause: "boom".to_string(),
            exit_code: Some(6),
        };
        assert_eq!(err.resource(), "signing key");
        assert_eq!(err.to_string(), "failed to create signing key: boom");
    }
}
