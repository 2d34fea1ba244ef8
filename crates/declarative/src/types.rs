//! Core types for resource reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed state of a managed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists
    Present { details: Option<String> },
    /// Resource does not exist
    Absent,
}

impl ResourceState {
    /// Shorthand for a present resource without details
    pub fn present() -> Self {
        Self::Present { details: None }
    }

    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Transition emitted by a single reconciliation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Observed state already matched; nothing was touched
    Unchanged,
    /// Resource was created
    Created,
    /// Resource was removed
    Removed,
}

impl Outcome {
    /// Check if the outcome represents a mutation
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unchanged => "unchanged",
            Self::Created => "created",
            Self::Removed => "removed",
        };
        f.write_str(label)
    }
}

/// Tri-state of a capability that is switched on only for the duration of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToggleState {
    /// Entry exists and is active
    Enabled,
    /// Entry exists but is switched off (e.g. commented out)
    Disabled,
    /// No entry exists
    Missing,
}

impl fmt::Display for ToggleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Missing => "missing",
        };
        f.write_str(label)
    }
}
