//! Execution planner - resolves user intent into ordered phases

use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw intent flags as requested by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentFlags {
    pub install: bool,
    pub purge: bool,
    pub replace: bool,
}

/// Resolved user intent; exactly one per invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Install,
    Purge,
    /// Purge strictly followed by install
    Replace,
}

impl Intent {
    /// Resolve flags into a single intent.
    ///
    /// `replace` together with `install` or `purge` is a conflict. With no
    /// flag at all, or with both `install` and `purge`, the intent is
    /// `Replace`.
    pub fn resolve(flags: IntentFlags) -> Result<Self, PlanError> {
        match flags {
            IntentFlags {
                replace: true,
                install,
                purge,
            } if install || purge => Err(PlanError::ConflictingIntent),
            IntentFlags {
                install: true,
                purge: false,
                replace: false,
            } => Ok(Self::Install),
            IntentFlags {
                install: false,
                purge: true,
                replace: false,
            } => Ok(Self::Purge),
            _ => Ok(Self::Replace),
        }
    }

    /// Phases this intent runs, in order
    pub fn phases(self) -> &'static [Phase] {
        match self {
            Self::Install => &[Phase::Install],
            Self::Purge => &[Phase::Purge],
            Self::Replace => &[Phase::Purge, Phase::Install],
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Install => "install",
            Self::Purge => "purge",
            Self::Replace => "replace",
        };
        f.write_str(label)
    }
}

/// One ordered step of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Purge,
    Install,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purge => f.write_str("purge"),
            Self::Install => f.write_str("install"),
        }
    }
}

/// A validated plan: the resolved intent and its phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub intent: Intent,
    pub phases: Vec<Phase>,
}

impl ExecutionPlan {
    /// Validate flags and build the ordered phase list
    pub fn from_flags(flags: IntentFlags) -> Result<Self, PlanError> {
        let intent = Intent::resolve(flags)?;
        Ok(Self::for_intent(intent))
    }

    /// Build the plan for an already resolved intent
    pub fn for_intent(intent: Intent) -> Self {
        Self {
            intent,
            phases: intent.phases().to_vec(),
        }
    }

    /// Whether the plan runs the given phase
    pub fn includes(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
}
