//! Drives a target through a validated plan
//!
//! ```text
//! Idle -> Validating -> Purging -> Installing -> Done
//!                    \-> Installing -> Done
//!                    \-> Purging -> Done
//! ```
//!
//! The first error ends the run; no later phase starts.

use declarative::{ExecutionPlan, Phase};
use std::fmt;

use super::preflight;
use super::report::RunReport;
use crate::error::Result;
use crate::host::Host;
use crate::targets::{Environment, Target};
use crate::ui;

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Purging,
    Installing,
    Done,
}

impl RunState {
    /// Whether `self -> next` is a legal step
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Validating)
                | (Self::Validating, Self::Purging | Self::Installing)
                | (Self::Purging, Self::Installing | Self::Done)
                | (Self::Installing, Self::Done)
        )
    }

    fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Purge => Self::Purging,
            Phase::Install => Self::Installing,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Purging => "purging",
            Self::Installing => "installing",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Runs plans against one host
pub struct Orchestrator<'a> {
    host: &'a dyn Host,
    quiet: bool,
    state: RunState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(host: &'a dyn Host, quiet: bool) -> Self {
        Self {
            host,
            quiet,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        log::debug!("{} -> {next}", self.state);
        self.state = next;
    }

    /// Check host preconditions for `target`
    ///
    /// Needs nothing from the host beyond privilege and `PATH`, so it runs
    /// before the distribution is identified.
    pub fn validate(&mut self, target: &dyn Target) -> Result<()> {
        self.advance(RunState::Validating);
        preflight::check(self.host, &target.required_tools())
    }

    /// Run every phase of a validated `plan` in order
    pub fn execute(
        &mut self,
        plan: &ExecutionPlan,
        target: &dyn Target,
        env: &Environment<'_>,
    ) -> Result<RunReport> {
        let name = target.name();
        log::debug!("Running {} for {name}", plan.intent);

        let total = plan.phases.len();
        let mut phases = Vec::with_capacity(total);

        for (index, &phase) in plan.phases.iter().enumerate() {
            self.advance(RunState::for_phase(phase));
            if !self.quiet {
                ui::step(index + 1, total, &format!("{phase} {name}"));
            }

            let report = match phase {
                Phase::Purge => target.purge(env)?,
                Phase::Install => target.install(env)?,
            };
            phases.push(report);
        }

        self.advance(RunState::Done);
        Ok(RunReport {
            target: name,
            intent: plan.intent,
            phases,
        })
    }

    /// Validate, then execute
    #[cfg(test)]
    pub fn run(
        &mut self,
        plan: &ExecutionPlan,
        target: &dyn Target,
        env: &Environment<'_>,
    ) -> Result<RunReport> {
        self.validate(target)?;
        self.execute(plan, target, env)
    }
}
