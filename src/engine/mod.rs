//! Provisioning engine for debrig
//!
//! The engine:
//! 1. Validates preconditions (tools on PATH, root)
//! 2. Runs the plan's phases in order against one target
//! 3. Reports what each phase changed

pub mod orchestrator;
pub mod preflight;
pub mod report;

pub use orchestrator::{Orchestrator, RunState};
pub use report::{PhaseReport, RunReport};
