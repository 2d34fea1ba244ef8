//! # Declarative
//!
//! Idempotent reconciliation of external resources.
//!
//! This crate provides the core abstractions for observing a resource,
//! converging it to a desired state exactly once, and never leaving it
//! half-modified.
//!
//! ## Core Concepts
//!
//! - **ManagedResource**: a file-backed artifact that can be observed, created and removed
//! - **Outcome**: the transition a reconciliation call produced (`Unchanged`, `Created`, `Removed`)
//! - **Checkpoint**: a byte-exact snapshot used to unwind a failed creating action
//! - **ToggleResource**: a tri-state resource enabled only for the duration of an operation
//! - **ExecutionPlan**: the ordered phases a resolved [`Intent`] runs
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ensure_present, ensure_absent, Outcome};
//!
//! let key = SigningKey::new(url, path, &transport);
//! assert_eq!(ensure_present(&key)?, Outcome::Created);
//! assert_eq!(ensure_present(&key)?, Outcome::Unchanged);
//! assert_eq!(ensure_absent(&key)?, Outcome::Removed);
//! ```
//!
//! ## Temporary toggles
//!
//! ```ignore
//! use declarative::with_toggle;
//!
//! // deb-src is enabled only while build-dep runs, then put back exactly
//! with_toggle(&source_packages, || backend.build_dep("python3"))?;
//! ```

pub mod error;
pub mod planner;
pub mod reconcile;
pub mod resource;
pub mod toggle;
pub mod types;

// Re-export main types at crate root
pub use error::{PlanError, ReconcileError, StepFailure};
pub use planner::{ExecutionPlan, Intent, IntentFlags, Phase};
pub use reconcile::{ensure_absent, ensure_present};
pub use resource::{Checkpoint, ManagedResource};
pub use toggle::{TemporaryToggle, ToggleResource, toggle_temporarily, with_toggle};
pub use types::{Outcome, ResourceState, ToggleState};
