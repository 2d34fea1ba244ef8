//! Temporarily enabled resources
//!
//! Some capabilities (e.g. access to source packages) should only be
//! switched on while a single operation runs. [`toggle_temporarily`]
//! captures the entry [`ToggleState`], enables the resource if needed and
//! returns a guard. The guard restores the entry state exactly once: either
//! through [`TemporaryToggle::restore`] or, on any other exit path, when it
//! is dropped.

use crate::error::ReconcileError;
use crate::types::ToggleState;
use anyhow::Result;

/// A resource with three observable states that can be switched on and back
pub trait ToggleResource {
    /// Whatever the resource needs to remember to undo its own `enable`
    type Undo;

    /// Human-readable name (e.g. "source-package repository")
    fn name(&self) -> &str;

    /// Read the current state from the system
    fn observe(&self) -> Result<ToggleState>;

    /// Switch the resource on from `from` (`Disabled` or `Missing`)
    fn enable(&self, from: ToggleState) -> Result<Self::Undo>;

    /// Perform the inverse of the recorded `enable`
    fn restore(&self, undo: Self::Undo) -> Result<()>;
}

/// Guard over a temporarily enabled resource
///
/// Dropping the guard without calling [`restore`](Self::restore) still
/// restores the resource; failures on that path can only be logged.
#[must_use = "dropping the guard immediately restores the resource"]
pub struct TemporaryToggle<'a, R: ToggleResource> {
    resource: &'a R,
    entry: ToggleState,
    undo: Option<R::Undo>,
}

impl<R: ToggleResource> std::fmt::Debug for TemporaryToggle<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryToggle")
            .field("resource", &self.resource.name())
            .field("entry", &self.entry)
            .field("pending_restore", &self.undo.is_some())
            .finish()
    }
}

/// Enable `resource` until the returned guard is restored or dropped
pub fn toggle_temporarily<R: ToggleResource>(
    resource: &R,
) -> Result<TemporaryToggle<'_, R>, ReconcileError> {
    let name = resource.name();

    let entry = resource
        .observe()
        .map_err(|source| ReconcileError::ObservationFailed {
            resource: name.to_string(),
            source,
        })?;

    let undo = match entry {
        ToggleState::Enabled => {
            log::info!("{name} already enabled, leaving it as is");
            None
        }
        ToggleState::Disabled | ToggleState::Missing => {
            let undo = resource
                .enable(entry)
                .map_err(|source| ReconcileError::ToggleFailed {
                    resource: name.to_string(),
                    source,
                })?;
            log::info!("{name} temporarily enabled (was {entry})");
            Some(undo)
        }
    };

    Ok(TemporaryToggle {
        resource,
        entry,
        undo,
    })
}

impl<R: ToggleResource> TemporaryToggle<'_, R> {
    /// State observed before the toggle was acquired
    pub fn entry_state(&self) -> ToggleState {
        self.entry
    }

    /// Restore the entry state, surfacing any failure
    pub fn restore(mut self) -> Result<(), ReconcileError> {
        self.restore_once()
    }

    fn restore_once(&mut self) -> Result<(), ReconcileError> {
        let Some(undo) = self.undo.take() else {
            return Ok(());
        };

        let name = self.resource.name();
        self.resource
            .restore(undo)
            .map_err(|source| ReconcileError::RestoreFailed {
                resource: name.to_string(),
                source,
            })?;

        log::info!("{name} restored to {}", self.entry);
        Ok(())
    }
}

impl<R: ToggleResource> Drop for TemporaryToggle<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_once() {
            log::error!("{e:#}");
        }
    }
}

/// Run `work` with `resource` enabled, restoring it afterwards on every path.
///
/// If `work` fails, its error wins and a restore failure is only logged.
pub fn with_toggle<R, T, E, F>(resource: &R, work: F) -> Result<T, E>
where
    R: ToggleResource,
    E: From<ReconcileError>,
    F: FnOnce() -> Result<T, E>,
{
    let guard = toggle_temporarily(resource)?;

    match work() {
        Ok(value) => {
            guard.restore()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(restore_err) = guard.restore() {
                log::error!("{restore_err:#}");
            }
            Err(err)
        }
    }
}
