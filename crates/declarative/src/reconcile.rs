//! Idempotent reconciliation of a single resource
//!
//! Every call observes first and mutates at most once. A second call with
//! no external change in between always returns `Outcome::Unchanged`.

use crate::error::ReconcileError;
use crate::resource::ManagedResource;
use crate::types::Outcome;

/// Drive `resource` to present.
///
/// If the creating action fails, the backing location is restored from a
/// checkpoint taken right before the action, then the failure is returned
/// as `ReconcileError::ResourceCreationFailed`.
pub fn ensure_present<R>(resource: &R) -> Result<Outcome, ReconcileError>
where
    R: ManagedResource + ?Sized,
{
    let name = resource.name();

    let observed = resource
        .observe()
        .map_err(|source| ReconcileError::ObservationFailed {
            resource: name.to_string(),
            source,
        })?;

    if observed.is_present() {
        log::info!("{name} already present at {}", resource.location().display());
        return Ok(Outcome::Unchanged);
    }

    let checkpoint = resource
        .checkpoint()
        .map_err(|source| ReconcileError::ObservationFailed {
            resource: name.to_string(),
            source,
        })?;

    if let Err(failure) = resource.create() {
        log::warn!("Creating {name} failed, unwinding: {failure}");

        if let Err(cleanup) = checkpoint.restore() {
            return Err(ReconcileError::UnwindFailed {
                resource: name.to_string(),
                cause: failure.message,
                cleanup: format!("{cleanup:#}"),
            });
        }

        return Err(ReconcileError::ResourceCreationFailed {
            resource: name.to_string(),
            cause: failure.message,
            exit_code: failure.exit_code,
        });
    }

    log::info!("{name} created at {}", resource.location().display());
    Ok(Outcome::Created)
}

/// Drive `resource` to absent.
pub fn ensure_absent<R>(resource: &R) -> Result<Outcome, ReconcileError>
where
    R: ManagedResource + ?Sized,
{
    let name = resource.name();

    let observed = resource
        .observe()
        .map_err(|source| ReconcileError::ObservationFailed {
            resource: name.to_string(),
            source,
        })?;

    if observed.is_absent() {
        log::info!("{name} not found, nothing to remove");
        return Ok(Outcome::Unchanged);
    }

    resource
        .remove()
        .map_err(|source| ReconcileError::RemovalFailed {
            resource: name.to_string(),
            source,
        })?;

    log::info!("{name} removed from {}", resource.location().display());
    Ok(Outcome::Removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepFailure;
    use crate::types::ResourceState;
    use std::cell::Cell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A line inside a shared file, created by appending
    struct LineResource {
        path: PathBuf,
        line: String,
        fail_after_write: bool,
        creates: Cell<usize>,
        removes: Cell<usize>,
    }

    impl LineResource {
        fn new(path: PathBuf, line: &str) -> Self {
            Self {
                path,
                line: line.to_string(),
                fail_after_write: false,
                creates: Cell::new(0),
                removes: Cell::new(0),
            }
        }
    }

    impl ManagedResource for LineResource {
        fn name(&self) -> &str {
            "test entry"
        }

        fn location(&self) -> &Path {
            &self.path
        }

        fn observe(&self) -> anyhow::Result<ResourceState> {
            let content = fs::read_to_string(&self.path).unwrap_or_default();
            if content.lines().any(|l| l.trim() == self.line) {
                Ok(ResourceState::present())
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn create(&self) -> Result<(), StepFailure> {
            self.creates.set(self.creates.get() + 1);
            let mut content = fs::read_to_string(&self.path).unwrap_or_default();
            content.push_str(&self.line);
            content.push('\n');
            fs::write(&self.path, content)?;
            if self.fail_after_write {
                return Err(StepFailure::new("simulated transport failure").with_exit_code(22));
            }
            Ok(())
        }

        fn remove(&self) -> anyhow::Result<()> {
            self.removes.set(self.removes.get() + 1);
            let content = fs::read_to_string(&self.path)?;
            let kept: String = content
                .lines()
                .filter(|l| l.trim() != self.line)
                .map(|l| format!("{l}\n"))
                .collect();
            fs::write(&self.path, kept)?;
            Ok(())
        }
    }

    fn hash(path: &Path) -> blake3::Hash {
        blake3::hash(&fs::read(path).unwrap_or_default())
    }

    #[test]
    fn test_ensure_present_creates_then_unchanged() {
        let dir = TempDir::new().unwrap();
        let resource = LineResource::new(dir.path().join("list"), "deb http://a b c");

        assert_eq!(ensure_present(&resource).unwrap(), Outcome::Created);
        let before = hash(&resource.path);

        assert_eq!(ensure_present(&resource).unwrap(), Outcome::Unchanged);
        assert_eq!(hash(&resource.path), before);
        assert_eq!(resource.creates.get(), 1);
    }

    #[test]
    fn test_ensure_absent_removes_then_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list");
        fs::write(&path, "deb http://keep x y\ndeb http://a b c\n").unwrap();
        let resource = LineResource::new(path.clone(), "deb http://a b c");

        assert_eq!(ensure_absent(&resource).unwrap(), Outcome::Removed);
        let before = hash(&path);

        assert_eq!(ensure_absent(&resource).unwrap(), Outcome::Unchanged);
        assert_eq!(hash(&path), before);
        assert_eq!(resource.removes.get(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "deb http://keep x y\n");
    }

    #[test]
    fn test_failed_create_unwinds_partial_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list");
        fs::write(&path, "deb http://keep x y\n").unwrap();
        let before = hash(&path);

        let mut resource = LineResource::new(path.clone(), "deb http://a b c");
        resource.fail_after_write = true;

        let err = ensure_present(&resource).unwrap_err();
        match err {
            ReconcileError::ResourceCreationFailed {
                resource, exit_code, ..
            } => {
                assert_eq!(resource, "test entry");
                assert_eq!(exit_code, Some(22));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hash(&path), before);
    }

    #[test]
    fn test_failed_create_removes_file_that_did_not_exist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list");
        let mut resource = LineResource::new(path.clone(), "deb http://a b c");
        resource.fail_after_write = true;

        assert!(ensure_present(&resource).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_ensure_absent_on_missing_file_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let resource = LineResource::new(dir.path().join("list"), "deb http://a b c");
        assert_eq!(ensure_absent(&resource).unwrap(), Outcome::Unchanged);
        assert_eq!(resource.removes.get(), 0);
    }
}
