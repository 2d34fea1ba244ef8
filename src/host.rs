//! Host probes used by preflight checks

use crate::runner;

/// What the orchestrator needs to know about the machine it runs on
pub trait Host {
    /// Effective user is root
    fn is_root(&self) -> bool;

    /// Executable is on PATH
    fn has_tool(&self, name: &str) -> bool;
}

/// The real machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn is_root(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn has_tool(&self, name: &str) -> bool {
        runner::command_exists(name)
    }
}

/// Host with a fixed answer for every probe
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FakeHost {
    pub root: bool,
    pub missing: Vec<&'static str>,
}

#[cfg(test)]
impl FakeHost {
    pub fn root() -> Self {
        Self {
            root: true,
            missing: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Host for FakeHost {
    fn is_root(&self) -> bool {
        self.root
    }

    fn has_tool(&self, name: &str) -> bool {
        !self.missing.contains(&name)
    }
}
