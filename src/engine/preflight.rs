//! Preconditions checked before any phase runs

use crate::error::{ProvisionError, Result};
use crate::host::Host;

/// Every tool must be on PATH and the effective user must be root.
///
/// Missing tools are reported together, before privilege is considered.
pub fn check(host: &dyn Host, tools: &[&str]) -> Result<()> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|tool| !host.has_tool(tool))
        .map(ToString::to_string)
        .collect();

    if !missing.is_empty() {
        return Err(ProvisionError::MissingTool { tools: missing });
    }

    if !host.is_root() {
        return Err(ProvisionError::InsufficientPrivilege);
    }

    log::debug!("Preflight passed: {}", tools.join(", "));
    Ok(())
}
