use anyhow::{Context, Result};
use std::process::Command;

/// Run a command and capture trimmed stdout
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    log::debug!("Running: {} {}", cmd, args.join(" "));

    let output = Command::new(cmd)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}", stderr.trim())
    }
}

/// Check if a command exists on PATH
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}
