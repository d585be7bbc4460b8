use anyhow::{Context, Result};
use tracing::info;

use super::scan_cmd::run_scanner;

/// Ask the scanner collaborator to block or unblock a device on the
/// network. Callers only flip local state after this returns Ok.
pub fn set_device_blocked(program: &str, mac: &str, blocked: bool) -> Result<()> {
    let action = if blocked { "block" } else { "unblock" };
    run_scanner(program, &[action, mac])
        .with_context(|| format!("failed to {action} device {mac}"))?;
    info!(mac, action, "device control applied");
    Ok(())
}
