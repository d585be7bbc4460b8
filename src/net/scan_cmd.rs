use std::process::Command;

use anyhow::{Context, Result, anyhow};

pub(super) fn run_scanner(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to spawn {program} with args: {args:?}"))?;

    if output.status.success() {
        String::from_utf8(output.stdout).context("scanner output was not valid UTF-8")
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(anyhow!("{program} failed for args {args:?}: {stderr}"))
    }
}
