use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use super::records::{DeviceRecord, parse_scan_output};
use super::scan_cmd::run_scanner;

/// Where device records come from: a live scanner invocation or a cached
/// snapshot file. Snapshot ownership (when it is written, how stale it may
/// be) belongs to the scanner collaborator, not to this crate.
#[derive(Clone, Debug)]
pub enum ScanSource {
    Command(String),
    File(PathBuf),
}

pub fn collect_device_records(source: &ScanSource) -> Result<Vec<DeviceRecord>> {
    let raw = match source {
        ScanSource::Command(program) => run_scanner(program, &["--json"])
            .with_context(|| format!("failed to collect devices via {program}"))?,
        ScanSource::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scan snapshot {}", path.display()))?,
    };

    let records = parse_scan_output(&raw).context("failed to parse scanner output")?;
    info!(count = records.len(), "collected device records");
    Ok(records)
}
