use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

/// One device as reported by the scanner collaborator. Every field may be
/// absent in practice; missing identity fields degrade to `"Unknown"`
/// placeholders at graph-build time instead of failing the load.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub is_gateway: bool,
    #[serde(default)]
    pub is_local: bool,
}

pub(super) fn parse_scan_output(raw: &str) -> Result<Vec<DeviceRecord>> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON from scanner")?;

    // Scanners emit either a bare array or a `{"devices": [...]}` envelope.
    let entries = match &parsed {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(object) => object
            .get("devices")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("scanner JSON object has no devices array"))?,
        _ => return Err(anyhow!("unexpected JSON type from scanner")),
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Ok(record) = DeviceRecord::deserialize(entry) {
            records.push(record);
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::parse_scan_output;

    #[test]
    fn parses_bare_array() {
        let raw = r#"[{"ip":"192.168.1.1","mac":"AA:AA:AA:AA:AA:AA","is_gateway":true}]"#;
        let records = parse_scan_output(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ip.as_deref(), Some("192.168.1.1"));
        assert!(records[0].is_gateway);
        assert!(!records[0].is_local);
    }

    #[test]
    fn parses_devices_envelope_with_partial_fields() {
        let raw = r#"{"devices":[{"ip":"10.0.0.5"},{"mac":"BB:BB:BB:BB:BB:BB","hostname":"nas"}]}"#;
        let records = parse_scan_output(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].mac.is_none());
        assert_eq!(records[1].hostname.as_deref(), Some("nas"));
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_scan_output("not json").is_err());
    }

    #[test]
    fn skips_malformed_entries() {
        let raw = r#"[{"ip":"10.0.0.1"}, 42, {"ip":"10.0.0.2"}]"#;
        let records = parse_scan_output(raw).unwrap();
        assert_eq!(records.len(), 2);
    }
}
