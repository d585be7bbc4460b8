use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn format_latency(time_ms: f64) -> String {
    if time_ms < 1.0 {
        "<1 ms".to_string()
    } else if time_ms < 100.0 {
        format!("{time_ms:.1} ms")
    } else {
        format!("{time_ms:.0} ms")
    }
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Stable client identifier for the telemetry subscription manager. The
/// server keys per-client stream resources on this value, so it must not
/// change for the lifetime of the process.
pub fn new_client_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    format!("lantopo-{}-{nanos:08x}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_formatting() {
        assert_eq!(format_latency(0.4), "<1 ms");
        assert_eq!(format_latency(12.34), "12.3 ms");
        assert_eq!(format_latency(250.7), "251 ms");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x1, y1) = stable_pair("AA:BB:CC:DD:EE:FF");
        let (x2, y2) = stable_pair("AA:BB:CC:DD:EE:FF");
        assert_eq!((x1, y1), (x2, y2));
        assert!((-1.0..=1.0).contains(&x1));
        assert!((-1.0..=1.0).contains(&y1));
    }
}
