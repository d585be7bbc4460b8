use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// One unit of streamed telemetry. Ephemeral: the manager keeps only the
/// most recent frame per target so a re-selected device paints instantly.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryFrame {
    pub success: bool,
    pub time_ms: Option<f64>,
    pub signal_pct: Option<f32>,
    pub processing: bool,
}

impl TelemetryFrame {
    pub fn processing() -> Self {
        Self {
            success: false,
            time_ms: None,
            signal_pct: None,
            processing: true,
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            time_ms: None,
            signal_pct: None,
            processing: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to open telemetry stream for {addr}: {reason}")]
    Open { addr: String, reason: String },
    #[error("failed to release telemetry subscription for {client_id}: {reason}")]
    Release { client_id: String, reason: String },
}

/// Server-push channel primitive, abstracted from the concrete protocol.
/// A sender-side disconnect observed on the returned receiver is the
/// mid-stream transport error; `close_subscription` is the idempotent
/// best-effort server release keyed by the manager's client identifier.
pub trait TelemetryTransport {
    fn open_stream(
        &mut self,
        target: &str,
        client_id: &str,
    ) -> Result<Receiver<TelemetryFrame>, TelemetryError>;

    fn close_subscription(&mut self, client_id: &str) -> Result<(), TelemetryError>;
}

/// Concrete transport: a background thread per subscription that probes the
/// target with the system `ping` binary and streams the parsed round-trip
/// times. Stop is a shared flag keyed by client id, so a release request
/// for an already-gone subscription is a no-op rather than an error.
pub struct ProbeTransport {
    interval: Duration,
    stops: HashMap<String, Arc<AtomicBool>>,
}

impl ProbeTransport {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stops: HashMap::new(),
        }
    }
}

impl TelemetryTransport for ProbeTransport {
    fn open_stream(
        &mut self,
        target: &str,
        client_id: &str,
    ) -> Result<Receiver<TelemetryFrame>, TelemetryError> {
        // A fresh open for the same client supersedes any previous probe.
        if let Some(stop) = self.stops.remove(client_id) {
            stop.store(true, Ordering::SeqCst);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let addr = target.to_string();
        let interval = self.interval;
        let thread_stop = Arc::clone(&stop);

        thread::Builder::new()
            .name("telemetry-probe".to_string())
            .spawn(move || {
                let _ = tx.send(TelemetryFrame::processing());
                while !thread_stop.load(Ordering::SeqCst) {
                    let frame = probe_once(&addr);
                    if tx.send(frame).is_err() {
                        break;
                    }

                    // Sleep in short slices so a stop takes effect quickly.
                    let mut waited = Duration::ZERO;
                    while waited < interval && !thread_stop.load(Ordering::SeqCst) {
                        let slice = Duration::from_millis(100).min(interval - waited);
                        thread::sleep(slice);
                        waited += slice;
                    }
                }
                debug!(addr = %addr, "telemetry probe finished");
            })
            .map_err(|error| TelemetryError::Open {
                addr: target.to_string(),
                reason: error.to_string(),
            })?;

        self.stops.insert(client_id.to_string(), stop);
        Ok(rx)
    }

    fn close_subscription(&mut self, client_id: &str) -> Result<(), TelemetryError> {
        if let Some(stop) = self.stops.remove(client_id) {
            stop.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn probe_once(addr: &str) -> TelemetryFrame {
    let output = Command::new("ping")
        .args(["-n", "-c", "1", "-W", "1", addr])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            TelemetryFrame {
                success: true,
                time_ms: parse_ping_time(&stdout),
                signal_pct: None,
                processing: false,
            }
        }
        _ => TelemetryFrame::failure(),
    }
}

fn parse_ping_time(stdout: &str) -> Option<f64> {
    let after = stdout.split("time=").nth(1)?;
    let number: String = after
        .chars()
        .take_while(|character| character.is_ascii_digit() || *character == '.')
        .collect();
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::parse_ping_time;

    #[test]
    fn parses_linux_ping_output() {
        let stdout = "64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=3.42 ms";
        assert_eq!(parse_ping_time(stdout), Some(3.42));
    }

    #[test]
    fn parses_time_without_space_before_unit() {
        assert_eq!(parse_ping_time("time=12ms"), Some(12.0));
    }

    #[test]
    fn missing_time_yields_none() {
        assert_eq!(parse_ping_time("Request timeout for icmp_seq 1"), None);
    }
}
