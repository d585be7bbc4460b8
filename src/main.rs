mod app;
mod net;
mod util;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use net::ScanSource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Scanner binary used for discovery and block/unblock control.
    #[arg(long, default_value = "lanscan")]
    scanner_cmd: String,

    /// Read scan results from a JSON file instead of running the scanner.
    #[arg(long)]
    scan_file: Option<PathBuf>,

    /// Seconds between latency probes for the monitored device.
    #[arg(long, default_value_t = 2)]
    probe_interval_secs: u64,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let scan_source = match args.scan_file {
        Some(path) => ScanSource::File(path),
        None => ScanSource::Command(args.scanner_cmd.clone()),
    };
    let config = app::AppConfig {
        scan_source,
        scanner_cmd: args.scanner_cmd,
        probe_interval: Duration::from_secs(args.probe_interval_secs.max(1)),
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 840.0]),
        ..Default::default()
    };

    eframe::run_native(
        "lantopo",
        options,
        Box::new(move |cc| Ok(Box::new(app::TopologyApp::new(cc, config)))),
    )
}
