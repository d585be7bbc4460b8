use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align, Color32, Context, Layout};

use crate::net::{self, DeviceGraph};
use crate::util::new_client_id;

use super::super::telemetry::{ProbeTransport, TelemetryManager};
use super::super::{
    ControlOutcome, StatusMessage, TelemetryReadout, ViewMode, ViewModel,
};

const STATUS_LIFETIME: Duration = Duration::from_secs(4);

impl ViewModel {
    pub(in crate::app) fn new(
        graph: DeviceGraph,
        scanner_cmd: String,
        probe_interval: Duration,
    ) -> Self {
        let mut telemetry =
            TelemetryManager::new(ProbeTransport::new(probe_interval), new_client_id());
        telemetry.set_active(true);

        Self {
            graph,
            scanner_cmd,
            view_mode: ViewMode::Graph,
            view_visible: true,
            selected: None,
            search: String::new(),
            graph_dirty: true,
            graph_cache: None,
            telemetry,
            readout: Rc::new(RefCell::new(TelemetryReadout::default())),
            control_rx: None,
            status: None,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        rescan_requested: &mut bool,
        is_rescanning: bool,
    ) {
        if self.telemetry.tick(Instant::now()) {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
        self.poll_control();
        if self.control_rx.is_some() {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
        self.expire_status(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("lantopo");
                    ui.separator();

                    let graph_mode = self.view_mode == ViewMode::Graph;
                    if ui.selectable_label(graph_mode, "Graph").clicked() {
                        self.view_mode = ViewMode::Graph;
                    }
                    if ui.selectable_label(!graph_mode, "List").clicked() {
                        self.view_mode = ViewMode::List;
                    }
                    ui.separator();

                    ui.label("Search:");
                    ui.add(egui::TextEdit::singleline(&mut self.search).desired_width(160.0));

                    if ui.button("Reset layout").clicked() {
                        self.reset_layout();
                    }
                    let rescan_button =
                        ui.add_enabled(!is_rescanning, egui::Button::new("Rescan"));
                    if rescan_button.clicked() {
                        *rescan_requested = true;
                    }
                    if is_rescanning {
                        ui.spinner();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!(
                            "devices: {}  links: {}",
                            self.graph.node_count(),
                            self.graph.links.len()
                        ));
                        if self.telemetry.is_reconnecting() {
                            ui.colored_label(
                                Color32::from_rgb(246, 206, 104),
                                "telemetry: reconnecting...",
                            );
                        }
                        if let Some(status) = &self.status {
                            let color = if status.is_error {
                                Color32::from_rgb(240, 120, 110)
                            } else {
                                Color32::from_rgb(150, 215, 160)
                            };
                            ui.colored_label(color, &status.text);
                        }
                    });
                });
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.view_mode {
            ViewMode::Graph => self.draw_graph(ui),
            ViewMode::List => self.draw_device_list(ui),
        });
    }

    /// Throw away the simulation so the next frame reseeds every position
    /// from scratch.
    fn reset_layout(&mut self) {
        self.graph_cache = None;
        self.graph_dirty = true;
    }

    pub(in crate::app) fn set_status(&mut self, text: String) {
        self.status = Some(StatusMessage {
            text,
            is_error: false,
            shown_at: Instant::now(),
        });
    }

    pub(in crate::app) fn set_error_status(&mut self, text: String) {
        self.status = Some(StatusMessage {
            text,
            is_error: true,
            shown_at: Instant::now(),
        });
    }

    fn expire_status(&mut self, ctx: &Context) {
        let Some(status) = &self.status else {
            return;
        };

        let elapsed = status.shown_at.elapsed();
        if elapsed >= STATUS_LIFETIME {
            self.status = None;
        } else {
            ctx.request_repaint_after(STATUS_LIFETIME - elapsed);
        }
    }

    /// Run the scanner's block/unblock subcommand off the UI thread. One
    /// request at a time; the device's flags flip only once it reports back.
    pub(in crate::app) fn request_device_toggle(&mut self, mac: String, blocked: bool) {
        if self.control_rx.is_some() {
            return;
        }

        let (tx, rx) = mpsc::channel();
        let program = self.scanner_cmd.clone();
        thread::spawn(move || {
            let result =
                net::set_device_blocked(&program, &mac, blocked).map_err(|error| format!("{error:#}"));
            let _ = tx.send(ControlOutcome {
                mac,
                blocked,
                result,
            });
        });
        self.control_rx = Some(rx);
    }

    fn poll_control(&mut self) {
        let Some(rx) = &self.control_rx else {
            return;
        };

        match rx.try_recv() {
            Ok(outcome) => {
                self.control_rx = None;
                self.apply_control_outcome(outcome);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.control_rx = None;
                self.set_error_status("Device control worker disconnected".to_string());
            }
        }
    }

    fn apply_control_outcome(&mut self, outcome: ControlOutcome) {
        if let Err(error) = outcome.result {
            self.set_error_status(format!("Device control failed: {error}"));
            return;
        }

        // The scanner blocks by MAC, so every node sharing it flips together.
        let mut affected = Vec::new();
        for node in &mut self.graph.nodes {
            if node.mac == outcome.mac {
                node.disabled = outcome.blocked;
                affected.push((node.id.clone(), node.ip.clone(), node.hostname.clone()));
            }
        }
        if affected.is_empty() {
            return;
        }

        for (id, _ip, _hostname) in &affected {
            for link in &mut self.graph.links {
                if &link.source == id {
                    link.disabled = outcome.blocked;
                }
            }

            if let Some(cache) = self.graph_cache.as_mut()
                && let Some(&index) = cache.index_by_id.get(id)
            {
                cache.nodes[index].node.disabled = outcome.blocked;
                for link in &mut cache.links {
                    if link.source == index {
                        link.disabled = outcome.blocked;
                    }
                }
            }
        }

        if let Some((_id, ip, _hostname)) = affected
            .iter()
            .find(|(id, _ip, _hostname)| self.selected.as_deref() == Some(id.as_str()))
        {
            if outcome.blocked {
                let ip = ip.clone();
                self.telemetry.stop_monitoring(&ip);
                self.readout.borrow_mut().frame = None;
            } else {
                self.refresh_monitoring();
            }
        }

        let verb = if outcome.blocked { "Disabled" } else { "Enabled" };
        self.set_status(format!("{verb} {}", affected[0].2));
    }
}
