use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{self, Context, Pos2, Vec2};

use crate::net::{DeviceGraph, DeviceNode, ScanSource, build_device_graph, collect_device_records};

mod graph;
mod physics;
mod render_utils;
mod telemetry;
mod ui;

use telemetry::{ProbeTransport, TelemetryFrame, TelemetryManager};

pub struct AppConfig {
    pub scan_source: ScanSource,
    pub scanner_cmd: String,
    pub probe_interval: Duration,
}

pub struct TopologyApp {
    config: AppConfig,
    state: AppState,
    rescan_rx: Option<Receiver<Result<DeviceGraph, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<DeviceGraph, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    Graph,
    List,
}

struct ViewModel {
    graph: DeviceGraph,
    scanner_cmd: String,
    view_mode: ViewMode,
    view_visible: bool,
    selected: Option<String>,
    search: String,
    graph_dirty: bool,
    graph_cache: Option<RenderGraph>,
    telemetry: TelemetryManager<ProbeTransport>,
    readout: Rc<RefCell<TelemetryReadout>>,
    control_rx: Option<Receiver<ControlOutcome>>,
    status: Option<StatusMessage>,
}

/// Shared slot the telemetry callback writes into; the details panel reads
/// it every frame. Cleared whenever the selection changes.
#[derive(Default)]
struct TelemetryReadout {
    frame: Option<TelemetryFrame>,
}

struct StatusMessage {
    text: String,
    is_error: bool,
    shown_at: Instant,
}

struct ControlOutcome {
    mac: String,
    blocked: bool,
    result: Result<(), String>,
}

/// Per-load simulation state. Rebuilt from scratch whenever the device list
/// changes: the node set is fully replaced, never incrementally patched.
struct RenderGraph {
    nodes: Vec<RenderNode>,
    links: Vec<RenderLink>,
    index_by_id: HashMap<String, usize>,
    router_index: Option<usize>,
    alpha: f32,
    drag_index: Option<usize>,
    physics_scratch: PhysicsScratch,
}

struct RenderNode {
    /// Identity fields; the simulation only ever touches positions.
    node: DeviceNode,
    pos: Pos2,
    velocity: Vec2,
    /// Drag pin. The router pin is not stored here; it is reapplied from
    /// the canvas center every tick.
    pinned: Option<Pos2>,
}

struct RenderLink {
    source: usize,
    target: usize,
    disabled: bool,
}

struct PhysicsScratch {
    forces: Vec<Vec2>,
}

#[derive(Clone, Copy)]
struct PhysicsConfig {
    link_distance: f32,
    link_strength: f32,
    charge_strength: f32,
    collision_radius: f32,
    center_pull: f32,
    delta_seconds: f32,
}

impl PhysicsConfig {
    fn for_frame(delta_seconds: f32) -> Self {
        Self {
            link_distance: 80.0,
            link_strength: 0.7,
            charge_strength: 250.0,
            collision_radius: 25.0,
            center_pull: 0.05,
            delta_seconds,
        }
    }
}

impl TopologyApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let state = Self::start_load(config.scan_source.clone());
        Self {
            config,
            state,
            rescan_rx: None,
        }
    }

    fn spawn_load(source: ScanSource) -> Receiver<Result<DeviceGraph, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = collect_device_records(&source)
                .map(|records| build_device_graph(&records))
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: ScanSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }
}

impl eframe::App for TopologyApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(graph) => AppState::Ready(Box::new(ViewModel::new(
                            graph,
                            self.config.scanner_cmd.clone(),
                            self.config.probe_interval,
                        ))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Scanning the local network...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to collect network devices");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.config.scan_source.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let minimized =
                    ctx.input(|input| input.viewport().minimized.unwrap_or(false));
                model.set_view_visible(!minimized);

                let mut rescan_requested = false;
                let is_rescanning = self.rescan_rx.is_some();
                model.show(ctx, &mut rescan_requested, is_rescanning);

                if rescan_requested && self.rescan_rx.is_none() {
                    self.rescan_rx = Some(Self::spawn_load(self.config.scan_source.clone()));
                }

                if let Some(rx) = self.rescan_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(graph)) => model.replace_graph(graph),
                        Ok(Err(error)) => {
                            model.set_error_status(format!("Rescan failed: {error}"));
                        }
                        Err(TryRecvError::Empty) => {
                            self.rescan_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.set_error_status(
                                "Background scan worker disconnected".to_string(),
                            );
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.rescan_rx = None;
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn node_by_id(&self, id: &str) -> Option<&DeviceNode> {
        self.graph.nodes.iter().find(|node| node.id == id)
    }

    fn selected_node(&self) -> Option<&DeviceNode> {
        self.selected.as_deref().and_then(|id| self.node_by_id(id))
    }

    fn monitor_callback(&self) -> telemetry::FrameCallback {
        let readout = Rc::clone(&self.readout);
        Box::new(move |frame: &TelemetryFrame| {
            readout.borrow_mut().frame = Some(frame.clone());
        })
    }

    /// (Re)start live monitoring for the current selection, if it is an
    /// enabled device with a resolvable address.
    pub(in crate::app) fn refresh_monitoring(&mut self) {
        let Some(node) = self.selected_node() else {
            return;
        };
        if node.disabled || node.ip == crate::net::UNKNOWN {
            return;
        }

        let target = node.ip.clone();
        let callback = self.monitor_callback();
        self.telemetry.monitor(&target, callback);
    }

    pub(in crate::app) fn set_view_visible(&mut self, visible: bool) {
        if self.view_visible == visible {
            return;
        }

        self.view_visible = visible;
        self.telemetry.set_active(visible);
        if visible {
            self.refresh_monitoring();
        }
    }

    pub(in crate::app) fn set_selected(&mut self, selection: Option<String>) {
        if self.selected == selection {
            return;
        }

        if let Some(previous) = self.selected.take() {
            if let Some(ip) = self.node_by_id(&previous).map(|node| node.ip.clone()) {
                self.telemetry.stop_monitoring(&ip);
            }
        }

        self.selected = selection;
        self.readout.borrow_mut().frame = None;
        self.refresh_monitoring();
    }

    /// Replace the whole device graph with a fresh scan result. The
    /// simulation restarts cold; selection survives only if the same node
    /// id is present in the new set.
    pub(in crate::app) fn replace_graph(&mut self, graph: DeviceGraph) {
        self.graph = graph;
        self.graph_cache = None;
        self.graph_dirty = true;

        let selected_still_exists = self
            .selected
            .as_deref()
            .is_some_and(|id| self.graph.nodes.iter().any(|node| node.id == id));
        if selected_still_exists {
            // The address behind the id may have changed; monitor() handles
            // the switch, or cheaply re-registers if it did not.
            self.refresh_monitoring();
        } else {
            self.set_selected(None);
        }

        self.set_status("Scan complete".to_string());
    }
}
