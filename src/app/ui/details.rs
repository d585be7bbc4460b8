use eframe::egui::{Color32, RichText, Ui};

use crate::net::{Role, UNKNOWN};
use crate::util::format_latency;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Device details");
        ui.add_space(6.0);

        let Some(node) = self.selected_node() else {
            ui.label("Select a device from the graph or the list.");
            return;
        };

        let hostname = node.hostname.clone();
        let ip = node.ip.clone();
        let mac = node.mac.clone();
        let vendor = node.vendor.clone();
        let role = node.role;
        let disabled = node.disabled;

        ui.label(RichText::new(&hostname).strong());
        ui.small(role.label());
        ui.add_space(6.0);

        ui.label(format!("IP address: {ip}"));
        ui.label(format!("MAC address: {mac}"));
        ui.label(format!("Vendor: {vendor}"));
        if disabled {
            ui.colored_label(Color32::from_rgb(240, 120, 110), "Network access: blocked");
        } else {
            ui.label("Network access: allowed");
        }

        ui.separator();
        ui.label(RichText::new("Live telemetry").strong());
        if disabled {
            ui.label("Monitoring is paused while the device is blocked.");
        } else if ip == UNKNOWN {
            ui.label("No address to probe for this device.");
        } else {
            self.draw_telemetry_readout(ui);
        }

        ui.separator();
        let can_toggle = role != Role::Router && mac != UNKNOWN;
        let control_pending = self.control_rx.is_some();
        let toggle_label = if disabled {
            "Enable device"
        } else {
            "Disable device"
        };
        ui.horizontal(|ui| {
            let button = ui.add_enabled(
                can_toggle && !control_pending,
                eframe::egui::Button::new(toggle_label),
            );
            if control_pending {
                ui.spinner();
            }
            if button.clicked() {
                self.request_device_toggle(mac.clone(), !disabled);
            }
        });
        if role == Role::Router {
            ui.small("The router cannot be blocked from here.");
        }
    }

    fn draw_telemetry_readout(&mut self, ui: &mut Ui) {
        let frame = self.readout.borrow().frame.clone();

        match frame {
            None => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Waiting for the first probe...");
                });
            }
            Some(frame) if frame.processing => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Subscribing...");
                });
            }
            Some(frame) if frame.success => {
                match frame.time_ms {
                    Some(time_ms) => ui.label(format!("Latency: {}", format_latency(time_ms))),
                    None => ui.label("Latency: n/a"),
                };
                if let Some(signal) = frame.signal_pct {
                    ui.label(format!("Signal: {signal:.0}%"));
                }
            }
            Some(_) => {
                ui.colored_label(
                    Color32::from_rgb(240, 120, 110),
                    "Probe failed; the device may be unreachable.",
                );
            }
        }

        if self.telemetry.is_reconnecting() {
            ui.colored_label(
                Color32::from_rgb(246, 206, 104),
                "Stream lost; reconnecting...",
            );
        }
    }
}
