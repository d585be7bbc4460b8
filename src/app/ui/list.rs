use eframe::egui::{self, Color32, RichText, Ui};

use crate::net::Role;

use super::super::ViewModel;

struct DeviceRow {
    id: String,
    label: String,
    disabled: bool,
}

impl ViewModel {
    /// Flat roster of the same devices the graph shows, grouped by role and
    /// narrowed by the shared search box. Selection is shared with the
    /// graph view.
    pub(in crate::app) fn draw_device_list(&mut self, ui: &mut Ui) {
        let matches = self.search_matches();
        let rows_for = |role: Role| {
            self.graph
                .nodes
                .iter()
                .enumerate()
                .filter(|(index, node)| {
                    node.role == role
                        && matches
                            .as_ref()
                            .is_none_or(|matched| matched.contains(index))
                })
                .map(|(_index, node)| DeviceRow {
                    id: node.id.clone(),
                    label: format!("{}  ({})", node.hostname, node.ip),
                    disabled: node.disabled,
                })
                .collect::<Vec<_>>()
        };

        let groups = [
            ("Router", rows_for(Role::Router)),
            ("This device", rows_for(Role::Local)),
            ("Devices", rows_for(Role::Other)),
        ];

        let mut pending_selection = None;
        egui::ScrollArea::vertical()
            .id_salt("device_list_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let mut any_row = false;
                for (title, rows) in &groups {
                    if rows.is_empty() {
                        continue;
                    }
                    any_row = true;

                    ui.label(RichText::new(*title).strong());
                    for row in rows {
                        let is_selected = self.selected.as_deref() == Some(row.id.as_str());
                        let text = if row.disabled {
                            RichText::new(format!("{}  [blocked]", row.label))
                                .color(Color32::from_gray(120))
                        } else {
                            RichText::new(row.label.as_str())
                        };

                        if ui.selectable_label(is_selected, text).clicked() {
                            pending_selection = Some(if is_selected {
                                None
                            } else {
                                Some(row.id.clone())
                            });
                        }
                    }
                    ui.add_space(8.0);
                }

                if !any_row {
                    ui.label("No devices match the current search.");
                }
            });

        if let Some(selection) = pending_selection {
            self.set_selected(selection);
        }
    }
}
