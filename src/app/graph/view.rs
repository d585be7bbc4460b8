use std::collections::HashSet;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Shape, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::super::physics::step_physics;
use super::super::render_utils::{
    blend_color, dim_color, draw_background, draw_legend, node_radius, role_color,
};
use super::super::{PhysicsConfig, ViewModel};
use super::interaction::{handle_drag, hovered_node};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    /// Indices (shared between the device graph and the simulation, which
    /// preserve ordering) of nodes matching the current search query.
    pub(in crate::app) fn search_matches(&self) -> Option<HashSet<usize>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let haystack =
                    format!("{} {} {} {}", node.hostname, node.ip, node.mac, node.vendor);
                fuzzy_match_score(&matcher, &haystack, query).map(|_score| index)
            })
            .collect::<HashSet<_>>();
        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);

        if self.graph_dirty || self.graph_cache.is_none() {
            self.rebuild_render_graph(rect);
        }

        let search_matches = self.search_matches();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let selected_id = self.selected.clone();
        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        let config = PhysicsConfig::for_frame(frame_delta_seconds);

        let Some(cache) = self.graph_cache.as_mut() else {
            return;
        };

        let hovered = hovered_node(ui, &cache.nodes);
        let interaction_active = handle_drag(&response, rect, cache, hovered);
        let physics_moving = step_physics(cache, rect, config);
        if physics_moving || interaction_active {
            ui.ctx().request_repaint();
        }

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pending_selection = if response.clicked_by(egui::PointerButton::Primary) {
            Some(hovered.and_then(|index| cache.nodes.get(index).map(|node| node.node.id.clone())))
        } else {
            None
        };

        for link in &cache.links {
            let start = cache.nodes[link.source].pos;
            let end = cache.nodes[link.target].pos;
            let touches_selection = selected_id.as_deref().is_some_and(|id| {
                cache.nodes[link.source].node.id == id || cache.nodes[link.target].node.id == id
            });

            let (width, color) = if touches_selection {
                (2.2, Color32::from_rgb(241, 146, 94))
            } else if link.disabled {
                (1.0, Color32::from_rgba_unmultiplied(110, 80, 80, 150))
            } else {
                (1.4, Color32::from_rgba_unmultiplied(96, 104, 112, 200))
            };
            let stroke = Stroke::new(width, color);

            if link.disabled {
                painter.extend(Shape::dashed_line(&[start, end], stroke, 6.0, 5.0));
            } else {
                painter.line_segment([start, end], stroke);
            }
        }

        let selected_color = Color32::from_rgb(241, 146, 94);
        let mut selection_animating = false;

        for (index, render_node) in cache.nodes.iter().enumerate() {
            let node = &render_node.node;
            let position = render_node.pos;
            let radius = node_radius(node.role);

            let is_hovered = hovered == Some(index);
            let is_selected = selected_id.as_deref() == Some(node.id.as_str());
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));

            let base_color = role_color(node.role);
            let unselected_color = if node.disabled {
                dim_color(base_color, 0.35)
            } else if is_hovered {
                blend_color(base_color, Color32::WHITE, 0.25)
            } else if is_search_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.5)
            } else if search_active {
                dim_color(base_color, 0.45)
            } else {
                base_color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", node.id.as_str())),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }

            let color = blend_color(unselected_color, selected_color, selection_mix);
            painter.circle_filled(position, radius, color);
            if selection_mix > 0.0 {
                let halo_strength = (selection_mix * (1.0 - selection_mix) * 4.0).clamp(0.0, 1.0);
                let halo_alpha = (30.0 + (halo_strength * 145.0)) as u8;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.0 + (halo_strength * 1.6),
                        Color32::from_rgba_unmultiplied(241, 146, 94, halo_alpha),
                    ),
                );
            }
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(
                    1.0 + (selection_mix * 1.2),
                    Color32::from_rgba_unmultiplied(15, 15, 15, 190),
                ),
            );

            let label_color = if node.disabled {
                Color32::from_gray(120)
            } else {
                Color32::from_gray(238)
            };
            painter.text(
                position + vec2(0.0, radius + 4.0),
                Align2::CENTER_TOP,
                &node.hostname,
                FontId::proportional(12.0),
                label_color,
            );
            if is_selected || is_hovered {
                painter.text(
                    position + vec2(0.0, radius + 19.0),
                    Align2::CENTER_TOP,
                    &node.ip,
                    FontId::proportional(10.0),
                    Color32::from_gray(170),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        draw_legend(&painter, rect);

        if let Some(index) = hovered {
            let node = &cache.nodes[index].node;
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!("{}  |  {}  |  {}", node.hostname, node.ip, node.role.label()),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if let Some(selected) = pending_selection {
            self.apply_graph_selection(selected);
        }
    }
}
