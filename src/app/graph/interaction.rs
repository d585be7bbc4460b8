use eframe::egui::{self, Pos2, Rect, Ui, pos2};

use super::super::physics::{NODE_MARGIN, reheat};
use super::super::render_utils::node_radius;
use super::super::{RenderGraph, RenderNode, ViewModel};

const HIT_SLOP: f32 = 4.0;

pub(super) fn hovered_node(ui: &Ui, nodes: &[RenderNode]) -> Option<usize> {
    let pointer = ui.input(|input| input.pointer.hover_pos())?;

    nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let distance = node.pos.distance(pointer);
            if distance <= node_radius(node.node.role) + HIT_SLOP {
                Some((index, distance))
            } else {
                None
            }
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _distance)| index)
}

fn clamp_to_margins(canvas: Rect, pointer: Pos2) -> Pos2 {
    let min_x = canvas.left() + NODE_MARGIN;
    let max_x = (canvas.right() - NODE_MARGIN).max(min_x);
    let min_y = canvas.top() + NODE_MARGIN;
    let max_y = (canvas.bottom() - NODE_MARGIN).max(min_y);
    pos2(pointer.x.clamp(min_x, max_x), pointer.y.clamp(min_y, max_y))
}

/// Drag-to-pin. The router never drags; everything else follows the pointer
/// (kept inside the canvas margins) and is released on drop with the
/// simulation reheated so neighbors settle around the new spot.
pub(super) fn handle_drag(
    response: &egui::Response,
    canvas: Rect,
    cache: &mut RenderGraph,
    hovered: Option<usize>,
) -> bool {
    if response.drag_started_by(egui::PointerButton::Primary)
        && let Some(index) = hovered
        && Some(index) != cache.router_index
    {
        cache.drag_index = Some(index);
    }

    let Some(index) = cache.drag_index else {
        return false;
    };

    if response.dragged_by(egui::PointerButton::Primary)
        && let Some(pointer) = response.interact_pointer_pos()
    {
        let pinned = clamp_to_margins(canvas, pointer);
        cache.nodes[index].pinned = Some(pinned);
        cache.nodes[index].pos = pinned;
        reheat(cache);
    }

    if response.drag_stopped() {
        cache.nodes[index].pinned = None;
        cache.drag_index = None;
        reheat(cache);
    }

    true
}

impl ViewModel {
    pub(in crate::app) fn apply_graph_selection(&mut self, selected: Option<String>) {
        self.set_selected(selected);
    }
}
