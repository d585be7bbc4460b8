use std::collections::HashMap;

use eframe::egui::{Rect, Vec2, vec2};

use crate::net::Role;
use crate::util::stable_pair;

use super::super::{PhysicsScratch, RenderGraph, RenderLink, RenderNode, ViewModel};

fn seed_direction(id: &str, index: usize) -> Vec2 {
    let (jx, jy) = stable_pair(id);
    let direction = vec2(jx, jy);
    if direction.length_sq() <= 0.0001 {
        let angle = ((index as f32) * 0.618_034 + 0.11) * std::f32::consts::TAU;
        vec2(angle.cos(), angle.sin())
    } else {
        direction.normalized()
    }
}

impl ViewModel {
    /// Build the simulation state for the current device graph. Initial
    /// positions are seeded from a hash of each node id, so the same scan
    /// always unfolds into the same arrangement.
    pub(in crate::app) fn rebuild_render_graph(&mut self, canvas: Rect) {
        let center = canvas.center();
        let spread = (canvas.width().min(canvas.height()) * 0.35).max(40.0);

        let mut index_by_id = HashMap::with_capacity(self.graph.nodes.len());
        let nodes = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                index_by_id.insert(node.id.clone(), index);
                let pos = if node.role == Role::Router {
                    center
                } else {
                    center + seed_direction(&node.id, index) * spread
                };
                RenderNode {
                    node: node.clone(),
                    pos,
                    velocity: Vec2::ZERO,
                    pinned: None,
                }
            })
            .collect::<Vec<_>>();

        let mut links = self
            .graph
            .links
            .iter()
            .filter_map(|link| {
                let source = *index_by_id.get(&link.source)?;
                let target = *index_by_id.get(&link.target)?;
                if source == target {
                    return None;
                }
                Some(RenderLink {
                    source,
                    target,
                    disabled: link.disabled,
                })
            })
            .collect::<Vec<_>>();
        links.sort_unstable_by_key(|link| (link.source, link.target));
        links.dedup_by_key(|link| (link.source, link.target));

        let router_index = self
            .graph
            .router()
            .and_then(|router| index_by_id.get(&router.id).copied());

        self.graph_cache = Some(RenderGraph {
            nodes,
            links,
            index_by_id,
            router_index,
            alpha: 1.0,
            drag_index: None,
            physics_scratch: PhysicsScratch { forces: Vec::new() },
        });
        self.graph_dirty = false;
    }
}
