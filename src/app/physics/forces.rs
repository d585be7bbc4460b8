use eframe::egui::{Vec2, vec2};

use super::super::{PhysicsConfig, RenderLink, RenderNode};

/// Deterministic push direction for exactly coincident points, spread around
/// the circle by the golden angle so stacked nodes fan out instead of
/// oscillating along one axis.
fn degenerate_direction(seed: usize) -> Vec2 {
    let angle = ((seed as f32) * 0.618_034 + 0.37) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

/// Pairwise many-body repulsion. Device graphs here are a LAN's worth of
/// nodes, so the quadratic pass is cheaper than maintaining a spatial index.
pub(super) fn apply_charge_forces(nodes: &[RenderNode], strength: f32, forces: &mut [Vec2]) {
    for first in 0..nodes.len() {
        for second in (first + 1)..nodes.len() {
            let delta = nodes[first].pos - nodes[second].pos;
            let distance = delta.length();
            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                degenerate_direction(first + second)
            };

            let push = direction * (strength / distance.max(1.0));
            forces[first] += push;
            forces[second] -= push;
        }
    }
}

/// Spring force pulling linked pairs toward the preferred link distance.
/// Disabled links keep their spring so blocking a device restyles the edge
/// without collapsing the layout.
pub(super) fn apply_link_forces(
    nodes: &[RenderNode],
    links: &[RenderLink],
    config: PhysicsConfig,
    forces: &mut [Vec2],
) {
    for link in links {
        if link.source >= nodes.len() || link.target >= nodes.len() || link.source == link.target {
            continue;
        }

        let delta = nodes[link.target].pos - nodes[link.source].pos;
        let distance = delta.length();
        let direction = if distance > 0.0001 {
            delta / distance
        } else {
            degenerate_direction(link.source + link.target)
        };

        let correction = direction
            * ((distance - config.link_distance) * config.link_strength * 0.5);
        forces[link.source] += correction;
        forces[link.target] -= correction;
    }
}

/// Positional overlap resolution. Pinned nodes and the router do not move;
/// their counterpart absorbs the whole separation instead.
pub(super) fn resolve_collisions(
    nodes: &mut [RenderNode],
    router_index: Option<usize>,
    radius: f32,
) {
    let min_distance = radius * 2.0;
    let movable = |index: usize, nodes: &[RenderNode]| {
        Some(index) != router_index && nodes[index].pinned.is_none()
    };

    for first in 0..nodes.len() {
        for second in (first + 1)..nodes.len() {
            let delta = nodes[first].pos - nodes[second].pos;
            let distance = delta.length();
            if distance >= min_distance {
                continue;
            }

            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                degenerate_direction(first + second)
            };
            let overlap = min_distance - distance;

            match (movable(first, nodes), movable(second, nodes)) {
                (true, true) => {
                    nodes[first].pos += direction * (overlap * 0.5);
                    nodes[second].pos -= direction * (overlap * 0.5);
                }
                (true, false) => nodes[first].pos += direction * overlap,
                (false, true) => nodes[second].pos -= direction * overlap,
                (false, false) => {}
            }
        }
    }
}
