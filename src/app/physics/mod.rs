mod forces;

use eframe::egui::{Rect, Vec2, pos2};

use super::{PhysicsConfig, RenderGraph};
use forces::{apply_charge_forces, apply_link_forces, resolve_collisions};

const ALPHA_DECAY: f32 = 0.985;
/// The simulation cools but never sleeps, so late drags and rescans always
/// have some energy to react with.
const ALPHA_FLOOR: f32 = 0.06;
const VELOCITY_DAMPING: f32 = 0.6;
/// Keep-out margin from every canvas edge. Doubles as the node footprint
/// used for collision resolution.
pub(in crate::app) const NODE_MARGIN: f32 = 25.0;

pub(super) fn reheat(cache: &mut RenderGraph) {
    cache.alpha = 1.0;
}

/// One simulation tick. Returns whether anything is still moving, which the
/// view uses to decide if another repaint is worth requesting.
pub(super) fn step_physics(cache: &mut RenderGraph, canvas: Rect, config: PhysicsConfig) -> bool {
    let node_count = cache.nodes.len();
    if node_count == 0 {
        return false;
    }

    let center = canvas.center();
    let router_index = cache.router_index.filter(|&index| index < node_count);
    if let Some(router) = router_index {
        cache.nodes[router].pos = center;
        cache.nodes[router].velocity = Vec2::ZERO;
    }
    if node_count == 1 {
        return false;
    }

    cache.alpha = (cache.alpha * ALPHA_DECAY).max(ALPHA_FLOOR);
    let alpha = cache.alpha;

    let forces = &mut cache.physics_scratch.forces;
    forces.resize(node_count, Vec2::ZERO);
    forces.fill(Vec2::ZERO);

    apply_charge_forces(&cache.nodes, config.charge_strength, forces);
    apply_link_forces(&cache.nodes, &cache.links, config, forces);
    for (index, force) in forces.iter_mut().enumerate() {
        *force += (center - cache.nodes[index].pos) * config.center_pull;
    }

    let time_step_scale = (config.delta_seconds * 60.0).clamp(0.25, 3.0);
    let min_motion_sq = 0.02 * 0.02;
    let mut any_motion = false;
    for (index, node) in cache.nodes.iter_mut().enumerate() {
        if Some(index) == router_index {
            continue;
        }

        let velocity = (node.velocity + forces[index] * (alpha * time_step_scale))
            * VELOCITY_DAMPING.powf(time_step_scale);
        node.velocity = velocity;
        node.pos += velocity * time_step_scale;

        if let Some(pinned) = node.pinned {
            node.pos = pinned;
            node.velocity = Vec2::ZERO;
        } else if velocity.length_sq() > min_motion_sq {
            any_motion = true;
        }
    }

    resolve_collisions(&mut cache.nodes, router_index, config.collision_radius);
    clamp_to_canvas(cache, canvas, router_index);

    any_motion
}

fn clamp_to_canvas(cache: &mut RenderGraph, canvas: Rect, router_index: Option<usize>) {
    let min_x = canvas.left() + NODE_MARGIN;
    let max_x = (canvas.right() - NODE_MARGIN).max(min_x);
    let min_y = canvas.top() + NODE_MARGIN;
    let max_y = (canvas.bottom() - NODE_MARGIN).max(min_y);

    for (index, node) in cache.nodes.iter_mut().enumerate() {
        if Some(index) == router_index {
            continue;
        }

        let clamped = pos2(node.pos.x.clamp(min_x, max_x), node.pos.y.clamp(min_y, max_y));
        if clamped != node.pos {
            node.pos = clamped;
            node.velocity = Vec2::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use eframe::egui::{Rect, Vec2, pos2};

    use super::super::{PhysicsConfig, PhysicsScratch, RenderGraph, RenderLink, RenderNode};
    use super::{reheat, step_physics};
    use crate::net::{DeviceNode, Role};

    fn device(id: &str, role: Role) -> DeviceNode {
        DeviceNode {
            id: id.to_string(),
            ip: format!("10.0.0.{id}"),
            mac: id.to_string(),
            hostname: id.to_string(),
            vendor: "Unknown".to_string(),
            role,
            disabled: false,
        }
    }

    fn graph(positions: &[(f32, f32)], router_index: Option<usize>) -> RenderGraph {
        let nodes = positions
            .iter()
            .enumerate()
            .map(|(index, &(x, y))| {
                let role = if Some(index) == router_index {
                    Role::Router
                } else {
                    Role::Other
                };
                RenderNode {
                    node: device(&index.to_string(), role),
                    pos: pos2(x, y),
                    velocity: Vec2::ZERO,
                    pinned: None,
                }
            })
            .collect();

        RenderGraph {
            nodes,
            links: Vec::new(),
            index_by_id: HashMap::new(),
            router_index,
            alpha: 1.0,
            drag_index: None,
            physics_scratch: PhysicsScratch { forces: Vec::new() },
        }
    }

    fn canvas() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0))
    }

    #[test]
    fn router_stays_pinned_at_the_canvas_center() {
        let mut cache = graph(&[(10.0, 10.0), (700.0, 500.0), (50.0, 550.0)], Some(0));
        let config = PhysicsConfig::for_frame(1.0 / 60.0);

        for _ in 0..300 {
            step_physics(&mut cache, canvas(), config);
        }

        assert_eq!(cache.nodes[0].pos, canvas().center());
        assert_eq!(cache.nodes[0].velocity, Vec2::ZERO);
    }

    #[test]
    fn nodes_never_leave_the_canvas_margins() {
        let mut cache = graph(
            &[(400.0, 300.0), (-500.0, -500.0), (5000.0, 9000.0), (401.0, 301.0)],
            Some(0),
        );
        cache.links = vec![
            RenderLink { source: 1, target: 0, disabled: false },
            RenderLink { source: 2, target: 0, disabled: false },
            RenderLink { source: 3, target: 0, disabled: false },
        ];
        let config = PhysicsConfig::for_frame(1.0 / 60.0);

        for _ in 0..300 {
            step_physics(&mut cache, canvas(), config);
            for (index, node) in cache.nodes.iter().enumerate() {
                if index == 0 {
                    continue;
                }
                assert!((25.0..=775.0).contains(&node.pos.x), "x = {}", node.pos.x);
                assert!((25.0..=575.0).contains(&node.pos.y), "y = {}", node.pos.y);
            }
        }
    }

    #[test]
    fn coincident_nodes_are_pushed_apart() {
        let mut cache = graph(&[(400.0, 300.0), (200.0, 200.0), (200.0, 200.0)], Some(0));
        let config = PhysicsConfig::for_frame(1.0 / 60.0);

        for _ in 0..120 {
            step_physics(&mut cache, canvas(), config);
        }

        let separation = (cache.nodes[1].pos - cache.nodes[2].pos).length();
        assert!(separation >= 2.0 * config.collision_radius - 0.5, "separation = {separation}");
    }

    #[test]
    fn dragged_node_holds_its_pin() {
        let mut cache = graph(&[(400.0, 300.0), (100.0, 100.0), (600.0, 400.0)], Some(0));
        cache.nodes[1].pinned = Some(pos2(120.0, 130.0));
        let config = PhysicsConfig::for_frame(1.0 / 60.0);

        for _ in 0..60 {
            step_physics(&mut cache, canvas(), config);
        }

        assert_eq!(cache.nodes[1].pos, pos2(120.0, 130.0));
    }

    #[test]
    fn alpha_cools_to_a_warm_floor_and_reheats() {
        let mut cache = graph(&[(400.0, 300.0), (100.0, 100.0)], Some(0));
        let config = PhysicsConfig::for_frame(1.0 / 60.0);

        for _ in 0..2000 {
            step_physics(&mut cache, canvas(), config);
        }
        assert!((cache.alpha - 0.06).abs() < 1e-4);

        reheat(&mut cache);
        assert_eq!(cache.alpha, 1.0);
    }

    #[test]
    fn trivial_graphs_report_no_motion() {
        let config = PhysicsConfig::for_frame(1.0 / 60.0);

        let mut empty = graph(&[], None);
        assert!(!step_physics(&mut empty, canvas(), config));

        let mut lone_router = graph(&[(10.0, 10.0)], Some(0));
        assert!(!step_physics(&mut lone_router, canvas(), config));
        assert_eq!(lone_router.nodes[0].pos, canvas().center());
    }
}
