use eframe::egui::Vec2;

use crate::util::fallback_direction;

use super::quadtree::QuadNode;

#[derive(Clone, Copy, Debug)]
pub(super) struct RepulsionParams {
    pub(super) theta: f32,
    pub(super) softening: f32,
}

/// Spring between a document anchor and one of its tokens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
}

/// Push on `point` from a charge at `other`; negative charges repel.
fn repulsion_between(
    point: Vec2,
    other: Vec2,
    charge: f32,
    softening: f32,
    pair: (usize, usize),
) -> Vec2 {
    let delta = point - other;
    let distance_sq = delta.length_sq();
    if distance_sq <= 1e-8 {
        let (index, other_index) = pair;
        let direction = if index < other_index {
            fallback_direction(index, other_index)
        } else {
            -fallback_direction(other_index, index)
        };
        return direction * (-charge / (softening + 1.0));
    }

    delta * (-charge / (distance_sq + softening))
}

pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    params: RepulsionParams,
    force: &mut Vec2,
) {
    if node.charge == 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            *force += repulsion_between(
                point,
                positions[other_index],
                charges[other_index],
                params.softening,
                (index, other_index),
            );
        }
        return;
    }

    let delta = point - node.charge_center;
    let distance_sq = delta.length_sq().max(0.0001);
    let can_approximate = !node.bounds.contains(point)
        && (node.bounds.side_length() / distance_sq.sqrt()) < params.theta;

    if can_approximate {
        *force += delta * (-node.charge / (distance_sq + params.softening));
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion_for_node(child, index, positions, charges, params, force);
    }
}

/// Hooke-style pull towards `link_distance`, weighted by each spring's
/// strength and divided by the current length.
pub(super) fn accumulate_springs(
    springs: &[Spring],
    positions: &[Vec2],
    link_distance: f32,
    coefficient: f32,
    forces: &mut [Vec2],
) {
    for spring in springs {
        let delta = positions[spring.source] - positions[spring.target];
        let distance_sq = delta.length_sq();
        if distance_sq <= 1e-8 {
            continue;
        }
        let distance = distance_sq.sqrt();

        let pull = delta * (spring.strength * coefficient * (distance - link_distance) / distance);
        forces[spring.target] += pull;
        forces[spring.source] -= pull;
    }
}

pub(super) fn accumulate_gravity(center: Vec2, gravity: f32, positions: &[Vec2], forces: &mut [Vec2]) {
    if gravity == 0.0 {
        return;
    }
    for (force, position) in forces.iter_mut().zip(positions) {
        *force += (center - *position) * gravity;
    }
}
