mod forces;
mod quadtree;

use eframe::egui::Vec2;
use serde::Serialize;

use super::Surface;
use super::config::LayoutConfig;
use super::graph::{CloudGraph, Node};
use super::scales::Scales;
use forces::{
    RepulsionParams, Spring, accumulate_gravity, accumulate_repulsion_for_node, accumulate_springs,
};
use quadtree::QuadNode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Idle,
    Running,
    /// Alpha cooled below `alpha_min`.
    Converged,
    /// Hit `max_steps` before cooling down.
    Capped,
}

impl SimulationStatus {
    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Converged => "converged",
            Self::Capped => "capped",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TickReport {
    pub step: usize,
    pub alpha: f32,
    pub kinetic_energy: f32,
    pub status: SimulationStatus,
    pub collisions_resolved: usize,
}

impl TickReport {
    pub fn idle() -> Self {
        Self {
            step: 0,
            alpha: 0.0,
            kinetic_energy: 0.0,
            status: SimulationStatus::Idle,
            collisions_resolved: 0,
        }
    }
}

struct PhysicsScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
}

/// Velocity-based n-body and spring integrator over a [`CloudGraph`].
///
/// Every force of a step is computed from the positions left by the previous
/// step before any node moves. Document nodes never move.
pub struct Simulation {
    alpha: f32,
    step: usize,
    status: SimulationStatus,
    kinetic_energy: f32,
    charges: Vec<f32>,
    springs: Vec<Spring>,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub fn new(graph: &CloudGraph, scales: &Scales, config: &LayoutConfig) -> Self {
        let document_charge = config.document_charge.unwrap_or(scales.weakest_charge());
        let charges = graph
            .nodes
            .iter()
            .map(|node| match node {
                Node::Document(_) => document_charge,
                Node::Token(token) => {
                    let frequency = graph.frequency.get(&token.token).unwrap_or(0.0);
                    scales.token_charge(frequency)
                }
            })
            .collect();

        let springs = graph
            .edges
            .iter()
            .map(|edge| Spring {
                source: edge.source.0,
                target: edge.target.0,
                strength: scales.edge_strength.apply(edge.weight),
            })
            .collect();

        Self {
            alpha: config.alpha_start,
            step: 0,
            status: SimulationStatus::Running,
            kinetic_energy: 0.0,
            charges,
            springs,
            scratch: PhysicsScratch {
                forces: Vec::new(),
                positions: Vec::new(),
            },
        }
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.kinetic_energy
    }

    pub fn report(&self, collisions_resolved: usize) -> TickReport {
        TickReport {
            step: self.step,
            alpha: self.alpha,
            kinetic_energy: self.kinetic_energy,
            status: self.status,
            collisions_resolved,
        }
    }

    /// Advances one step. Returns `true` when node positions were updated.
    pub fn advance(&mut self, graph: &mut CloudGraph, surface: Surface, config: &LayoutConfig) -> bool {
        if !self.status.is_running() {
            return false;
        }

        if graph.token_count() == 0 {
            self.kinetic_energy = 0.0;
            self.status = SimulationStatus::Converged;
            tracing::info!(step = self.step, "no token nodes to lay out");
            return false;
        }

        let node_count = graph.nodes.len();
        let scratch = &mut self.scratch;
        scratch.forces.clear();
        scratch.forces.resize(node_count, Vec2::ZERO);
        scratch.positions.clear();
        scratch
            .positions
            .extend(graph.nodes.iter().map(|node| node.position().to_vec2()));

        let forces = &mut scratch.forces;
        let positions = &scratch.positions;

        if let Some(tree) = QuadNode::build(positions, &self.charges) {
            let params = RepulsionParams {
                theta: config.theta,
                softening: config.softening,
            };
            for (index, node) in graph.nodes.iter().enumerate() {
                if node.is_fixed() {
                    continue;
                }
                accumulate_repulsion_for_node(
                    &tree,
                    index,
                    positions,
                    &self.charges,
                    params,
                    &mut forces[index],
                );
            }
        }

        accumulate_springs(
            &self.springs,
            positions,
            config.link_distance,
            config.spring_coefficient,
            forces,
        );
        accumulate_gravity(surface.center().to_vec2(), config.gravity, positions, forces);

        let containment = config
            .contain_within_margins
            .then(|| surface.inner_rect(config.margins))
            .flatten();
        let max_speed_sq = config.max_speed * config.max_speed;
        let alpha = self.alpha;
        let mut kinetic_energy = 0.0;

        for (node, force) in graph.nodes.iter_mut().zip(forces.iter()) {
            let Node::Token(token) = node else {
                continue;
            };

            let mut velocity = (token.velocity + *force * alpha) * config.friction;
            let speed_sq = velocity.length_sq();
            if speed_sq > max_speed_sq {
                velocity *= config.max_speed / speed_sq.sqrt();
            }

            let mut next = token.position + velocity;
            if let Some(bounds) = containment {
                next = bounds.clamp(next);
                velocity = next - token.position;
            }

            token.velocity = velocity;
            token.move_by(next - token.position);
            kinetic_energy += 0.5 * velocity.length_sq();
        }

        self.kinetic_energy = kinetic_energy;
        self.step += 1;
        self.alpha *= 1.0 - config.alpha_decay;

        if self.alpha < config.alpha_min {
            self.status = SimulationStatus::Converged;
            tracing::info!(step = self.step, alpha = self.alpha, "layout converged");
        } else if self.step >= config.max_steps {
            self.status = SimulationStatus::Capped;
            tracing::info!(
                step = self.step,
                alpha = self.alpha,
                kinetic_energy,
                "layout hit the step cap"
            );
        } else {
            tracing::trace!(step = self.step, alpha = self.alpha, kinetic_energy, "tick");
        }

        true
    }
}
