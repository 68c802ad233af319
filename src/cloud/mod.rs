pub mod collision;
pub mod config;
pub mod graph;
pub mod physics;
pub mod scales;

use eframe::egui::{Pos2, Rect, pos2, vec2};
use serde::Serialize;

use crate::error::{LayoutError, Result};
use crate::input::{Document, validate_documents};

pub use collision::{BoundingBox, BoxSeparation, CollisionStrategy, NoCollision};
pub use config::{ChargeMode, CollisionMode, LayoutConfig, Margins};
pub use graph::{CloudGraph, DocumentNode, Edge, Node, NodeKey, TokenNode, document_centers};
pub use physics::{Simulation, SimulationStatus, TickReport};
pub use scales::{LinearScale, Scales, derive_scales};

/// Drawing area established by [`WordCloud::initial_render`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(LayoutError::InvalidSurface { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn center(self) -> Pos2 {
        pos2(self.width * 0.5, self.height * 0.5)
    }

    pub fn rect(self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(self.width, self.height))
    }

    /// The surface shrunk by `margins`, or `None` when nothing is left.
    pub fn inner_rect(self, margins: Margins) -> Option<Rect> {
        let min = pos2(margins.left, margins.top);
        let max = pos2(self.width - margins.right, self.height - margins.bottom);
        (min.x <= max.x && min.y <= max.y).then(|| Rect::from_min_max(min, max))
    }
}

/// Everything derived from one `update`: the graph arena, its scales and
/// the simulation advancing it. Replaced as a whole on the next update.
pub struct LayoutState {
    surface: Surface,
    config: LayoutConfig,
    graph: CloudGraph,
    scales: Scales,
    simulation: Simulation,
}

impl LayoutState {
    fn build(documents: &[Document], surface: Surface, config: &LayoutConfig) -> Result<Self> {
        config.validate()?;
        validate_documents(documents)?;

        let graph = CloudGraph::build(documents, surface, config.radius_fraction);
        let scales = derive_scales(&graph.edges, &graph.frequency, config);
        let simulation = Simulation::new(&graph, &scales, config);

        tracing::debug!(
            documents = graph.document_count(),
            tokens = graph.token_count(),
            edges = graph.edges.len(),
            "rebuilt token cloud graph"
        );

        Ok(Self {
            surface,
            config: config.clone(),
            graph,
            scales,
            simulation,
        })
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn graph(&self) -> &CloudGraph {
        &self.graph
    }

    pub fn scales(&self) -> &Scales {
        &self.scales
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Font size for a token node; `None` for documents and unknown keys.
    pub fn font_size(&self, key: NodeKey) -> Option<f32> {
        let token = self.graph.node(key)?.as_token()?;
        let frequency = self.graph.frequency.get(&token.token)?;
        Some(self.scales.font_size.apply(frequency))
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        let nodes = self
            .graph
            .keys()
            .zip(&self.graph.nodes)
            .map(|(key, node)| match node {
                Node::Document(document) => NodeSnapshot::Document {
                    key: key.0,
                    id: document.id.clone(),
                    name: document.name.clone(),
                    x: document.center.x,
                    y: document.center.y,
                },
                Node::Token(token) => NodeSnapshot::Token {
                    key: key.0,
                    token: token.token.clone(),
                    x: token.position.x,
                    y: token.position.y,
                    font_size: self.font_size(key).unwrap_or(self.scales.font_size.midpoint()),
                    bounding_box: token.bounding_box,
                },
            })
            .collect();

        let edges = self
            .graph
            .edges
            .iter()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some(EdgeSnapshot {
                    source: edge.source.0,
                    target: edge.target.0,
                    weight: edge.weight,
                    x1: from.x,
                    y1: from.y,
                    x2: to.x,
                    y2: to.y,
                })
            })
            .collect();

        LayoutSnapshot {
            width: self.surface.width,
            height: self.surface.height,
            status: self.simulation.status(),
            step: self.simulation.step(),
            alpha: self.simulation.alpha(),
            nodes,
            edges,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    pub width: f32,
    pub height: f32,
    pub status: SimulationStatus,
    pub step: usize,
    pub alpha: f32,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSnapshot {
    Document {
        key: usize,
        id: String,
        name: String,
        x: f32,
        y: f32,
    },
    Token {
        key: usize,
        token: String,
        x: f32,
        y: f32,
        font_size: f32,
        bounding_box: Option<BoundingBox>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeSnapshot {
    pub source: usize,
    pub target: usize,
    pub weight: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Edge with both endpoints resolved to current positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderEdge {
    pub source: NodeKey,
    pub target: NodeKey,
    pub from: Pos2,
    pub to: Pos2,
    pub weight: f32,
}

/// View handed to the render hook. Reads the current geometry and takes
/// measured label boxes back for the next collision pass.
pub struct Frame<'a> {
    state: &'a mut LayoutState,
    report: TickReport,
}

impl Frame<'_> {
    pub fn report(&self) -> TickReport {
        self.report
    }

    pub fn surface(&self) -> Surface {
        self.state.surface
    }

    pub fn graph(&self) -> &CloudGraph {
        &self.state.graph
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.state.graph.keys().zip(self.state.graph.nodes.iter())
    }

    pub fn edges(&self) -> impl Iterator<Item = RenderEdge> + '_ {
        let graph = &self.state.graph;
        graph.edges.iter().filter_map(move |edge| {
            let (from, to) = graph.edge_endpoints(edge)?;
            Some(RenderEdge {
                source: edge.source,
                target: edge.target,
                from,
                to,
                weight: edge.weight,
            })
        })
    }

    pub fn font_size(&self, key: NodeKey) -> Option<f32> {
        self.state.font_size(key)
    }

    /// Stores the measured label box of a token node. Returns `false` for
    /// document nodes and unknown keys.
    pub fn supply_bounding_box(&mut self, key: NodeKey, bounding_box: BoundingBox) -> bool {
        match self
            .state
            .graph
            .nodes
            .get_mut(key.0)
            .and_then(Node::as_token_mut)
        {
            Some(token) => {
                token.bounding_box = Some(bounding_box);
                true
            }
            None => false,
        }
    }
}

/// Layout facade: owns the drawing surface, the current [`LayoutState`] and
/// the collision strategy applied after every physics step.
pub struct WordCloud {
    surface: Option<Surface>,
    state: Option<LayoutState>,
    collision: Box<dyn CollisionStrategy>,
    custom_collision: bool,
}

impl Default for WordCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl WordCloud {
    pub fn new() -> Self {
        Self {
            surface: None,
            state: None,
            collision: Box::new(NoCollision),
            custom_collision: false,
        }
    }

    /// Sets the drawing surface. Required before the first `update`; calling
    /// it again resizes, which takes effect on the next `update`.
    pub fn initial_render(&mut self, width: f32, height: f32) -> Result<()> {
        self.surface = Some(Surface::new(width, height)?);
        Ok(())
    }

    /// Drops the running layout and starts a new one for `documents`.
    ///
    /// On error the cloud is left idle with no layout.
    pub fn update(&mut self, documents: &[Document], config: &LayoutConfig) -> Result<()> {
        self.state = None;

        let built = self
            .surface
            .ok_or(LayoutError::SurfaceNotInitialized)
            .and_then(|surface| LayoutState::build(documents, surface, config));

        match built {
            Ok(state) => {
                if !self.custom_collision {
                    self.collision = config.collision.strategy();
                }
                self.state = Some(state);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "rejected token cloud update");
                Err(error)
            }
        }
    }

    /// Installs a strategy that stays in place across later updates.
    pub fn set_collision_strategy(&mut self, strategy: Box<dyn CollisionStrategy>) {
        self.collision = strategy;
        self.custom_collision = true;
    }

    pub fn surface(&self) -> Option<Surface> {
        self.surface
    }

    pub fn state(&self) -> Option<&LayoutState> {
        self.state.as_ref()
    }

    pub fn status(&self) -> SimulationStatus {
        self.state
            .as_ref()
            .map_or(SimulationStatus::Idle, |state| state.simulation.status())
    }

    /// Advances the simulation by one step, runs the collision pass and
    /// hands the new geometry to `hook`. The hook is only called when
    /// positions changed.
    pub fn tick(&mut self, mut hook: impl FnMut(&mut Frame<'_>)) -> TickReport {
        let Some(state) = self.state.as_mut() else {
            return TickReport::idle();
        };

        let moved = state
            .simulation
            .advance(&mut state.graph, state.surface, &state.config);
        let collisions_resolved = if moved && self.collision.is_enabled() {
            self.collision.resolve(&mut state.graph.nodes)
        } else {
            0
        };

        let report = state.simulation.report(collisions_resolved);
        if moved {
            hook(&mut Frame { state, report });
        }
        report
    }

    /// Hands the current geometry to `hook` without stepping.
    pub fn render(&mut self, mut hook: impl FnMut(&mut Frame<'_>)) {
        if let Some(state) = self.state.as_mut() {
            let report = state.simulation.report(0);
            hook(&mut Frame { state, report });
        }
    }

    /// Ticks until the simulation converges or hits its step cap.
    pub fn run(&mut self, mut hook: impl FnMut(&mut Frame<'_>)) -> TickReport {
        loop {
            let report = self.tick(&mut hook);
            if !report.status.is_running() {
                return report;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("a", "first", [("rust", 5.0), ("graph", 2.0)]),
            Document::new("b", "second", [("graph", 3.0), ("force", 1.0)]),
        ]
    }

    fn ready_cloud(config: &LayoutConfig) -> WordCloud {
        let mut cloud = WordCloud::new();
        cloud.initial_render(800.0, 600.0).unwrap();
        cloud.update(&corpus(), config).unwrap();
        cloud
    }

    #[test]
    fn surface_rejects_degenerate_sizes() {
        assert!(Surface::new(0.0, 100.0).is_err());
        assert!(Surface::new(100.0, f32::NAN).is_err());

        let surface = Surface::new(200.0, 100.0).unwrap();
        assert_eq!(surface.center(), pos2(100.0, 50.0));
        assert!(surface.inner_rect(Margins::default()).is_some());
        assert!(Surface::new(80.0, 80.0).unwrap().inner_rect(Margins::default()).is_none());
    }

    #[test]
    fn update_requires_a_surface() {
        let mut cloud = WordCloud::new();
        let error = cloud.update(&corpus(), &LayoutConfig::default()).unwrap_err();
        assert!(matches!(error, LayoutError::SurfaceNotInitialized));
        assert_eq!(cloud.status(), SimulationStatus::Idle);
    }

    #[test]
    fn failed_update_leaves_the_cloud_idle() {
        let mut cloud = ready_cloud(&LayoutConfig::default());
        assert_eq!(cloud.status(), SimulationStatus::Running);

        let broken = vec![Document::new("x", "x", [("nan", f32::NAN)])];
        assert!(cloud.update(&broken, &LayoutConfig::default()).is_err());
        assert_eq!(cloud.status(), SimulationStatus::Idle);
        assert!(cloud.state().is_none());
        assert_eq!(cloud.tick(|_| {}), TickReport::idle());
    }

    #[test]
    fn tick_hands_every_node_and_edge_to_the_hook() {
        let mut cloud = ready_cloud(&LayoutConfig::default());
        let mut seen = None;

        let report = cloud.tick(|frame| {
            let nodes = frame.nodes().count();
            let edges = frame.edges().collect::<Vec<_>>();
            for edge in &edges {
                assert_eq!(Some(edge.from), frame.graph().node(edge.source).map(Node::position));
                assert_eq!(Some(edge.to), frame.graph().node(edge.target).map(Node::position));
            }
            seen = Some((nodes, edges.len(), frame.report().step));
        });

        assert_eq!(report.step, 1);
        assert_eq!(seen, Some((5, 4, 1)));
    }

    #[test]
    fn render_does_not_step() {
        let mut cloud = ready_cloud(&LayoutConfig::default());
        let mut calls = 0;
        cloud.render(|frame| {
            assert_eq!(frame.report().step, 0);
            calls += 1;
        });
        assert_eq!(calls, 1);
        assert_eq!(cloud.state().map(|state| state.simulation().step()), Some(0));
    }

    #[test]
    fn bounding_boxes_are_only_accepted_for_tokens() {
        let mut cloud = ready_cloud(&LayoutConfig::default());
        let bounding_box = BoundingBox::new(0.0, 0.0, 10.0, 10.0);

        cloud.render(|frame| {
            assert!(!frame.supply_bounding_box(NodeKey(0), bounding_box));
            assert!(frame.supply_bounding_box(NodeKey(2), bounding_box));
            assert!(!frame.supply_bounding_box(NodeKey(99), bounding_box));
            assert_eq!(frame.font_size(NodeKey(0)), None);
            assert!(frame.font_size(NodeKey(2)).is_some());
        });

        let graph = cloud.state().map(LayoutState::graph);
        assert_eq!(graph.and_then(|graph| graph.nodes[2].bounding_box()), Some(bounding_box));
    }

    #[test]
    fn collision_follows_config_unless_overridden() {
        let enabled = LayoutConfig {
            collision: CollisionMode::BoundingBox { strength: 1.0 },
            ..LayoutConfig::default()
        };
        let mut cloud = ready_cloud(&enabled);
        assert!(cloud.collision.is_enabled());

        cloud.update(&corpus(), &LayoutConfig::default()).unwrap();
        assert!(!cloud.collision.is_enabled());

        cloud.set_collision_strategy(Box::new(BoxSeparation::new(0.5)));
        cloud.update(&corpus(), &LayoutConfig::default()).unwrap();
        assert!(cloud.collision.is_enabled());
    }

    #[test]
    fn run_finishes_and_snapshot_lists_the_graph() {
        let mut cloud = ready_cloud(&LayoutConfig::default());
        let report = cloud.run(|_| {});
        assert_eq!(report.status, SimulationStatus::Converged);

        let snapshot = cloud.state().map(LayoutState::snapshot).unwrap();
        assert_eq!(snapshot.status, SimulationStatus::Converged);
        assert_eq!(snapshot.nodes.len(), 5);
        assert_eq!(snapshot.edges.len(), 4);
        assert!(matches!(snapshot.nodes[0], NodeSnapshot::Document { key: 0, .. }));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["nodes"][2]["type"], "token");
        assert_eq!(json["status"], "converged");
    }
}
