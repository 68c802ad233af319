//! Physics-based layout for document/token word clouds.
//!
//! Documents become pinned anchors, tokens float between them under
//! frequency-weighted repulsion and score-weighted springs, and measured
//! label boxes can be pushed apart after every step.

pub mod cloud;
pub mod error;
pub mod input;
pub mod util;

pub use cloud::{
    BoundingBox, CollisionMode, CollisionStrategy, Frame, LayoutConfig, LayoutSnapshot,
    LayoutState, Node, NodeKey, SimulationStatus, Surface, TickReport, WordCloud,
};
pub use error::{LayoutError, Result};
pub use input::{Document, parse_documents, validate_documents};
