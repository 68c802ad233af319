use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

use super::collision::{BoxSeparation, CollisionStrategy, NoCollision};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 50.0,
            right: 50.0,
            top: 50.0,
            bottom: 50.0,
        }
    }
}

/// How token repulsion is weighted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ChargeMode {
    /// Charge interpolated from corpus frequency over `charge_range`.
    Frequency,
    /// The same charge for every node.
    Constant { charge: f32 },
}

impl ChargeMode {
    pub const DEFAULT_CONSTANT: f32 = -2000.0;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum CollisionMode {
    Disabled,
    /// Push overlapping token boxes apart; `strength` is the share of the
    /// separating distance applied per pass.
    BoundingBox { strength: f32 },
}

impl CollisionMode {
    pub fn strategy(self) -> Box<dyn CollisionStrategy> {
        match self {
            Self::Disabled => Box::new(NoCollision),
            Self::BoundingBox { strength } => Box::new(BoxSeparation::new(strength)),
        }
    }
}

/// Tuning knobs for one layout run. Missing keys fall back to the defaults
/// listed on [`LayoutConfig::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub margins: Margins,
    /// Document ring radius as a fraction of the canvas width.
    pub radius_fraction: f32,
    pub font_size_range: [f32; 2],
    /// Charge for the least and the most frequent token.
    pub charge_range: [f32; 2],
    pub charge_mode: ChargeMode,
    /// Charge carried by document anchors; `None` uses the weakest charge of
    /// the range.
    pub document_charge: Option<f32>,
    pub edge_strength_range: [f32; 2],
    pub spring_coefficient: f32,
    pub link_distance: f32,
    pub gravity: f32,
    pub friction: f32,
    pub theta: f32,
    pub softening: f32,
    pub alpha_start: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub max_steps: usize,
    pub max_speed: f32,
    pub contain_within_margins: bool,
    pub collision: CollisionMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            radius_fraction: 1.0 / 3.0,
            font_size_range: [12.0, 32.0],
            charge_range: [-1000.0, -5000.0],
            charge_mode: ChargeMode::Frequency,
            document_charge: None,
            edge_strength_range: [1.0, 20.0],
            spring_coefficient: 0.5,
            link_distance: 30.0,
            gravity: 0.1,
            friction: 0.9,
            theta: 0.8,
            softening: 25.0,
            alpha_start: 0.1,
            alpha_decay: 0.01,
            alpha_min: 0.005,
            max_steps: 500,
            max_speed: 40.0,
            contain_within_margins: false,
            collision: CollisionMode::Disabled,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("margins.left", self.margins.left),
            ("margins.right", self.margins.right),
            ("margins.top", self.margins.top),
            ("margins.bottom", self.margins.bottom),
            ("radius_fraction", self.radius_fraction),
            ("font_size_range[0]", self.font_size_range[0]),
            ("font_size_range[1]", self.font_size_range[1]),
            ("charge_range[0]", self.charge_range[0]),
            ("charge_range[1]", self.charge_range[1]),
            ("edge_strength_range[0]", self.edge_strength_range[0]),
            ("edge_strength_range[1]", self.edge_strength_range[1]),
            ("spring_coefficient", self.spring_coefficient),
            ("link_distance", self.link_distance),
            ("gravity", self.gravity),
            ("friction", self.friction),
            ("theta", self.theta),
            ("softening", self.softening),
            ("alpha_start", self.alpha_start),
            ("alpha_decay", self.alpha_decay),
            ("alpha_min", self.alpha_min),
            ("max_speed", self.max_speed),
        ];
        if let Some((key, _)) = finite.iter().find(|(_, value)| !value.is_finite()) {
            return Err(invalid(format!("`{key}` must be finite")));
        }

        if let ChargeMode::Constant { charge } = self.charge_mode
            && !charge.is_finite()
        {
            return Err(invalid("constant charge must be finite"));
        }
        if self.document_charge.is_some_and(|charge| !charge.is_finite()) {
            return Err(invalid("`document_charge` must be finite"));
        }
        if let CollisionMode::BoundingBox { strength } = self.collision
            && !(strength > 0.0 && strength <= 1.0)
        {
            return Err(invalid("collision strength must be in (0, 1]"));
        }

        let margins = self.margins;
        if margins.left < 0.0 || margins.right < 0.0 || margins.top < 0.0 || margins.bottom < 0.0
        {
            return Err(invalid("margins must not be negative"));
        }
        if self.radius_fraction <= 0.0 {
            return Err(invalid("`radius_fraction` must be positive"));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(invalid("`friction` must be in [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.alpha_decay) {
            return Err(invalid("`alpha_decay` must be in [0, 1)"));
        }
        if self.alpha_start <= 0.0 || self.alpha_min < 0.0 {
            return Err(invalid("alpha bounds must be positive"));
        }
        if self.max_steps == 0 {
            return Err(invalid("`max_steps` must be at least 1"));
        }
        if self.theta < 0.0 || self.softening < 0.0 || self.max_speed <= 0.0 {
            return Err(invalid("theta, softening and max_speed must be positive"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> LayoutError {
    LayoutError::InvalidConfig(message.into())
}
