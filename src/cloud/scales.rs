use super::config::{ChargeMode, LayoutConfig};
use super::graph::{CorpusFrequency, Edge};

/// Linear map from an observed domain onto a fixed output range.
///
/// Values outside the domain extrapolate. A collapsed domain maps every
/// input onto the midpoint of the range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f32, f32),
    pub range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    /// Scale over the extent of `values`; an empty set gives a collapsed
    /// `(0, 0)` domain.
    pub fn from_values(values: impl IntoIterator<Item = f32>, range: [f32; 2]) -> Self {
        let domain = extent(values).unwrap_or((0.0, 0.0));
        Self::new(domain, (range[0], range[1]))
    }

    pub fn is_degenerate(self) -> bool {
        let span = self.domain.1 - self.domain.0;
        span.abs() <= f32::EPSILON * self.domain.0.abs().max(self.domain.1.abs()).max(1.0)
    }

    pub fn midpoint(self) -> f32 {
        (self.range.0 + self.range.1) * 0.5
    }

    pub fn apply(self, value: f32) -> f32 {
        if self.is_degenerate() {
            return self.midpoint();
        }

        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// `(min, max)` over the finite values, or `None` when there are none.
pub fn extent(values: impl IntoIterator<Item = f32>) -> Option<(f32, f32)> {
    values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold(None, |bounds, value| match bounds {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scales {
    pub font_size: LinearScale,
    pub charge: LinearScale,
    pub edge_strength: LinearScale,
    charge_mode: ChargeMode,
}

impl Scales {
    /// Repulsion charge for a token with the given corpus frequency.
    pub fn token_charge(&self, frequency: f32) -> f32 {
        match self.charge_mode {
            ChargeMode::Frequency => self.charge.apply(frequency),
            ChargeMode::Constant { charge } => charge,
        }
    }

    /// Charge carried by document anchors unless configured otherwise.
    pub fn weakest_charge(&self) -> f32 {
        match self.charge_mode {
            ChargeMode::Frequency => self.charge.range.0,
            ChargeMode::Constant { charge } => charge,
        }
    }
}

pub fn derive_scales(edges: &[Edge], frequency: &CorpusFrequency, config: &LayoutConfig) -> Scales {
    Scales {
        font_size: LinearScale::from_values(frequency.values(), config.font_size_range),
        charge: LinearScale::from_values(frequency.values(), config.charge_range),
        edge_strength: LinearScale::from_values(
            edges.iter().map(|edge| edge.weight),
            config.edge_strength_range,
        ),
        charge_mode: config.charge_mode,
    }
}
