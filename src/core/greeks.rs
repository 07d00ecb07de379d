//! Option Greeks
//!
//! Sensitivities used by the exposure aggregator and the scoring engine.

use serde::{Deserialize, Serialize};

/// Theoretical value and sensitivities for one contract
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GreeksResult {
    /// Delta: dV/dS
    pub delta: f64,
    /// Gamma: d²V/dS² (same for call and put)
    pub gamma: f64,
    /// Vanna: d(delta)/d(vol), per unit of volatility
    pub vanna: f64,
    /// Charm: delta decay per year of calendar time
    pub charm: f64,
    /// Color: gamma decay per year of calendar time
    #[serde(default)]
    pub color: f64,
    /// Model value
    pub theoretical_value: f64,
}

impl GreeksResult {
    pub fn new(
        delta: f64,
        gamma: f64,
        vanna: f64,
        charm: f64,
        color: f64,
        theoretical_value: f64,
    ) -> Self {
        Self {
            delta,
            gamma,
            vanna,
            charm,
            color,
            theoretical_value,
        }
    }

    /// All components finite
    pub fn is_finite(&self) -> bool {
        self.delta.is_finite()
            && self.gamma.is_finite()
            && self.vanna.is_finite()
            && self.charm.is_finite()
            && self.color.is_finite()
            && self.theoretical_value.is_finite()
    }
}
