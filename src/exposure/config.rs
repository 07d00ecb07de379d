//! Configuration for exposure aggregation

use serde::{Deserialize, Serialize};

use crate::core::OptionRight;

/// Assumed dealer positioning, expressed as the sign applied per right
///
/// `CallsPositive` reads the chain as dealers long calls and short puts
/// (customer call selling, put buying), the usual GEX reading: call gamma
/// counts positive, put gamma negative. `PutsPositive` is the inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealerConvention {
    CallsPositive,
    PutsPositive,
}

impl DealerConvention {
    /// Sign applied to a contract's exposure
    pub fn sign(&self, right: OptionRight) -> f64 {
        match (self, right) {
            (DealerConvention::CallsPositive, OptionRight::Call) => 1.0,
            (DealerConvention::CallsPositive, OptionRight::Put) => -1.0,
            (DealerConvention::PutsPositive, OptionRight::Call) => -1.0,
            (DealerConvention::PutsPositive, OptionRight::Put) => 1.0,
        }
    }
}

impl Default for DealerConvention {
    fn default() -> Self {
        DealerConvention::CallsPositive
    }
}

/// Exposure aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Shares per contract
    /// Default: 100
    pub contract_multiplier: f64,

    /// Dealer sign convention
    /// Default: CallsPositive
    pub dealer_convention: DealerConvention,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            contract_multiplier: 100.0,
            dealer_convention: DealerConvention::default(),
        }
    }
}
