//! Configuration for scoring and classification

use serde::{Deserialize, Serialize};

use crate::core::OptionRight;
use crate::regime::RegimeState;

use super::ComponentKind;

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Per-component weights in the normalized sum
    pub weights: ComponentWeights,

    /// Contract volume at which the volume component saturates
    /// Default: 1000
    pub volume_saturation: f64,

    /// Notional at which the notional component saturates
    /// Default: $500,000
    pub notional_saturation: f64,

    /// Per-trade minimums; failing any suppresses the trade unless bypassed
    pub minimums: MinimumConfig,

    /// Total score above which a trade bypasses all minimums
    /// Default: 90.0
    pub bypass_threshold: f64,

    /// Total score from which a trade is flagged high conviction
    /// Default: 75.0
    pub high_conviction_threshold: f64,

    /// Scores below this are suppressed unless bypassed
    /// Default: 40.0
    pub min_alert_score: f64,

    /// Regime adjustment factors
    pub regime: RegimeMultipliers,

    /// Band around a key level, as a fraction of spot, inside which gamma
    /// proximity is non-zero
    /// Default: 0.03
    pub proximity_band_pct: f64,

    /// Positioning component: maximum days to expiry
    /// Default: 45
    pub positioning_max_dte: i64,

    /// Positioning component: maximum |K - S| / S in percent
    /// Default: 15.0
    pub positioning_max_moneyness_pct: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            volume_saturation: 1_000.0,
            notional_saturation: 500_000.0,
            minimums: MinimumConfig::default(),
            bypass_threshold: 90.0,
            high_conviction_threshold: 75.0,
            min_alert_score: 40.0,
            regime: RegimeMultipliers::default(),
            proximity_band_pct: 0.03,
            positioning_max_dte: 45,
            positioning_max_moneyness_pct: 15.0,
        }
    }
}

impl ScoringConfig {
    /// Aggressive settings: lower bars, more alerts
    pub fn aggressive() -> Self {
        Self {
            minimums: MinimumConfig {
                min_volume: 250,
                min_notional: 10_000.0,
                min_volume_oi_ratio: 4.0,
                min_relative_volume: 3.0,
            },
            bypass_threshold: 85.0,
            high_conviction_threshold: 70.0,
            min_alert_score: 30.0,
            ..Default::default()
        }
    }

    /// Conservative settings: higher bars, fewer alerts
    pub fn conservative() -> Self {
        Self {
            minimums: MinimumConfig {
                min_volume: 1_000,
                min_notional: 100_000.0,
                min_volume_oi_ratio: 15.0,
                min_relative_volume: 10.0,
            },
            bypass_threshold: 95.0,
            high_conviction_threshold: 85.0,
            min_alert_score: 60.0,
            ..Default::default()
        }
    }
}

/// Component weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub volume: f64,
    pub notional: f64,
    pub volume_oi_ratio: f64,
    pub volume_zscore: f64,
    pub relative_volume: f64,
    pub contract_zscore: f64,
    pub sweep: f64,
    pub microstructure: f64,
    pub skew_alignment: f64,
    pub insider_put: f64,
    pub gamma_proximity: f64,
    pub positioning: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            volume: 20.0,
            notional: 25.0,
            volume_oi_ratio: 20.0,
            volume_zscore: 15.0,
            relative_volume: 20.0,
            contract_zscore: 15.0,
            sweep: 15.0,
            microstructure: 10.0,
            skew_alignment: 10.0,
            insider_put: 10.0,
            gamma_proximity: 10.0,
            positioning: 10.0,
        }
    }
}

impl ComponentWeights {
    pub fn get(&self, kind: ComponentKind) -> f64 {
        match kind {
            ComponentKind::Volume => self.volume,
            ComponentKind::Notional => self.notional,
            ComponentKind::VolumeOiRatio => self.volume_oi_ratio,
            ComponentKind::VolumeZScore => self.volume_zscore,
            ComponentKind::RelativeVolume => self.relative_volume,
            ComponentKind::ContractZScore => self.contract_zscore,
            ComponentKind::Sweep => self.sweep,
            ComponentKind::Microstructure => self.microstructure,
            ComponentKind::SkewAlignment => self.skew_alignment,
            ComponentKind::InsiderPut => self.insider_put,
            ComponentKind::GammaProximity => self.gamma_proximity,
            ComponentKind::Positioning => self.positioning,
        }
    }

    pub fn total(&self) -> f64 {
        ComponentKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

/// Per-trade minimums
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimumConfig {
    /// Default: 500
    pub min_volume: u64,
    /// Default: $25,000
    pub min_notional: f64,
    /// Default: 8.0
    pub min_volume_oi_ratio: f64,
    /// Checked only when the relative-volume detector is applicable
    /// Default: 5.0
    pub min_relative_volume: f64,
}

impl Default for MinimumConfig {
    fn default() -> Self {
        Self {
            min_volume: 500,
            min_notional: 25_000.0,
            min_volume_oi_ratio: 8.0,
            min_relative_volume: 5.0,
        }
    }
}

/// Regime adjustment factors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeMultipliers {
    /// Default: 1.0
    pub risk_on: f64,
    /// Applied to puts in a risk-off tape
    /// Default: 1.15
    pub risk_off_bearish: f64,
    /// Applied to calls in a risk-off tape
    /// Default: 1.0
    pub risk_off_bullish: f64,
    /// Skepticism discount for every trade
    /// Default: 0.85
    pub high_volatility: f64,
}

impl Default for RegimeMultipliers {
    fn default() -> Self {
        Self {
            risk_on: 1.0,
            risk_off_bearish: 1.15,
            risk_off_bullish: 1.0,
            high_volatility: 0.85,
        }
    }
}

impl RegimeMultipliers {
    pub fn factor(&self, regime: RegimeState, right: OptionRight) -> f64 {
        match regime {
            RegimeState::RiskOn => self.risk_on,
            RegimeState::RiskOff if right.is_bearish() => self.risk_off_bearish,
            RegimeState::RiskOff => self.risk_off_bullish,
            RegimeState::HighVolatility => self.high_volatility,
        }
    }
}
