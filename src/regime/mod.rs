//! Market Regime Classification
//!
//! Labels the macro backdrop once per scan cycle from a broad index and a
//! volatility index. The result is passed explicitly into scoring; nothing
//! downstream reads it as ambient state.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{FlowError, FlowResult};

/// Macro state for one scan cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeState {
    RiskOn,
    RiskOff,
    HighVolatility,
}

impl RegimeState {
    pub fn label(&self) -> &'static str {
        match self {
            RegimeState::RiskOn => "Risk-On",
            RegimeState::RiskOff => "Risk-Off",
            RegimeState::HighVolatility => "High Volatility",
        }
    }
}

/// Broad index observation (e.g. SPY)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub symbol: String,
    pub last: f64,
    /// Price at the start of the short return window
    pub reference: f64,
}

impl IndexSnapshot {
    /// Short-window simple return
    pub fn short_return(&self) -> f64 {
        self.last / self.reference - 1.0
    }
}

/// Volatility index observation (e.g. VIX)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityIndexSnapshot {
    pub symbol: String,
    pub level: f64,
    pub previous_close: f64,
}

impl VolatilityIndexSnapshot {
    /// Day-over-day relative change
    pub fn day_change(&self) -> f64 {
        self.level / self.previous_close - 1.0
    }
}

/// Regime thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Volatility index level above which the regime is high-vol
    /// Default: 25.0
    pub vol_level_ceiling: f64,

    /// Day-over-day volatility index change (fraction) above which the
    /// regime is high-vol
    /// Default: 0.10
    pub vol_change_ceiling: f64,

    /// Index return (fraction) below which the regime is risk-off
    /// Default: -0.005
    pub index_return_floor: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            vol_level_ceiling: 25.0,
            vol_change_ceiling: 0.10,
            index_return_floor: -0.005,
        }
    }
}

/// Classified regime with the inputs that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeAssessment {
    pub state: RegimeState,
    pub index_return: f64,
    pub vol_level: f64,
    pub vol_change: f64,
}

fn positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Classify the cycle's regime
///
/// Thresholds are strict: a reading exactly at a ceiling or floor does not
/// trip it. High volatility takes precedence over risk-off. Non-positive or
/// non-finite inputs cannot be classified and fail the cycle.
pub fn classify_regime(
    index: &IndexSnapshot,
    vol_index: &VolatilityIndexSnapshot,
    config: &RegimeConfig,
) -> FlowResult<RegimeAssessment> {
    if !positive_finite(index.last) || !positive_finite(index.reference) {
        return Err(FlowError::regime_unavailable(format!(
            "{}: invalid index prices ({}, {})",
            index.symbol, index.last, index.reference
        )));
    }
    if !positive_finite(vol_index.level) || !positive_finite(vol_index.previous_close) {
        return Err(FlowError::regime_unavailable(format!(
            "{}: invalid volatility index ({}, {})",
            vol_index.symbol, vol_index.level, vol_index.previous_close
        )));
    }

    let index_return = index.short_return();
    let vol_change = vol_index.day_change();

    let state = if vol_index.level > config.vol_level_ceiling
        || vol_change > config.vol_change_ceiling
    {
        RegimeState::HighVolatility
    } else if index_return < config.index_return_floor {
        RegimeState::RiskOff
    } else {
        RegimeState::RiskOn
    };

    info!(
        regime = state.label(),
        index_return,
        vol_level = vol_index.level,
        vol_change,
        "regime classified"
    );

    Ok(RegimeAssessment {
        state,
        index_return,
        vol_level: vol_index.level,
        vol_change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spy(last: f64) -> IndexSnapshot {
        IndexSnapshot {
            symbol: "SPY".into(),
            last,
            reference: 500.0,
        }
    }

    fn vix(level: f64, previous_close: f64) -> VolatilityIndexSnapshot {
        VolatilityIndexSnapshot {
            symbol: "VIX".into(),
            level,
            previous_close,
        }
    }

    #[test]
    fn test_risk_on() {
        let r = classify_regime(&spy(503.0), &vix(14.0, 14.5), &RegimeConfig::default()).unwrap();
        assert_eq!(r.state, RegimeState::RiskOn);
        assert!((r.index_return - 0.006).abs() < 1e-12);
    }

    #[test]
    fn test_risk_off() {
        let r = classify_regime(&spy(495.0), &vix(18.0, 17.0), &RegimeConfig::default()).unwrap();
        assert_eq!(r.state, RegimeState::RiskOff);
    }

    #[test]
    fn test_high_vol_by_level_and_change() {
        let cfg = RegimeConfig::default();
        assert_eq!(
            classify_regime(&spy(495.0), &vix(30.0, 29.0), &cfg).unwrap().state,
            RegimeState::HighVolatility
        );
        // 15 -> 17 is +13%
        assert_eq!(
            classify_regime(&spy(503.0), &vix(17.0, 15.0), &cfg).unwrap().state,
            RegimeState::HighVolatility
        );
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        // Zero ceilings and floor, so every boundary reading is exact
        let cfg = RegimeConfig {
            vol_level_ceiling: 25.0,
            vol_change_ceiling: 0.0,
            index_return_floor: 0.0,
        };

        // Level exactly at the ceiling, falling day over day
        let at_level = classify_regime(&spy(503.0), &vix(25.0, 26.0), &cfg).unwrap();
        assert_eq!(at_level.state, RegimeState::RiskOn);
        let above = classify_regime(&spy(503.0), &vix(25.5, 26.0), &cfg).unwrap();
        assert_eq!(above.state, RegimeState::HighVolatility);

        // Unchanged volatility index: change exactly at the ceiling
        let flat = classify_regime(&spy(503.0), &vix(14.0, 14.0), &cfg).unwrap();
        assert_eq!(flat.vol_change, 0.0);
        assert_eq!(flat.state, RegimeState::RiskOn);

        // Flat index: return exactly at the floor
        let unchanged = classify_regime(&spy(500.0), &vix(14.0, 14.5), &cfg).unwrap();
        assert_eq!(unchanged.index_return, 0.0);
        assert_eq!(unchanged.state, RegimeState::RiskOn);
        let down = classify_regime(&spy(499.0), &vix(14.0, 14.5), &cfg).unwrap();
        assert_eq!(down.state, RegimeState::RiskOff);
    }

    #[test]
    fn test_level_at_default_ceiling_with_small_rise() {
        // 24.9 -> 25.0 is +0.4%, under the 10% change ceiling
        let r = classify_regime(&spy(503.0), &vix(25.0, 24.9), &RegimeConfig::default()).unwrap();
        assert_eq!(r.state, RegimeState::RiskOn);
    }

    #[test]
    fn test_invalid_inputs_unavailable() {
        let cfg = RegimeConfig::default();
        let err = classify_regime(&spy(0.0), &vix(14.0, 14.0), &cfg).unwrap_err();
        assert!(matches!(err, FlowError::RegimeUnavailable(_)));
        assert!(classify_regime(&spy(500.0), &vix(f64::NAN, 14.0), &cfg).is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&RegimeState::HighVolatility).unwrap();
        assert_eq!(json, "\"HIGH_VOLATILITY\"");
    }
}
