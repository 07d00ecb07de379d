//! Engine configuration
//!
//! One typed structure for every threshold and weight the engine uses,
//! loaded from JSON and validated once at startup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{FlowError, FlowResult};
use crate::detectors::{DetectorConfig, ThresholdConfig};
use crate::exposure::ExposureConfig;
use crate::memory::MemoryConfig;
use crate::regime::RegimeConfig;
use crate::scoring::{ComponentKind, ScoringConfig};

/// Full engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pricing: PricingConfig,
    pub exposure: ExposureConfig,
    pub detectors: DetectorConfig,
    pub regime: RegimeConfig,
    pub memory: MemoryConfig,
    pub scoring: ScoringConfig,
    pub cycle: CycleConfig,
}

/// Pricing inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Continuously compounded risk-free rate
    /// Default: 0.045
    pub risk_free_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.045,
        }
    }
}

/// Scan cycle limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Tickers beyond this count are skipped
    /// Default: 50
    pub max_tickers: usize,

    /// Sessions used when building volume baselines
    /// Default: 30
    pub baseline_lookback_days: usize,

    /// Score contracts on the rayon pool
    /// Default: true
    pub parallel: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_tickers: 50,
            baseline_lookback_days: 30,
            parallel: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate
    pub fn from_json_str(json: &str) -> FlowResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate
    pub fn from_json_file(path: impl AsRef<Path>) -> FlowResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> FlowResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> FlowResult<()> {
        let rate = self.pricing.risk_free_rate;
        if !rate.is_finite() || rate.abs() > 1.0 {
            return Err(FlowError::config(format!("risk_free_rate {} out of range", rate)));
        }

        if !(self.exposure.contract_multiplier > 0.0) {
            return Err(FlowError::config("contract_multiplier must be positive"));
        }

        let d = &self.detectors;
        check_threshold("volume_oi", &d.volume_oi)?;
        check_threshold("volume_zscore", &d.volume_zscore)?;
        check_threshold("relative_volume", &d.relative_volume)?;
        check_threshold("contract_zscore", &d.contract_zscore)?;
        check_threshold("microstructure.iceberg", &d.microstructure.iceberg)?;
        check_threshold("skew.alignment", &d.skew.alignment)?;
        check_threshold("insider.ratio", &d.insider.ratio)?;
        if d.microstructure.min_bars < 2 || !(d.microstructure.min_range > 0.0) {
            return Err(FlowError::config(
                "microstructure needs min_bars >= 2 and a positive min_range",
            ));
        }
        if !(d.skew.max_otm_pct > 0.0) {
            return Err(FlowError::config("skew.max_otm_pct must be positive"));
        }
        if d.insider.max_dte < 0 {
            return Err(FlowError::config("insider.max_dte must be non-negative"));
        }
        if d.min_baseline_samples < 2 {
            return Err(FlowError::config("min_baseline_samples must be at least 2"));
        }
        if !(0.0..=0.5).contains(&d.sweep.aggressor_band) {
            return Err(FlowError::config("sweep.aggressor_band must be in [0, 0.5]"));
        }
        if !(d.sweep.trv_saturation > 0.0) || d.sweep.trv_threshold < 0.0 {
            return Err(FlowError::config("sweep tick-relative-volume settings invalid"));
        }
        if !(0.0..1.0).contains(&d.legs.volume_tolerance) {
            return Err(FlowError::config("legs.volume_tolerance must be in [0, 1)"));
        }

        let r = &self.regime;
        if !(r.vol_level_ceiling > 0.0) || !(r.vol_change_ceiling > 0.0) {
            return Err(FlowError::config("regime volatility ceilings must be positive"));
        }
        if !r.index_return_floor.is_finite() {
            return Err(FlowError::config("regime index_return_floor must be finite"));
        }

        let m = &self.memory;
        if !(m.min_weight > 0.0) || m.min_weight > 1.0 || m.max_weight < 1.0 {
            return Err(FlowError::config(format!(
                "memory weight bounds [{}, {}] must bracket 1.0",
                m.min_weight, m.max_weight
            )));
        }
        if m.sensitivity < 0.0 || m.damping < 0.0 {
            return Err(FlowError::config("memory sensitivity and damping must be non-negative"));
        }
        let t = &m.trust;
        if !(t.min_score > 0.0)
            || t.max_score < t.min_score
            || !(t.min_score..=t.max_score).contains(&t.initial)
        {
            return Err(FlowError::config(format!(
                "trust score {} outside [{}, {}]",
                t.initial, t.min_score, t.max_score
            )));
        }
        if t.penalty < 0.0 || t.reward < 0.0 || !(0.0..=1.0).contains(&t.discrepancy_ratio) {
            return Err(FlowError::config("trust penalty, reward or discrepancy_ratio invalid"));
        }

        let s = &self.scoring;
        for kind in ComponentKind::ALL {
            let w = s.weights.get(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(FlowError::config(format!("weight for {:?} is {}", kind, w)));
            }
        }
        if !(s.weights.total() > 0.0) {
            return Err(FlowError::config("component weights sum to zero"));
        }
        if !(s.volume_saturation > 0.0) || !(s.notional_saturation > 0.0) {
            return Err(FlowError::config("score saturations must be positive"));
        }
        if s.minimums.min_notional < 0.0
            || s.minimums.min_volume_oi_ratio < 0.0
            || s.minimums.min_relative_volume < 0.0
        {
            return Err(FlowError::config("minimums must be non-negative"));
        }
        if s.bypass_threshold < s.high_conviction_threshold {
            return Err(FlowError::config(format!(
                "bypass_threshold {} below high_conviction_threshold {}",
                s.bypass_threshold, s.high_conviction_threshold
            )));
        }
        let mult = &s.regime;
        for (name, v) in [
            ("risk_on", mult.risk_on),
            ("risk_off_bearish", mult.risk_off_bearish),
            ("risk_off_bullish", mult.risk_off_bullish),
            ("high_volatility", mult.high_volatility),
        ] {
            if !(v > 0.0) || !v.is_finite() {
                return Err(FlowError::config(format!("regime multiplier {} is {}", name, v)));
            }
        }
        if !(s.proximity_band_pct >= 0.0) {
            return Err(FlowError::config("proximity_band_pct must be non-negative"));
        }

        let c = &self.cycle;
        if c.max_tickers == 0 {
            return Err(FlowError::config("max_tickers must be positive"));
        }
        if c.baseline_lookback_days < d.min_baseline_samples {
            return Err(FlowError::config(format!(
                "baseline_lookback_days {} shorter than min_baseline_samples {}",
                c.baseline_lookback_days, d.min_baseline_samples
            )));
        }

        Ok(())
    }
}

fn check_threshold(name: &str, cfg: &ThresholdConfig) -> FlowResult<()> {
    if !cfg.threshold.is_finite() || cfg.threshold < 0.0 {
        return Err(FlowError::config(format!("{}.threshold is {}", name, cfg.threshold)));
    }
    if !(cfg.saturation > 0.0) {
        return Err(FlowError::config(format!("{}.saturation must be positive", name)));
    }
    Ok(())
}
