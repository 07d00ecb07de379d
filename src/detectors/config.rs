//! Configuration for the anomaly detectors

use serde::{Deserialize, Serialize};

/// Threshold plus saturation for a ratio-style detector
///
/// Strength is `raw / saturation` clamped to [0, 1]; the detector passes
/// when `raw` exceeds `threshold`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub threshold: f64,
    pub saturation: f64,
}

impl ThresholdConfig {
    pub fn new(threshold: f64, saturation: f64) -> Self {
        Self {
            threshold,
            saturation,
        }
    }

    /// Bounded strength in [0, 1]
    pub fn strength(&self, raw: f64) -> f64 {
        if self.saturation > 0.0 && raw.is_finite() {
            (raw / self.saturation).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Strictly above the threshold
    pub fn passes(&self, raw: f64) -> bool {
        raw > self.threshold
    }
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Volume / open interest
    /// Default: threshold 8.0, saturation 20.0
    pub volume_oi: ThresholdConfig,

    /// Underlying session volume z-score vs rolling baseline
    /// Default: threshold 2.0, saturation 4.0
    pub volume_zscore: ThresholdConfig,

    /// Minimum baseline sessions before a z-score is meaningful
    /// Default: 6
    pub min_baseline_samples: usize,

    /// Contract volume / historical average contract volume
    /// Default: threshold 5.0, saturation 15.0
    pub relative_volume: ThresholdConfig,

    /// Contract volume z-score vs the contract's own daily history
    /// Default: threshold 3.0, saturation 6.0
    pub contract_zscore: ThresholdConfig,

    /// Iceberg absorption in the underlying tape
    pub microstructure: MicrostructureConfig,

    /// Chain volatility skew
    pub skew: SkewConfig,

    /// Quiet put accumulation
    pub insider: InsiderConfig,

    /// Sweep / VWAP verification
    pub sweep: SweepConfig,

    /// Multi-leg linkage
    pub legs: LegConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            volume_oi: ThresholdConfig::new(8.0, 20.0),
            volume_zscore: ThresholdConfig::new(2.0, 4.0),
            min_baseline_samples: 6,
            relative_volume: ThresholdConfig::new(5.0, 15.0),
            contract_zscore: ThresholdConfig::new(3.0, 6.0),
            microstructure: MicrostructureConfig::default(),
            skew: SkewConfig::default(),
            insider: InsiderConfig::default(),
            sweep: SweepConfig::default(),
            legs: LegConfig::default(),
        }
    }
}

/// Sweep detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Fraction of the spread, measured from each side, that counts as
    /// "at the ask" / "at the bid"
    /// Default: 0.25
    pub aggressor_band: f64,

    /// Tick-relative volume an ask-side print must exceed to count as a sweep
    /// Default: 2.0
    pub trv_threshold: f64,

    /// Tick-relative volume at which the sweep strength saturates
    /// Default: 4.0
    pub trv_saturation: f64,

    /// VWAP divergence (fraction) below which direction is ignored
    /// Default: 0.001
    pub min_vwap_divergence: f64,

    /// Strength penalty when the underlying trades against the option's direction
    /// Default: 0.5
    pub misalignment_penalty: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            aggressor_band: 0.25,
            trv_threshold: 2.0,
            trv_saturation: 4.0,
            min_vwap_divergence: 0.001,
            misalignment_penalty: 0.5,
        }
    }
}

/// Iceberg detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrostructureConfig {
    /// Iceberg z-score of the latest bar's volume density
    /// Default: threshold 3.0, saturation 6.0
    pub iceberg: ThresholdConfig,

    /// Earlier bars needed before the latest one is judged
    /// Default: 10
    pub min_bars: usize,

    /// Floor on a bar's high-low range, in price units
    /// Default: 0.01
    pub min_range: f64,
}

impl Default for MicrostructureConfig {
    fn default() -> Self {
        Self {
            iceberg: ThresholdConfig::new(3.0, 6.0),
            min_bars: 10,
            min_range: 0.01,
        }
    }
}

/// Volatility skew configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    /// Widest OTM distance (percent) included in either wing
    /// Default: 20.0
    pub max_otm_pct: f64,

    /// Directional skew (volatility points) that sets the bias and passes the
    /// alignment check
    /// Default: threshold 0.02, saturation 0.10
    pub alignment: ThresholdConfig,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            max_otm_pct: 20.0,
            alignment: ThresholdConfig::new(0.02, 0.10),
        }
    }
}

/// Quiet put accumulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsiderConfig {
    /// Longest expiry, in calendar days
    /// Default: 21
    pub max_dte: i64,

    /// Volume / open interest on the put
    /// Default: threshold 10.0, saturation 50.0
    pub ratio: ThresholdConfig,
}

impl Default for InsiderConfig {
    fn default() -> Self {
        Self {
            max_dte: 21,
            ratio: ThresholdConfig::new(10.0, 50.0),
        }
    }
}

/// Leg linkage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegConfig {
    /// Maximum relative volume difference between linked legs
    /// Default: 0.05
    pub volume_tolerance: f64,

    /// Legs below this volume are never linked
    /// Default: 100
    pub min_leg_volume: u64,
}

impl Default for LegConfig {
    fn default() -> Self {
        Self {
            volume_tolerance: 0.05,
            min_leg_volume: 100,
        }
    }
}
