//! Configuration for the historical memory index

use serde::{Deserialize, Serialize};

use super::TrustConfig;

/// Memory weighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Lower clamp on the memory weight
    /// Default: 0.5
    pub min_weight: f64,

    /// Upper clamp on the memory weight
    /// Default: 1.5
    pub max_weight: f64,

    /// Weight change per unit of win-rate edge over 0.5, at full confidence
    /// Default: 2.0
    pub sensitivity: f64,

    /// Sample count at which confidence reaches one half
    /// Default: 10.0
    pub damping: f64,

    /// Rules for closing and grading tracked trades
    pub outcome: OutcomePolicy,

    /// Per-ticker clearing trust score
    pub trust: TrustConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            min_weight: 0.5,
            max_weight: 1.5,
            sensitivity: 2.0,
            damping: 10.0,
            outcome: OutcomePolicy::default(),
            trust: TrustConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Confidence in [0, 1) from sample count
    pub fn confidence(&self, sample_count: u32) -> f64 {
        let n = sample_count as f64;
        if n <= 0.0 {
            0.0
        } else {
            n / (n + self.damping.max(0.0))
        }
    }

    /// Bounded multiplier for a win rate and sample count
    ///
    /// Monotonic non-decreasing in win rate; for a win rate above 0.5 also
    /// non-decreasing in sample count. No history is exactly neutral.
    pub fn weight(&self, win_rate: f64, sample_count: u32) -> f64 {
        if sample_count == 0 || !win_rate.is_finite() {
            return 1.0;
        }
        let edge = win_rate.clamp(0.0, 1.0) - 0.5;
        let w = 1.0 + edge * self.sensitivity * self.confidence(sample_count);
        w.clamp(self.min_weight, self.max_weight)
    }
}

/// Closing and grading rules for tracked trades
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomePolicy {
    /// Trades are graded once they have been open this many days
    /// Default: 7
    pub max_holding_days: i64,

    /// |P/L| percent that closes a trade early
    /// Default: 20.0
    pub exit_move_pct: f64,

    /// P/L percent above which a closed trade counts as rewarded
    /// Default: 15.0
    pub reward_pct: f64,

    /// P/L percent below which a closed trade counts as a trap
    /// Default: -10.0
    pub trap_pct: f64,
}

impl Default for OutcomePolicy {
    fn default() -> Self {
        Self {
            max_holding_days: 7,
            exit_move_pct: 20.0,
            reward_pct: 15.0,
            trap_pct: -10.0,
        }
    }
}
