//! Clearing-house trust score
//!
//! Per-ticker multiplier that tracks how often the volume we alerted on was
//! later confirmed by the nightly clearing totals. Tickers whose feed shows
//! ghost volume drift down; verified ones drift back up.

use serde::{Deserialize, Serialize};

/// Outcome of checking alerted volume against cleared volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearingVerdict {
    Verified,
    /// Cleared volume fell short of what the feed reported
    Discrepancy,
}

/// Trust score configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Score for a ticker never audited
    /// Default: 1.0
    pub initial: f64,

    /// Lower clamp
    /// Default: 0.5
    pub min_score: f64,

    /// Upper clamp
    /// Default: 1.5
    pub max_score: f64,

    /// Cleared/reported ratio below which the alert counts as a discrepancy
    /// Default: 0.8
    pub discrepancy_ratio: f64,

    /// Score removed per discrepancy
    /// Default: 0.1
    pub penalty: f64,

    /// Score added per verified alert
    /// Default: 0.05
    pub reward: f64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            min_score: 0.5,
            max_score: 1.5,
            discrepancy_ratio: 0.8,
            penalty: 0.1,
            reward: 0.05,
        }
    }
}

impl TrustConfig {
    /// Grade one audit; `None` when nothing cleared for the ticker
    pub fn grade(&self, reported: f64, cleared: f64) -> Option<ClearingVerdict> {
        if !(cleared > 0.0) || !reported.is_finite() {
            return None;
        }
        if cleared < reported * self.discrepancy_ratio {
            Some(ClearingVerdict::Discrepancy)
        } else {
            Some(ClearingVerdict::Verified)
        }
    }

    /// Score after applying a verdict, clamped
    pub fn apply(&self, score: f64, verdict: ClearingVerdict) -> f64 {
        let next = match verdict {
            ClearingVerdict::Verified => score + self.reward,
            ClearingVerdict::Discrepancy => score - self.penalty,
        };
        self.clamp(next)
    }

    pub fn clamp(&self, score: f64) -> f64 {
        if !score.is_finite() {
            return self.initial;
        }
        score.clamp(self.min_score, self.max_score)
    }
}
