//! Underlying equity data
//!
//! Per-cycle snapshot of the underlying plus the rolling baselines the
//! statistical detectors compare against. Baselines are refreshed by the
//! baseline-sync collaborator; the scoring engine only reads them.

use serde::{Deserialize, Serialize};

use super::error::{FlowError, FlowResult};

/// Rolling daily volume baseline for an underlying
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBaseline {
    /// Mean daily volume over the lookback window
    pub mean: f64,
    /// Population standard deviation over the lookback window
    pub std_dev: f64,
    /// Sessions that went into the statistics
    pub samples: usize,
}

impl VolumeBaseline {
    pub fn new(mean: f64, std_dev: f64, samples: usize) -> Self {
        Self {
            mean,
            std_dev,
            samples,
        }
    }

    /// Build a baseline from daily volumes, most recent first
    ///
    /// Only the first `lookback` sessions are used. Fewer than `min_samples`
    /// usable sessions is an insufficient baseline, not a zero one.
    pub fn from_daily_volumes(
        volumes: &[f64],
        lookback: usize,
        min_samples: usize,
    ) -> FlowResult<Self> {
        let window: Vec<f64> = volumes
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .take(lookback)
            .collect();

        if window.len() < min_samples.max(1) {
            return Err(FlowError::insufficient_baseline(format!(
                "{} sessions available, {} required",
                window.len(),
                min_samples
            )));
        }

        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok(Self::new(mean, variance.sqrt(), window.len()))
    }
}

/// Historical per-contract averages (volume and open interest)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractBaseline {
    pub avg_volume: f64,
    /// Population std-dev of daily contract volume; zero when unknown
    #[serde(default)]
    pub volume_std_dev: f64,
    pub avg_open_interest: f64,
    pub samples: usize,
}

impl ContractBaseline {
    /// Build from daily (volume, open interest) pairs, most recent first
    pub fn from_history(days: &[(f64, f64)], lookback: usize) -> FlowResult<Self> {
        let window: Vec<(f64, f64)> = days
            .iter()
            .copied()
            .filter(|(v, oi)| v.is_finite() && *v >= 0.0 && oi.is_finite() && *oi >= 0.0)
            .take(lookback)
            .collect();

        if window.is_empty() {
            return Err(FlowError::insufficient_baseline("no contract history"));
        }

        let n = window.len() as f64;
        let avg_volume = window.iter().map(|(v, _)| v).sum::<f64>() / n;
        let avg_open_interest = window.iter().map(|(_, oi)| oi).sum::<f64>() / n;
        let variance = window
            .iter()
            .map(|(v, _)| (v - avg_volume).powi(2))
            .sum::<f64>()
            / n;

        Ok(Self {
            avg_volume,
            volume_std_dev: variance.sqrt(),
            avg_open_interest,
            samples: window.len(),
        })
    }
}

/// Underlying snapshot for one scan cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingSnapshot {
    pub ticker: String,
    /// Spot price
    pub price: f64,
    /// Intraday 1-minute prices (oldest first)
    #[serde(default)]
    pub minute_prices: Vec<f64>,
    /// Intraday 1-minute volumes, aligned with `minute_prices`
    #[serde(default)]
    pub minute_volumes: Vec<f64>,
    /// Intraday 1-minute highs, aligned with `minute_volumes`
    #[serde(default)]
    pub minute_highs: Vec<f64>,
    #[serde(default)]
    pub minute_lows: Vec<f64>,
    /// Rolling daily volume baseline, if the sync collaborator has one
    #[serde(default)]
    pub baseline: Option<VolumeBaseline>,
}

impl UnderlyingSnapshot {
    pub fn new(ticker: impl Into<String>, price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            minute_prices: Vec::new(),
            minute_volumes: Vec::new(),
            minute_highs: Vec::new(),
            minute_lows: Vec::new(),
            baseline: None,
        }
    }

    /// Attach an intraday series
    pub fn with_intraday(mut self, prices: Vec<f64>, volumes: Vec<f64>) -> Self {
        self.minute_prices = prices;
        self.minute_volumes = volumes;
        self
    }

    /// Attach per-bar high/low ranges
    pub fn with_ranges(mut self, highs: Vec<f64>, lows: Vec<f64>) -> Self {
        self.minute_highs = highs;
        self.minute_lows = lows;
        self
    }

    pub fn with_baseline(mut self, baseline: VolumeBaseline) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Volume traded so far this session
    pub fn session_volume(&self) -> f64 {
        self.minute_volumes.iter().filter(|v| v.is_finite()).sum()
    }

    /// Aligned (price, volume) bars with invalid entries dropped
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.minute_prices
            .iter()
            .zip(self.minute_volumes.iter())
            .map(|(&p, &v)| (p, v))
            .filter(|(p, v)| p.is_finite() && *p > 0.0 && v.is_finite() && *v >= 0.0)
    }

    /// Aligned (volume, high - low) bars with invalid entries dropped
    pub fn range_bars(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.minute_volumes
            .iter()
            .zip(self.minute_highs.iter().zip(self.minute_lows.iter()))
            .filter(|(v, (h, l))| {
                v.is_finite() && **v >= 0.0 && h.is_finite() && l.is_finite() && h >= l
            })
            .map(|(&v, (&h, &l))| (v, h - l))
    }

    /// Volume-weighted average price over the intraday series
    pub fn vwap(&self) -> Option<f64> {
        let (pq, q) = self
            .bars()
            .fold((0.0, 0.0), |(pq, q), (p, v)| (pq + p * v, q + v));

        if q > 0.0 {
            Some(pq / q)
        } else {
            None
        }
    }

    /// Last bar volume relative to the average bar volume
    pub fn tick_relative_volume(&self) -> Option<f64> {
        let volumes: Vec<f64> = self.bars().map(|(_, v)| v).collect();
        let last = *volumes.last()?;
        let mean = volumes.iter().sum::<f64>() / volumes.len() as f64;

        if mean > 0.0 {
            Some(last / mean)
        } else {
            None
        }
    }
}
