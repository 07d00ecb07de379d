//! Dealer Exposure Aggregation (GEX)
//!
//! Aggregates per-strike dealer gamma, vanna and charm exposure across a
//! ticker's full chain and derives the levels hedging flows gravitate to.
//!
//! Two-stage pipeline:
//! 1. **Aggregation**: OI x multiplier x greek x dealer sign, summed per strike
//! 2. **Key levels**: call wall, put wall, zero-gamma flip

mod aggregator;
mod config;
mod levels;

pub use aggregator::*;
pub use config::*;
pub use levels::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Strike in thousandths, used as an exact ordered map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrikeKey(i64);

impl StrikeKey {
    pub fn from_strike(strike: f64) -> Self {
        StrikeKey((strike * 1000.0).round() as i64)
    }
}

/// Aggregated exposure at one strike
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeExposure {
    pub strike: f64,
    pub net_gamma: f64,
    pub net_vanna: f64,
    pub net_charm: f64,
    /// Open interest across calls and puts at this strike
    pub open_interest: u64,
    /// Contracts aggregated into this strike
    pub contracts: usize,
}

impl StrikeExposure {
    pub fn empty(strike: f64) -> Self {
        Self {
            strike,
            net_gamma: 0.0,
            net_vanna: 0.0,
            net_charm: 0.0,
            open_interest: 0,
            contracts: 0,
        }
    }
}

/// A chain entry excluded from aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureRejection {
    pub contract: String,
    pub reason: String,
}

/// Ordered strike -> exposure map for one ticker
#[derive(Debug, Clone)]
pub struct ExposureMap {
    pub ticker: String,
    /// Spot used as the tie-break reference
    pub spot: f64,
    strikes: BTreeMap<StrikeKey, StrikeExposure>,
    /// Entries that were individually invalid
    pub rejected: Vec<ExposureRejection>,
}

impl ExposureMap {
    /// Levels in ascending strike order
    pub fn levels(&self) -> impl Iterator<Item = &StrikeExposure> {
        self.strikes.values()
    }

    /// Exposure at a strike
    pub fn entry(&self, strike: f64) -> Option<&StrikeExposure> {
        self.strikes.get(&StrikeKey::from_strike(strike))
    }

    pub fn len(&self) -> usize {
        self.strikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Net gamma across the chain
    pub fn total_gamma(&self) -> f64 {
        self.levels().map(|l| l.net_gamma).sum()
    }

    /// Net vanna across the chain
    pub fn total_vanna(&self) -> f64 {
        self.levels().map(|l| l.net_vanna).sum()
    }

    /// Net charm across the chain
    pub fn total_charm(&self) -> f64 {
        self.levels().map(|l| l.net_charm).sum()
    }

    /// Compute walls and flip once
    pub fn key_levels(&self) -> KeyLevels {
        KeyLevels {
            call_wall: call_wall(self),
            put_wall: put_wall(self),
            zero_gamma_flip: find_zero_gamma_flip(self),
            total_gamma: self.total_gamma(),
            total_vanna: self.total_vanna(),
            total_charm: self.total_charm(),
        }
    }
}

/// Summary levels of an exposure map
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
    pub call_wall: Option<f64>,
    pub put_wall: Option<f64>,
    pub zero_gamma_flip: Option<f64>,
    pub total_gamma: f64,
    pub total_vanna: f64,
    pub total_charm: f64,
}

impl KeyLevels {
    /// Distance from a strike to the nearest defined key level
    pub fn nearest_distance(&self, strike: f64) -> Option<f64> {
        [self.zero_gamma_flip, self.call_wall, self.put_wall]
            .into_iter()
            .flatten()
            .map(|level| (strike - level).abs())
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}
