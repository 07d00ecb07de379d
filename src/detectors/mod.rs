//! Anomaly Detectors
//!
//! Independent statistical checks over one contract, its underlying snapshot
//! and historical baselines. Each produces a bounded strength in [0, 1] and a
//! pass/fail against its configured threshold.
//!
//! Detectors:
//! - **Volume/OI**: session volume against open interest
//! - **Volume z-score**: underlying session volume against its rolling baseline
//! - **Relative volume**: contract volume against its own history
//! - **Contract z-score**: contract volume against its own daily dispersion
//! - **Sweep**: print location in the spread, confirmed by the intraday tape
//! - **Microstructure**: iceberg absorption in the underlying's latest bar
//! - **Skew alignment**: chain volatility skew agreeing with the contract's right
//! - **Insider put**: quiet accumulation of short-dated OTM puts
//!
//! A detector without enough history reports "not applicable" instead of a
//! zero signal; the scoring engine excludes it from the weighted sum.

mod config;
mod insider;
mod legs;
mod microstructure;
mod skew;
mod sweep;
mod volume;

pub use config::*;
pub use insider::*;
pub use legs::*;
pub use microstructure::*;
pub use skew::*;
pub use sweep::*;
pub use volume::*;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{ContractBaseline, FlowError, FlowResult, OptionQuote, UnderlyingSnapshot};

/// Which detector produced a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    VolumeOiRatio,
    VolumeZScore,
    RelativeVolume,
    ContractZScore,
    Sweep,
    Microstructure,
    SkewAlignment,
    InsiderPut,
}

impl DetectorKind {
    pub fn label(&self) -> &'static str {
        match self {
            DetectorKind::VolumeOiRatio => "Vol/OI",
            DetectorKind::VolumeZScore => "Volume Z",
            DetectorKind::RelativeVolume => "Rel Vol",
            DetectorKind::ContractZScore => "Contract Z",
            DetectorKind::Sweep => "Sweep",
            DetectorKind::Microstructure => "Iceberg Z",
            DetectorKind::SkewAlignment => "Skew",
            DetectorKind::InsiderPut => "Insider Put",
        }
    }
}

/// Bounded detector output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorSignal {
    pub kind: DetectorKind,
    /// Unbounded raw statistic (ratio, z-score, tick-relative volume)
    pub raw: f64,
    /// Strength in [0, 1]
    pub strength: f64,
    /// Raw statistic met the configured threshold
    pub passed: bool,
}

impl DetectorSignal {
    pub fn from_raw(kind: DetectorKind, raw: f64, config: &ThresholdConfig) -> Self {
        Self {
            kind,
            raw,
            strength: config.strength(raw),
            passed: config.passes(raw),
        }
    }
}

/// A detector's signal, or the reason it could not be evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectorReading {
    Signal(DetectorSignal),
    NotApplicable { kind: DetectorKind, reason: String },
}

impl DetectorReading {
    /// Map a detector result, turning a missing baseline into "not applicable"
    ///
    /// Any other error is returned unchanged.
    pub fn from_result(kind: DetectorKind, result: FlowResult<DetectorSignal>) -> FlowResult<Self> {
        match result {
            Ok(signal) => Ok(DetectorReading::Signal(signal)),
            Err(FlowError::InsufficientBaseline(reason)) => {
                Ok(DetectorReading::NotApplicable { kind, reason })
            }
            Err(e) => Err(e),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            DetectorReading::Signal(s) => s.kind,
            DetectorReading::NotApplicable { kind, .. } => *kind,
        }
    }

    pub fn signal(&self) -> Option<&DetectorSignal> {
        match self {
            DetectorReading::Signal(s) => Some(s),
            DetectorReading::NotApplicable { .. } => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        self.signal().is_some()
    }

    /// Applicable and above threshold
    pub fn passed(&self) -> bool {
        self.signal().map_or(false, |s| s.passed)
    }
}

/// Everything besides the quote that the detectors look at
#[derive(Debug, Clone, Copy)]
pub struct DetectorContext<'a> {
    pub underlying: &'a UnderlyingSnapshot,
    pub contract_baseline: Option<&'a ContractBaseline>,
    pub leg_link: Option<&'a LegLink>,
    /// Skew of the contract's chain, when both wings were priced
    pub skew: Option<&'a VolatilitySkew>,
    /// Volatility the contract was priced at
    pub implied_vol: Option<f64>,
}

impl<'a> DetectorContext<'a> {
    /// Context with only the underlying; every optional input absent
    pub fn new(underlying: &'a UnderlyingSnapshot) -> Self {
        Self {
            underlying,
            contract_baseline: None,
            leg_link: None,
            skew: None,
            implied_vol: None,
        }
    }
}

/// All detector readings for one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSignals {
    pub volume_oi: DetectorReading,
    pub volume_zscore: DetectorReading,
    pub relative_volume: DetectorReading,
    pub contract_zscore: DetectorReading,
    pub sweep: DetectorReading,
    pub microstructure: DetectorReading,
    pub skew_alignment: DetectorReading,
    pub insider_put: DetectorReading,
    /// Present whenever the sweep detector was applicable
    pub sweep_verdict: Option<SweepVerdict>,
    /// Present whenever the iceberg check was applicable
    pub microstructure_reading: Option<MicrostructureReading>,
    /// Chain skew the contract was judged against
    pub skew: Option<VolatilitySkew>,
    /// Present when the contract was paired with another leg
    pub leg_link: Option<LegLink>,
}

impl DetectorSignals {
    /// Readings in a fixed order
    pub fn readings(&self) -> impl Iterator<Item = &DetectorReading> {
        [
            &self.volume_oi,
            &self.volume_zscore,
            &self.relative_volume,
            &self.contract_zscore,
            &self.sweep,
            &self.microstructure,
            &self.skew_alignment,
            &self.insider_put,
        ]
        .into_iter()
    }

    pub fn get(&self, kind: DetectorKind) -> &DetectorReading {
        match kind {
            DetectorKind::VolumeOiRatio => &self.volume_oi,
            DetectorKind::VolumeZScore => &self.volume_zscore,
            DetectorKind::RelativeVolume => &self.relative_volume,
            DetectorKind::ContractZScore => &self.contract_zscore,
            DetectorKind::Sweep => &self.sweep,
            DetectorKind::Microstructure => &self.microstructure,
            DetectorKind::SkewAlignment => &self.skew_alignment,
            DetectorKind::InsiderPut => &self.insider_put,
        }
    }

    /// Chain skew bias, if the chain had one
    pub fn skew_bias(&self) -> Option<SkewBias> {
        self.skew.map(|s| s.bias)
    }

    /// Sweep tier, `Ambiguous` when the sweep check was not applicable
    pub fn conviction_tier(&self) -> ConvictionTier {
        self.sweep_verdict
            .map(|v| v.tier)
            .unwrap_or(ConvictionTier::Ambiguous)
    }
}

/// Run every detector for one contract
///
/// Detectors are independent; a missing baseline makes a single reading
/// not applicable without affecting the others.
pub fn run_detectors(
    quote: &OptionQuote,
    context: &DetectorContext<'_>,
    config: &DetectorConfig,
) -> FlowResult<DetectorSignals> {
    let underlying = context.underlying;
    let contract_baseline = context.contract_baseline;

    let volume_oi = DetectorReading::Signal(volume_oi_signal(quote, &config.volume_oi));

    let volume_zscore = DetectorReading::from_result(
        DetectorKind::VolumeZScore,
        volume_zscore_signal(underlying, config.min_baseline_samples, &config.volume_zscore),
    )?;

    let relative_volume = DetectorReading::from_result(
        DetectorKind::RelativeVolume,
        relative_volume_signal(quote, contract_baseline, &config.relative_volume),
    )?;

    let contract_zscore = DetectorReading::from_result(
        DetectorKind::ContractZScore,
        contract_zscore_signal(
            quote,
            contract_baseline,
            config.min_baseline_samples,
            &config.contract_zscore,
        ),
    )?;

    let (sweep, sweep_verdict) = match sweep_signal(quote, underlying, &config.sweep) {
        Ok((signal, verdict)) => (DetectorReading::Signal(signal), Some(verdict)),
        Err(e) => (DetectorReading::from_result(DetectorKind::Sweep, Err(e))?, None),
    };

    let (microstructure, microstructure_reading) =
        match microstructure_signal(underlying, &config.microstructure) {
            Ok((signal, reading)) => (DetectorReading::Signal(signal), Some(reading)),
            Err(e) => (DetectorReading::from_result(DetectorKind::Microstructure, Err(e))?, None),
        };

    let skew_alignment = DetectorReading::from_result(
        DetectorKind::SkewAlignment,
        skew_alignment_signal(quote, context.skew, &config.skew),
    )?;

    let insider_put = insider_put_reading(quote, context.implied_vol, context.skew, &config.insider);

    let signals = DetectorSignals {
        volume_oi,
        volume_zscore,
        relative_volume,
        contract_zscore,
        sweep,
        microstructure,
        skew_alignment,
        insider_put,
        sweep_verdict,
        microstructure_reading,
        skew: context.skew.copied(),
        leg_link: context.leg_link.cloned(),
    };

    debug!(
        contract = %quote.contract_symbol(),
        applicable = signals.readings().filter(|r| r.is_applicable()).count(),
        passed = signals.readings().filter(|r| r.passed()).count(),
        "detectors evaluated"
    );

    Ok(signals)
}
