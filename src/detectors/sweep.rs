//! Sweep / VWAP verification
//!
//! Classifies where the option printed inside its spread and checks the
//! print against the underlying's intraday tape: VWAP divergence and the
//! last bar's volume relative to the session's average bar.

use serde::{Deserialize, Serialize};

use crate::core::{FlowError, FlowResult, OptionQuote, UnderlyingSnapshot};

use super::{DetectorKind, DetectorSignal, SweepConfig};

/// Where the trade sits on the urgency scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvictionTier {
    /// Ask-side print confirmed by tape volume
    Aggressive,
    /// Bid-side print
    Passive,
    /// Inside the spread, unconfirmed, or no two-sided market
    Ambiguous,
}

impl ConvictionTier {
    fn strength_factor(&self) -> f64 {
        match self {
            ConvictionTier::Aggressive => 1.0,
            ConvictionTier::Ambiguous => 0.5,
            ConvictionTier::Passive => 0.0,
        }
    }
}

/// Outcome of the sweep check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepVerdict {
    pub tier: ConvictionTier,
    /// (spot - VWAP) / VWAP
    pub vwap_divergence: f64,
    /// Last bar volume / average bar volume
    pub tick_relative_volume: f64,
}

/// Position of the print relative to the quoted spread
fn classify_print(quote: &OptionQuote, trv: f64, config: &SweepConfig) -> ConvictionTier {
    if !(quote.bid > 0.0) || !(quote.ask > quote.bid) || !(quote.last > 0.0) {
        return ConvictionTier::Ambiguous;
    }

    let band = config.aggressor_band * (quote.ask - quote.bid);
    let ask_side = quote.last >= quote.ask - band;
    let bid_side = quote.last <= quote.bid + band;

    if ask_side && trv > config.trv_threshold {
        ConvictionTier::Aggressive
    } else if bid_side {
        ConvictionTier::Passive
    } else {
        ConvictionTier::Ambiguous
    }
}

/// Run the sweep check for one contract
///
/// Fails with `InsufficientBaseline` when the underlying has no usable
/// intraday series.
pub fn sweep_signal(
    quote: &OptionQuote,
    underlying: &UnderlyingSnapshot,
    config: &SweepConfig,
) -> FlowResult<(DetectorSignal, SweepVerdict)> {
    let vwap = underlying.vwap().ok_or_else(|| {
        FlowError::insufficient_baseline(format!("{}: no intraday series", underlying.ticker))
    })?;
    let trv = underlying.tick_relative_volume().ok_or_else(|| {
        FlowError::insufficient_baseline(format!("{}: no intraday volume", underlying.ticker))
    })?;

    let divergence = (underlying.price - vwap) / vwap;
    let tier = classify_print(quote, trv, config);

    // Calls want the tape above VWAP, puts below
    let directional = quote.right.phi() * divergence;
    let alignment = if divergence.abs() < config.min_vwap_divergence || directional >= 0.0 {
        1.0
    } else {
        1.0 - config.misalignment_penalty.clamp(0.0, 1.0)
    };

    let trv_component = if config.trv_saturation > 0.0 {
        (trv / config.trv_saturation).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let strength = (tier.strength_factor() * trv_component * alignment).clamp(0.0, 1.0);

    let signal = DetectorSignal {
        kind: DetectorKind::Sweep,
        raw: trv,
        strength,
        passed: tier == ConvictionTier::Aggressive,
    };

    let verdict = SweepVerdict {
        tier,
        vwap_divergence: divergence,
        tick_relative_volume: trv,
    };

    Ok((signal, verdict))
}
