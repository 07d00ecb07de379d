//! Trade-intent classification and detection reasons

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::OptionQuote;
use crate::detectors::{ConvictionTier, DetectorSignals, SkewBias, SpreadStructure};
use crate::exposure::KeyLevels;

use super::{ComponentKind, ScoreComponent};

/// What the flow most likely represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeIntent {
    /// One leg of a linked multi-leg order
    StructuredSpread,
    /// Urgent, liquidity-taking accumulation
    AggressiveAccumulation,
    /// Resting, bid-side fill
    PassiveFill,
    /// Flow clustered at a dealer gamma level
    DealerHedging,
    Ambiguous,
}

impl TradeIntent {
    pub fn label(&self) -> &'static str {
        match self {
            TradeIntent::StructuredSpread => "Structured Spread",
            TradeIntent::AggressiveAccumulation => "Aggressive Accumulation",
            TradeIntent::PassiveFill => "Passive Fill",
            TradeIntent::DealerHedging => "Dealer Hedging",
            TradeIntent::Ambiguous => "Ambiguous",
        }
    }
}

/// Human-readable evidence attached to a scored trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DetectionReason {
    /// Volume above open interest
    OpeningPosition,
    /// Volume/OI detector passed
    VolumeOiSpike,
    /// Underlying volume z-score passed
    VolumeSpike,
    /// Contract volume far above its own history
    RelativeVolumeSpike,
    /// Contract volume z-score passed
    ContractVolumeSpike,
    /// Ask-side print confirmed by the tape
    AskSideSweep,
    /// Latest bar absorbed outsized volume without moving
    IcebergAbsorption,
    /// Chain skew leans the same way as the contract
    SkewConfirms { bias: SkewBias },
    /// Quiet accumulation of short-dated OTM puts
    InsiderPut,
    NearGammaFlip,
    AtCallWall,
    AtPutWall,
    LinkedLegs { structure: SpreadStructure },
}

impl DetectionReason {
    pub fn label(&self) -> String {
        match self {
            DetectionReason::OpeningPosition => "Vol > OI (Opening Position)".to_string(),
            DetectionReason::VolumeOiSpike => "Vol/OI Spike".to_string(),
            DetectionReason::VolumeSpike => "Underlying Volume Spike".to_string(),
            DetectionReason::RelativeVolumeSpike => "Relative Volume Spike".to_string(),
            DetectionReason::ContractVolumeSpike => "Contract Volume Z Spike".to_string(),
            DetectionReason::AskSideSweep => "TRV Max Aggression".to_string(),
            DetectionReason::IcebergAbsorption => "Iceberg Absorption".to_string(),
            DetectionReason::SkewConfirms { bias } => format!("{} Skew", bias.label()),
            DetectionReason::InsiderPut => "INSIDER PUT".to_string(),
            DetectionReason::NearGammaFlip => "Near Gamma Flip".to_string(),
            DetectionReason::AtCallWall => "At Call Wall".to_string(),
            DetectionReason::AtPutWall => "At Put Wall".to_string(),
            DetectionReason::LinkedLegs { structure } => format!("Multi-Leg {}", structure.label()),
        }
    }
}

fn is_volume_family(kind: ComponentKind) -> bool {
    matches!(
        kind,
        ComponentKind::Volume
            | ComponentKind::Notional
            | ComponentKind::VolumeOiRatio
            | ComponentKind::VolumeZScore
            | ComponentKind::RelativeVolume
            | ComponentKind::ContractZScore
            | ComponentKind::InsiderPut
    )
}

/// Priority-ordered intent decision
///
/// Linked legs first, then an aggressive sweep. Otherwise passed components
/// are ranked by contribution and the first one that implies an intent wins.
/// A passive print only labels the trade when nothing else does.
pub fn classify_intent(
    quote: &OptionQuote,
    signals: &DetectorSignals,
    components: &[ScoreComponent],
) -> TradeIntent {
    if signals.leg_link.is_some() {
        return TradeIntent::StructuredSpread;
    }

    let tier = signals.conviction_tier();
    if tier == ConvictionTier::Aggressive {
        return TradeIntent::AggressiveAccumulation;
    }

    let mut passed: Vec<&ScoreComponent> = components
        .iter()
        .filter(|c| c.applicable && c.passed)
        .collect();
    // Stable sort keeps component order on equal contributions
    passed.sort_by(|a, b| {
        b.contribution
            .partial_cmp(&a.contribution)
            .unwrap_or(Ordering::Equal)
    });

    for component in passed {
        if is_volume_family(component.kind) && quote.is_opening() {
            return TradeIntent::AggressiveAccumulation;
        }
        if component.kind == ComponentKind::GammaProximity {
            return TradeIntent::DealerHedging;
        }
    }

    if tier == ConvictionTier::Passive {
        TradeIntent::PassiveFill
    } else {
        TradeIntent::Ambiguous
    }
}

/// Evidence list for a contract, in a fixed order
pub fn detection_reasons(
    quote: &OptionQuote,
    signals: &DetectorSignals,
    levels: &KeyLevels,
    band: f64,
) -> Vec<DetectionReason> {
    let mut reasons = Vec::new();

    if quote.is_opening() {
        reasons.push(DetectionReason::OpeningPosition);
    }
    if signals.volume_oi.passed() {
        reasons.push(DetectionReason::VolumeOiSpike);
    }
    if signals.volume_zscore.passed() {
        reasons.push(DetectionReason::VolumeSpike);
    }
    if signals.relative_volume.passed() {
        reasons.push(DetectionReason::RelativeVolumeSpike);
    }
    if signals.contract_zscore.passed() {
        reasons.push(DetectionReason::ContractVolumeSpike);
    }
    if signals.conviction_tier() == ConvictionTier::Aggressive {
        reasons.push(DetectionReason::AskSideSweep);
    }
    if signals.microstructure.passed() {
        reasons.push(DetectionReason::IcebergAbsorption);
    }
    if let (true, Some(bias)) = (signals.skew_alignment.passed(), signals.skew_bias()) {
        reasons.push(DetectionReason::SkewConfirms { bias });
    }
    if signals.insider_put.passed() {
        reasons.push(DetectionReason::InsiderPut);
    }

    let near = |level: Option<f64>| level.map_or(false, |l| (quote.strike - l).abs() <= band);
    if near(levels.zero_gamma_flip) {
        reasons.push(DetectionReason::NearGammaFlip);
    }
    if near(levels.call_wall) {
        reasons.push(DetectionReason::AtCallWall);
    }
    if near(levels.put_wall) {
        reasons.push(DetectionReason::AtPutWall);
    }

    if let Some(link) = &signals.leg_link {
        reasons.push(DetectionReason::LinkedLegs {
            structure: link.structure,
        });
    }

    reasons
}
