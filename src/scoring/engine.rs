//! Score combination
//!
//! Itemizes each component, combines them into a normalized base score and
//! applies the regime, memory and clearing trust multipliers. Every number needed to
//! reproduce the total is kept on the [`ScoredSignal`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{FlowError, FlowResult, GreeksResult, OptionQuote, OptionRight};
use crate::detectors::{ConvictionTier, DetectorReading, DetectorSignals, LegLink, SkewBias};
use crate::exposure::{ExposureMap, KeyLevels};
use crate::memory::MemoryRecord;
use crate::regime::RegimeState;

use super::{
    classify_intent, detection_reasons, system_verdict, DetectionReason, ScoringConfig,
    SystemVerdict, TradeIntent, VerdictContext,
};

/// Itemized score component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Volume,
    Notional,
    VolumeOiRatio,
    VolumeZScore,
    RelativeVolume,
    ContractZScore,
    Sweep,
    Microstructure,
    SkewAlignment,
    InsiderPut,
    GammaProximity,
    Positioning,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 12] = [
        ComponentKind::Volume,
        ComponentKind::Notional,
        ComponentKind::VolumeOiRatio,
        ComponentKind::VolumeZScore,
        ComponentKind::RelativeVolume,
        ComponentKind::ContractZScore,
        ComponentKind::Sweep,
        ComponentKind::Microstructure,
        ComponentKind::SkewAlignment,
        ComponentKind::InsiderPut,
        ComponentKind::GammaProximity,
        ComponentKind::Positioning,
    ];
}

/// One line of the score itemization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub kind: ComponentKind,
    pub raw: f64,
    /// Strength in [0, 1]
    pub strength: f64,
    pub weight: f64,
    /// weight x strength, zero when not applicable
    pub contribution: f64,
    /// Excluded from the weighted sum when false
    pub applicable: bool,
    pub passed: bool,
}

impl ScoreComponent {
    fn new(kind: ComponentKind, raw: f64, strength: f64, weight: f64, passed: bool) -> Self {
        let strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            kind,
            raw,
            strength,
            weight,
            contribution: weight * strength,
            applicable: true,
            passed,
        }
    }

    fn not_applicable(kind: ComponentKind, weight: f64) -> Self {
        Self {
            kind,
            raw: 0.0,
            strength: 0.0,
            weight,
            contribution: 0.0,
            applicable: false,
            passed: false,
        }
    }

    fn from_reading(kind: ComponentKind, reading: &DetectorReading, weight: f64) -> Self {
        match reading.signal() {
            Some(s) => Self::new(kind, s.raw, s.strength, weight, s.passed),
            None => Self::not_applicable(kind, weight),
        }
    }
}

/// Final output for one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSignal {
    pub contract: String,
    pub ticker: String,
    pub right: OptionRight,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub volume: u64,
    pub open_interest: u64,
    pub notional: f64,
    pub underlying_price: f64,

    pub components: Vec<ScoreComponent>,
    /// Normalized weighted sum in [0, 100]
    pub base_score: f64,
    pub regime: RegimeState,
    pub regime_multiplier: f64,
    pub memory_signature: String,
    pub memory_samples: u32,
    pub memory_weight: f64,
    /// Clearing trust multiplier for the ticker
    pub trust_weight: f64,
    pub total_score: f64,

    pub intent: TradeIntent,
    pub conviction: ConvictionTier,
    pub meets_minimums: bool,
    pub bypass: bool,
    pub high_conviction: bool,
    pub suppressed: bool,
    pub reasons: Vec<DetectionReason>,
    pub verdict: SystemVerdict,
    /// Rule behind the verdict
    pub verdict_logic: String,
    pub skew_bias: Option<SkewBias>,

    pub greeks: GreeksResult,
    pub key_levels: KeyLevels,
    pub leg_link: Option<LegLink>,
}

impl ScoredSignal {
    /// Base score from the recorded components alone
    pub fn recompute_base(&self) -> f64 {
        combine(&self.components)
    }

    /// Total score from the recorded components and multipliers alone
    pub fn recompute_total(&self) -> f64 {
        self.recompute_base() * self.regime_multiplier * self.memory_weight * self.trust_weight
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&ScoreComponent> {
        self.components.iter().find(|c| c.kind == kind)
    }
}

/// Normalized weighted sum over applicable components, scaled to 100
fn combine(components: &[ScoreComponent]) -> f64 {
    let (sum, weight) = components
        .iter()
        .filter(|c| c.applicable)
        .fold((0.0, 0.0), |(s, w), c| (s + c.contribution, w + c.weight));

    if weight > 0.0 {
        sum / weight * 100.0
    } else {
        0.0
    }
}

/// Everything the engine needs to score one contract
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub quote: &'a OptionQuote,
    pub greeks: Option<&'a GreeksResult>,
    pub exposure: Option<&'a ExposureMap>,
    /// Precomputed levels for `exposure`; derived on the fly when absent
    pub key_levels: Option<&'a KeyLevels>,
    pub signals: &'a DetectorSignals,
    pub regime: RegimeState,
    pub memory: &'a MemoryRecord,
    pub memory_weight: f64,
    pub trust_weight: f64,
}

/// Scoring engine
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    contract_multiplier: f64,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig, contract_multiplier: f64) -> Self {
        Self {
            config,
            contract_multiplier,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score and classify one contract
    ///
    /// Fails with `IncompleteInput` when Greeks, the exposure map, or the
    /// exposure entry for the contract's strike is missing.
    pub fn score(&self, inputs: &ScoreInputs<'_>) -> FlowResult<ScoredSignal> {
        let quote = inputs.quote;
        let contract = quote.contract_symbol();

        let greeks = inputs
            .greeks
            .copied()
            .ok_or_else(|| FlowError::incomplete_input(format!("{}: no Greeks", contract)))?;
        if !greeks.is_finite() {
            return Err(FlowError::incomplete_input(format!(
                "{}: non-finite Greeks",
                contract
            )));
        }

        let exposure = inputs.exposure.ok_or_else(|| {
            FlowError::incomplete_input(format!("{}: no exposure map", contract))
        })?;
        if exposure.ticker != quote.ticker {
            return Err(FlowError::incomplete_input(format!(
                "{}: exposure map is for {}",
                contract, exposure.ticker
            )));
        }
        if exposure.entry(quote.strike).is_none() {
            return Err(FlowError::incomplete_input(format!(
                "{}: no exposure entry at strike {}",
                contract, quote.strike
            )));
        }

        let key_levels = match inputs.key_levels {
            Some(levels) => *levels,
            None => exposure.key_levels(),
        };

        let cfg = &self.config;
        let band = cfg.proximity_band_pct * quote.underlying_price;
        let components = self.components(quote, inputs.signals, &key_levels, band);

        let meets_minimums = self.meets_minimums(quote, inputs.signals);
        let base_score = combine(&components);
        let regime_multiplier = cfg.regime.factor(inputs.regime, quote.right);
        let total_score =
            base_score * regime_multiplier * inputs.memory_weight * inputs.trust_weight;

        let bypass = total_score > cfg.bypass_threshold;
        let high_conviction = total_score >= cfg.high_conviction_threshold;
        let suppressed = !bypass && (!meets_minimums || total_score < cfg.min_alert_score);

        let intent = classify_intent(quote, inputs.signals, &components);
        let reasons = detection_reasons(quote, inputs.signals, &key_levels, band);
        let skew_bias = inputs.signals.skew_bias();
        let (verdict, verdict_logic) = system_verdict(&VerdictContext {
            right: quote.right,
            intent,
            regime: inputs.regime,
            high_conviction,
            suppressed,
            skew_bias,
            insider_put: inputs.signals.insider_put.passed(),
        });

        debug!(
            contract = %contract,
            base = base_score,
            total = total_score,
            intent = intent.label(),
            verdict = verdict.label(),
            bypass,
            suppressed,
            "contract scored"
        );

        Ok(ScoredSignal {
            contract,
            ticker: quote.ticker.clone(),
            right: quote.right,
            strike: quote.strike,
            expiry: quote.expiry,
            volume: quote.volume,
            open_interest: quote.open_interest,
            notional: quote.notional(self.contract_multiplier),
            underlying_price: quote.underlying_price,
            components,
            base_score,
            regime: inputs.regime,
            regime_multiplier,
            memory_signature: inputs.memory.signature.clone(),
            memory_samples: inputs.memory.sample_count,
            memory_weight: inputs.memory_weight,
            trust_weight: inputs.trust_weight,
            total_score,
            intent,
            conviction: inputs.signals.conviction_tier(),
            meets_minimums,
            bypass,
            high_conviction,
            suppressed,
            reasons,
            verdict,
            verdict_logic: verdict_logic.to_string(),
            skew_bias,
            greeks,
            key_levels,
            leg_link: inputs.signals.leg_link.clone(),
        })
    }

    fn components(
        &self,
        quote: &OptionQuote,
        signals: &DetectorSignals,
        levels: &KeyLevels,
        band: f64,
    ) -> Vec<ScoreComponent> {
        let cfg = &self.config;
        let w = &cfg.weights;
        let mins = &cfg.minimums;

        let volume = quote.volume as f64;
        let notional = quote.notional(self.contract_multiplier);

        let mut components = Vec::with_capacity(ComponentKind::ALL.len());

        components.push(ScoreComponent::new(
            ComponentKind::Volume,
            volume,
            saturate(volume, cfg.volume_saturation),
            w.volume,
            quote.volume >= mins.min_volume,
        ));
        components.push(ScoreComponent::new(
            ComponentKind::Notional,
            notional,
            saturate(notional, cfg.notional_saturation),
            w.notional,
            notional >= mins.min_notional,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::VolumeOiRatio,
            &signals.volume_oi,
            w.volume_oi_ratio,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::VolumeZScore,
            &signals.volume_zscore,
            w.volume_zscore,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::RelativeVolume,
            &signals.relative_volume,
            w.relative_volume,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::ContractZScore,
            &signals.contract_zscore,
            w.contract_zscore,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::Sweep,
            &signals.sweep,
            w.sweep,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::Microstructure,
            &signals.microstructure,
            w.microstructure,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::SkewAlignment,
            &signals.skew_alignment,
            w.skew_alignment,
        ));
        components.push(ScoreComponent::from_reading(
            ComponentKind::InsiderPut,
            &signals.insider_put,
            w.insider_put,
        ));

        // Distance to the nearest key level, as a fraction of spot
        components.push(match levels.nearest_distance(quote.strike) {
            Some(distance) if band > 0.0 => {
                let strength = (1.0 - distance / band).max(0.0);
                ScoreComponent::new(
                    ComponentKind::GammaProximity,
                    distance / quote.underlying_price,
                    strength,
                    w.gamma_proximity,
                    distance <= band,
                )
            }
            _ => ScoreComponent::not_applicable(ComponentKind::GammaProximity, w.gamma_proximity),
        });

        let dte = quote.days_to_expiry();
        let in_zone =
            dte <= cfg.positioning_max_dte && quote.moneyness_pct() <= cfg.positioning_max_moneyness_pct;
        components.push(ScoreComponent::new(
            ComponentKind::Positioning,
            dte as f64,
            if in_zone { 1.0 } else { 0.0 },
            w.positioning,
            in_zone,
        ));

        components
    }

    fn meets_minimums(&self, quote: &OptionQuote, signals: &DetectorSignals) -> bool {
        let mins = &self.config.minimums;
        let relative_ok = signals
            .relative_volume
            .signal()
            .map_or(true, |s| s.raw >= mins.min_relative_volume);

        quote.volume >= mins.min_volume
            && quote.notional(self.contract_multiplier) >= mins.min_notional
            && quote.volume_oi_ratio() >= mins.min_volume_oi_ratio
            && relative_ok
    }
}

fn saturate(value: f64, saturation: f64) -> f64 {
    if saturation > 0.0 {
        (value / saturation).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::tests::sample_quote;
    use crate::detectors::{run_detectors, DetectorConfig, DetectorContext};
    use crate::exposure::{aggregate_exposure, ExposureConfig};
    use crate::memory::{ExpiryBucket, TradeSignature};
    use crate::models::greeks_for_quote;
    use crate::core::{UnderlyingSnapshot, VolumeBaseline};

    struct Fixture {
        quote: OptionQuote,
        greeks: GreeksResult,
        exposure: ExposureMap,
        signals: DetectorSignals,
        memory: MemoryRecord,
    }

    /// Single call: volume 1200, OI 100, $600k notional, z-score 2.5
    fn fixture(right: OptionRight) -> Fixture {
        let mut quote = sample_quote(right, 140.0);
        quote.volume = 1_200;
        quote.open_interest = 100;
        quote.last = 5.0;
        quote.bid = 4.90;
        quote.ask = 5.00;

        let (_, greeks) = greeks_for_quote(&quote, 0.045).unwrap();
        let exposure = aggregate_exposure(
            &[(quote.clone(), greeks)],
            quote.underlying_price,
            &ExposureConfig::default(),
        )
        .unwrap();

        let underlying = UnderlyingSnapshot::new("NVDA", quote.underlying_price)
            .with_intraday(vec![138.5], vec![1_500_000.0])
            .with_baseline(VolumeBaseline::new(1_000_000.0, 200_000.0, 30));
        let signals =
            run_detectors(&quote, &DetectorContext::new(&underlying), &DetectorConfig::default())
                .unwrap();

        let memory = MemoryRecord::neutral(&TradeSignature::new("NVDA", right.label(), 0, ExpiryBucket::Monthly));

        Fixture {
            quote,
            greeks,
            exposure,
            signals,
            memory,
        }
    }

    fn inputs<'a>(f: &'a Fixture, regime: RegimeState) -> ScoreInputs<'a> {
        ScoreInputs {
            quote: &f.quote,
            greeks: Some(&f.greeks),
            exposure: Some(&f.exposure),
            key_levels: None,
            signals: &f.signals,
            regime,
            memory: &f.memory,
            memory_weight: 1.0,
            trust_weight: 1.0,
        }
    }

    #[test]
    fn test_high_conviction_scenario() {
        let f = fixture(OptionRight::Call);
        let engine = ScoringEngine::new(ScoringConfig::default(), 100.0);
        let signal = engine.score(&inputs(&f, RegimeState::RiskOn)).unwrap();

        assert!((signal.notional - 600_000.0).abs() < 1e-6);
        let z = signal.component(ComponentKind::VolumeZScore).unwrap();
        assert!((z.raw - 2.5).abs() < 1e-12);
        assert!(signal.total_score > engine.config().high_conviction_threshold);
        assert!(signal.high_conviction);
        assert_eq!(signal.intent, TradeIntent::AggressiveAccumulation);
        assert!(!signal.suppressed);
        assert!((signal.recompute_total() - signal.total_score).abs() < 1e-12);
        assert_eq!(signal.verdict, SystemVerdict::Call);
        assert_eq!(signal.verdict_logic, "High-conviction bullish flow");
    }

    #[test]
    fn test_not_applicable_excluded() {
        let f = fixture(OptionRight::Call);
        let engine = ScoringEngine::new(ScoringConfig::default(), 100.0);
        let signal = engine.score(&inputs(&f, RegimeState::RiskOn)).unwrap();

        let rel = signal.component(ComponentKind::RelativeVolume).unwrap();
        assert!(!rel.applicable);
        assert_eq!(rel.contribution, 0.0);

        // Treating it as a zero signal would lower the score
        let mut zeroed = signal.clone();
        for c in zeroed.components.iter_mut() {
            if c.kind == ComponentKind::RelativeVolume {
                c.applicable = true;
            }
        }
        assert!(zeroed.recompute_base() < signal.base_score);
    }

    #[test]
    fn test_bypass_overrides_minimums() {
        let f = fixture(OptionRight::Call);
        let config = ScoringConfig {
            minimums: crate::scoring::MinimumConfig {
                min_notional: 10_000_000.0,
                ..Default::default()
            },
            bypass_threshold: 70.0,
            ..Default::default()
        };
        let engine = ScoringEngine::new(config, 100.0);
        let signal = engine.score(&inputs(&f, RegimeState::RiskOn)).unwrap();

        assert!(!signal.meets_minimums);
        assert!(signal.bypass);
        assert!(!signal.suppressed);
    }

    #[test]
    fn test_below_minimum_suppressed() {
        let f = fixture(OptionRight::Call);
        let config = ScoringConfig {
            minimums: crate::scoring::MinimumConfig {
                min_notional: 10_000_000.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let signal = ScoringEngine::new(config, 100.0)
            .score(&inputs(&f, RegimeState::RiskOn))
            .unwrap();
        assert!(!signal.bypass);
        assert!(signal.suppressed);
    }

    #[test]
    fn test_risk_off_lifts_puts() {
        let f = fixture(OptionRight::Put);
        let engine = ScoringEngine::new(ScoringConfig::default(), 100.0);
        let on = engine.score(&inputs(&f, RegimeState::RiskOn)).unwrap();
        let off = engine.score(&inputs(&f, RegimeState::RiskOff)).unwrap();
        let high_vol = engine.score(&inputs(&f, RegimeState::HighVolatility)).unwrap();

        assert!(off.total_score > on.total_score);
        assert!(high_vol.total_score < on.total_score);
        assert_eq!(off.base_score, on.base_score);
    }

    #[test]
    fn test_memory_weight_applied() {
        let f = fixture(OptionRight::Call);
        let engine = ScoringEngine::new(ScoringConfig::default(), 100.0);
        let neutral = engine.score(&inputs(&f, RegimeState::RiskOn)).unwrap();

        let mut boosted = inputs(&f, RegimeState::RiskOn);
        boosted.memory_weight = 1.2;
        let boosted = engine.score(&boosted).unwrap();

        assert!((boosted.total_score - neutral.total_score * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_trust_weight_applied() {
        let f = fixture(OptionRight::Call);
        let engine = ScoringEngine::new(ScoringConfig::default(), 100.0);
        let neutral = engine.score(&inputs(&f, RegimeState::RiskOn)).unwrap();

        let mut distrusted = inputs(&f, RegimeState::RiskOn);
        distrusted.trust_weight = 0.9;
        let distrusted = engine.score(&distrusted).unwrap();

        assert_eq!(distrusted.base_score, neutral.base_score);
        assert!((distrusted.total_score - neutral.total_score * 0.9).abs() < 1e-9);
        assert!((distrusted.recompute_total() - distrusted.total_score).abs() < 1e-12);
    }

    #[test]
    fn test_missing_inputs_incomplete() {
        let f = fixture(OptionRight::Call);
        let engine = ScoringEngine::new(ScoringConfig::default(), 100.0);

        let mut no_greeks = inputs(&f, RegimeState::RiskOn);
        no_greeks.greeks = None;
        assert!(matches!(
            engine.score(&no_greeks).unwrap_err(),
            FlowError::IncompleteInput(_)
        ));

        let mut no_map = inputs(&f, RegimeState::RiskOn);
        no_map.exposure = None;
        assert!(matches!(
            engine.score(&no_map).unwrap_err(),
            FlowError::IncompleteInput(_)
        ));

        let mut other_strike = f.quote.clone();
        other_strike.strike = 145.0;
        let mut missing_entry = inputs(&f, RegimeState::RiskOn);
        missing_entry.quote = &other_strike;
        assert!(matches!(
            engine.score(&missing_entry).unwrap_err(),
            FlowError::IncompleteInput(_)
        ));
    }
}
