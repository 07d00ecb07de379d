//! Scan cycle
//!
//! Two phases over one immutable snapshot:
//! 1. **Aggregate**: regime, then per ticker Greeks, exposure map, chain skew
//!    and leg links
//! 2. **Score**: detectors, memory lookup and scoring per contract, optionally
//!    on the rayon pool
//!
//! Phase 1 finishes for every ticker before any contract is scored. A bad
//! contract or an empty chain never aborts the cycle; a regime that cannot be
//! classified, or a memory store that fails, does.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::core::{
    ContractBaseline, FlowError, FlowResult, GreeksResult, OptionQuote, UnderlyingSnapshot,
    VolumeBaseline,
};
use crate::detectors::{
    link_legs, run_detectors, volatility_skew, DetectorContext, LegLink, VolatilitySkew,
};
use crate::exposure::{aggregate_exposure, ExposureMap, KeyLevels};
use crate::memory::{MemoryLookup, TradeSignature};
use crate::models::greeks_for_quote;
use crate::regime::{
    classify_regime, IndexSnapshot, RegimeAssessment, VolatilityIndexSnapshot,
};

use super::{ScoreInputs, ScoredSignal, ScoringEngine};

/// One ticker's inputs for a cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub underlying: UnderlyingSnapshot,
    pub quotes: Vec<OptionQuote>,
    /// Per-contract history keyed by contract symbol
    #[serde(default)]
    pub contract_baselines: HashMap<String, ContractBaseline>,
    /// Daily underlying volumes, most recent first; used when the snapshot
    /// carries no precomputed baseline
    #[serde(default)]
    pub daily_volumes: Vec<f64>,
}

/// Everything observed for one scan cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub as_of: DateTime<Utc>,
    pub index: Option<IndexSnapshot>,
    pub volatility_index: Option<VolatilityIndexSnapshot>,
    pub tickers: Vec<TickerSnapshot>,
}

/// A contract dropped from the cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractRejection {
    pub ticker: String,
    pub contract: String,
    /// Error tag, e.g. `invalid_input`
    pub kind: String,
    pub reason: String,
}

impl ContractRejection {
    fn from_error(quote: &OptionQuote, error: &FlowError) -> Self {
        Self {
            ticker: quote.ticker.clone(),
            contract: quote.contract_symbol(),
            kind: error.kind().to_string(),
            reason: error.to_string(),
        }
    }
}

/// A ticker skipped for the cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerSkip {
    pub ticker: String,
    pub reason: String,
}

/// Output of one cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub as_of: DateTime<Utc>,
    pub regime: RegimeAssessment,
    /// Highest total score first; ties by contract symbol
    pub signals: Vec<ScoredSignal>,
    pub rejections: Vec<ContractRejection>,
    pub skipped_tickers: Vec<TickerSkip>,
}

impl CycleReport {
    /// Signals that were not suppressed, in rank order
    pub fn alerts(&self) -> impl Iterator<Item = &ScoredSignal> {
        self.signals.iter().filter(|s| !s.suppressed)
    }

    /// First `n` signals, suppressed ones included
    pub fn top(&self, n: usize) -> &[ScoredSignal] {
        &self.signals[..n.min(self.signals.len())]
    }
}

/// Phase-1 result for one ticker
struct PreparedTicker<'a> {
    snapshot: &'a TickerSnapshot,
    underlying: UnderlyingSnapshot,
    /// Quote, volatility it was priced at, Greeks
    priced: Vec<(&'a OptionQuote, f64, GreeksResult)>,
    exposure: ExposureMap,
    key_levels: KeyLevels,
    skew: Option<VolatilitySkew>,
    legs: HashMap<String, LegLink>,
}

/// Cycle runner
#[derive(Debug, Clone)]
pub struct ScanEngine {
    config: EngineConfig,
    scoring: ScoringEngine,
}

impl ScanEngine {
    /// Validates the configuration once
    pub fn new(config: EngineConfig) -> FlowResult<Self> {
        config.validate()?;
        let scoring = ScoringEngine::new(config.scoring.clone(), config.exposure.contract_multiplier);
        Ok(Self { config, scoring })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one scan cycle
    pub fn run_cycle<M: MemoryLookup>(
        &self,
        snapshot: &CycleSnapshot,
        memory: &M,
    ) -> FlowResult<CycleReport> {
        // Phase 1: aggregate
        let index = snapshot
            .index
            .as_ref()
            .ok_or_else(|| FlowError::regime_unavailable("no broad index snapshot"))?;
        let vol_index = snapshot
            .volatility_index
            .as_ref()
            .ok_or_else(|| FlowError::regime_unavailable("no volatility index snapshot"))?;
        let regime = classify_regime(index, vol_index, &self.config.regime)?;

        let mut rejections = Vec::new();
        let mut skipped_tickers = Vec::new();

        let max = self.config.cycle.max_tickers;
        for ticker in snapshot.tickers.iter().skip(max) {
            warn!("Cycle: ticker limit {} reached, skipping {}", max, ticker.underlying.ticker);
            skipped_tickers.push(TickerSkip {
                ticker: ticker.underlying.ticker.clone(),
                reason: format!("beyond max_tickers ({})", max),
            });
        }

        let mut prepared = Vec::new();
        for ticker in snapshot.tickers.iter().take(max) {
            match self.prepare_ticker(ticker, &mut rejections) {
                Ok(p) => prepared.push(p),
                Err(e) => {
                    warn!("Cycle: skipping {} ({})", ticker.underlying.ticker, e);
                    skipped_tickers.push(TickerSkip {
                        ticker: ticker.underlying.ticker.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Phase 2: score
        let jobs: Vec<(&PreparedTicker, &OptionQuote, f64, &GreeksResult)> = prepared
            .iter()
            .flat_map(|p| p.priced.iter().map(move |(q, vol, g)| (p, *q, *vol, g)))
            .collect();

        let score_job =
            |&(p, quote, vol, greeks): &(_, _, f64, _)| {
                (quote, self.score_contract(p, quote, vol, greeks, &regime, memory))
            };

        let results: Vec<(&OptionQuote, FlowResult<ScoredSignal>)> = if self.config.cycle.parallel
        {
            jobs.par_iter().map(score_job).collect()
        } else {
            jobs.iter().map(score_job).collect()
        };

        let mut signals = Vec::with_capacity(results.len());
        for (quote, result) in results {
            match result {
                Ok(signal) => signals.push(signal),
                Err(e) if e.is_contract_scoped() => {
                    let rejection = ContractRejection::from_error(quote, &e);
                    warn!(
                        "Cycle: dropping {} [{}] {}",
                        rejection.contract, rejection.kind, rejection.reason
                    );
                    rejections.push(rejection);
                }
                Err(e) => {
                    error!("Cycle: aborting at {} ({})", quote.contract_symbol(), e);
                    return Err(e);
                }
            }
        }

        signals.sort_by(|a, b| {
            b.total_score
                .total_cmp(&a.total_score)
                .then_with(|| a.contract.cmp(&b.contract))
        });

        let report = CycleReport {
            as_of: snapshot.as_of,
            regime,
            signals,
            rejections,
            skipped_tickers,
        };

        info!(
            regime = report.regime.state.label(),
            tickers = prepared.len(),
            scored = report.signals.len(),
            alerts = report.alerts().count(),
            rejected = report.rejections.len(),
            skipped = report.skipped_tickers.len(),
            "cycle complete"
        );

        Ok(report)
    }

    fn prepare_ticker<'a>(
        &self,
        ticker: &'a TickerSnapshot,
        rejections: &mut Vec<ContractRejection>,
    ) -> FlowResult<PreparedTicker<'a>> {
        let symbol = &ticker.underlying.ticker;
        if ticker.quotes.is_empty() {
            return Err(FlowError::empty_chain(format!("{}: no contracts", symbol)));
        }

        let mut underlying = ticker.underlying.clone();
        if underlying.baseline.is_none() && !ticker.daily_volumes.is_empty() {
            match VolumeBaseline::from_daily_volumes(
                &ticker.daily_volumes,
                self.config.cycle.baseline_lookback_days,
                self.config.detectors.min_baseline_samples,
            ) {
                Ok(baseline) => underlying.baseline = Some(baseline),
                Err(e) => warn!("Cycle: {} has no volume baseline ({})", symbol, e),
            }
        }

        let rate = self.config.pricing.risk_free_rate;
        let mut priced = Vec::with_capacity(ticker.quotes.len());
        for quote in &ticker.quotes {
            let result = if &quote.ticker != symbol {
                Err(FlowError::invalid_input(format!(
                    "quote for {} in {} chain",
                    quote.ticker, symbol
                )))
            } else {
                greeks_for_quote(quote, rate)
            };

            match result {
                Ok((vol, greeks)) => priced.push((quote, vol, greeks)),
                Err(e) => {
                    warn!("Cycle: no Greeks for {} ({})", quote.contract_symbol(), e);
                    rejections.push(ContractRejection::from_error(quote, &e));
                }
            }
        }

        let entries: Vec<(OptionQuote, GreeksResult)> =
            priced.iter().map(|(q, _, g)| ((*q).clone(), *g)).collect();
        if entries.is_empty() {
            return Err(FlowError::empty_chain(format!(
                "{}: every contract was rejected",
                symbol
            )));
        }

        let exposure = aggregate_exposure(&entries, underlying.price, &self.config.exposure)?;
        for dropped in &exposure.rejected {
            rejections.push(ContractRejection {
                ticker: symbol.clone(),
                contract: dropped.contract.clone(),
                kind: "invalid_input".to_string(),
                reason: dropped.reason.clone(),
            });
        }
        if !exposure.rejected.is_empty() {
            priced.retain(|(q, _, _)| {
                let contract = q.contract_symbol();
                !exposure.rejected.iter().any(|r| r.contract == contract)
            });
        }
        let key_levels = exposure.key_levels();

        let valid: Vec<OptionQuote> = priced.iter().map(|(q, _, _)| (*q).clone()).collect();
        let legs = link_legs(&valid, &self.config.detectors.legs);

        let vols: Vec<(&OptionQuote, f64)> =
            priced.iter().map(|(q, vol, _)| (*q, *vol)).collect();
        let skew = match volatility_skew(&vols, &self.config.detectors.skew) {
            Ok(skew) => Some(skew),
            Err(e) => {
                debug!("Cycle: {} has no skew ({})", symbol, e);
                None
            }
        };

        info!(
            "Cycle: {} priced {}/{} contracts, {} strikes, {} linked legs, skew {}",
            symbol,
            priced.len(),
            ticker.quotes.len(),
            exposure.len(),
            legs.len(),
            skew.map_or("n/a", |s| s.bias.label())
        );

        Ok(PreparedTicker {
            snapshot: ticker,
            underlying,
            priced,
            exposure,
            key_levels,
            skew,
            legs,
        })
    }

    fn score_contract<M: MemoryLookup>(
        &self,
        prepared: &PreparedTicker<'_>,
        quote: &OptionQuote,
        vol: f64,
        greeks: &GreeksResult,
        regime: &RegimeAssessment,
        memory: &M,
    ) -> FlowResult<ScoredSignal> {
        let symbol = quote.contract_symbol();

        let context = DetectorContext {
            underlying: &prepared.underlying,
            contract_baseline: prepared.snapshot.contract_baselines.get(&symbol),
            leg_link: prepared.legs.get(&symbol),
            skew: prepared.skew.as_ref(),
            implied_vol: Some(vol),
        };
        let signals = run_detectors(quote, &context, &self.config.detectors)?;

        let signature = TradeSignature::for_quote(quote);
        let record = memory.lookup(&signature)?;
        let memory_weight = memory.weight_for(&record);
        let trust_weight = memory.trust_for(&quote.ticker);

        self.scoring.score(&ScoreInputs {
            quote,
            greeks: Some(greeks),
            exposure: Some(&prepared.exposure),
            key_levels: Some(&prepared.key_levels),
            signals: &signals,
            regime: regime.state,
            memory: &record,
            memory_weight,
            trust_weight,
        })
    }
}
