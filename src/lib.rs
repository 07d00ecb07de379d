//! # Options Flow - Unusual Activity Scoring Engine
//!
//! Turns per-contract options market observations into a normalized
//! conviction score and a classified trade intent for institutional-style
//! flow: aggressive sweeps, passive fills, structured spreads and
//! dealer-hedging-driven activity.
//!
//! ## Overview
//!
//! Each scan cycle combines:
//! - **Black-Scholes Greeks**: delta, gamma, vanna, charm, color per contract
//! - **Dealer exposure (GEX)**: per-strike gamma/vanna/charm, walls, zero-gamma flip
//! - **Anomaly detectors**: volume/OI, volume z-scores, relative volume, sweep/VWAP,
//!   iceberg absorption, volatility skew and quiet put accumulation
//! - **Regime**: risk-on, risk-off or high volatility from index data
//! - **Memory**: historical win rate of the trade pattern and a per-ticker
//!   clearing trust score, as bounded weights
//!
//! ## Usage
//!
//! ```rust,no_run
//! use options_flow::prelude::*;
//!
//! let config = EngineConfig::from_json_file("flow.json").unwrap();
//! let snapshot: CycleSnapshot =
//!     serde_json::from_str(&std::fs::read_to_string("cycle.json").unwrap()).unwrap();
//!
//! let engine = ScanEngine::new(config).unwrap();
//! let report = engine.run_cycle(&snapshot, &NeutralMemory).unwrap();
//!
//! for signal in report.alerts().take(10) {
//!     println!("{} {:.1} {}", signal.contract, signal.total_score, signal.intent.label());
//! }
//! ```
//!
//! ## What This Engine Does NOT Do
//!
//! - Fetch market data or persist history
//! - Execute or route orders
//! - Guarantee that a high score predicts a profitable trade

pub mod config;
pub mod core;
pub mod detectors;
pub mod exposure;
pub mod memory;
pub mod models;
pub mod regime;
pub mod scoring;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        ContractBaseline, FlowError, FlowResult, GreeksResult, OptionQuote, OptionRight,
        UnderlyingSnapshot, VolumeBaseline,
    };

    // Config
    pub use crate::config::{CycleConfig, EngineConfig, PricingConfig};

    // Pricing
    pub use crate::models::{
        compute_greeks, greeks_for_quote, implied_volatility, norm_cdf, norm_pdf,
        theoretical_price,
    };

    // Exposure
    pub use crate::exposure::{
        aggregate_exposure, find_zero_gamma_flip, DealerConvention, ExposureConfig, ExposureMap,
        KeyLevels,
    };

    // Detectors
    pub use crate::detectors::{
        run_detectors, ConvictionTier, DetectorConfig, DetectorContext, DetectorReading,
        DetectorSignals, LegLink, SkewBias, SpreadStructure, SweepVerdict, VolatilitySkew,
    };

    // Regime
    pub use crate::regime::{
        classify_regime, IndexSnapshot, RegimeConfig, RegimeState, VolatilityIndexSnapshot,
    };

    // Memory
    pub use crate::memory::{
        ClearingVerdict, InMemoryStore, MemoryConfig, MemoryIndex, MemoryLookup, MemoryRecord,
        MemoryStore, NeutralMemory, OutcomePolicy, TradeSignature, TrustConfig,
    };

    // Scoring
    pub use crate::scoring::{
        ComponentKind, CycleReport, CycleSnapshot, DetectionReason, ScanEngine, ScoreInputs,
        ScoredSignal, ScoringConfig, ScoringEngine, SystemVerdict, TickerSnapshot, TradeIntent,
    };
}

// Re-export main types at crate root
pub use crate::core::{FlowError, FlowResult};
pub use crate::scoring::{ScanEngine, ScoredSignal};
