//! Historical Memory Index
//!
//! Read-mostly cache of how past trade patterns played out. Scoring reads a
//! record per signature through [`MemoryLookup`] and turns it into a bounded
//! multiplier; the outcome collaborator writes graded trades back through
//! [`MemoryIndex::record_outcome`]. The nightly clearing audit feeds the
//! per-ticker trust score through [`MemoryIndex::record_clearing`].
//!
//! A signature with no history is neutral (weight 1.0), as is a ticker that
//! was never audited.

mod config;
mod outcome;
mod signature;
pub mod snapshot;
mod trust;

pub use config::*;
pub use outcome::*;
pub use signature::*;
pub use trust::*;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::FlowResult;

/// Track record of one trade signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub ticker: String,
    pub trade_type: String,
    /// Hex signature key
    pub signature: String,
    /// Win rate in [0, 1]
    pub win_rate: f64,
    pub sample_count: u32,
    /// `None` for a neutral default that was never stored
    pub last_updated: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    /// Default record for a signature with no history
    pub fn neutral(signature: &TradeSignature) -> Self {
        Self {
            ticker: signature.ticker.clone(),
            trade_type: signature.trade_type.clone(),
            signature: signature.key.clone(),
            win_rate: 0.5,
            sample_count: 0,
            last_updated: None,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.sample_count == 0
    }
}

/// Read side used during scoring
///
/// A miss is not an error; an `Err` means the backing store itself failed and
/// aborts the cycle.
pub trait MemoryLookup: Sync {
    /// Record for a signature, or a neutral default on a miss
    fn lookup(&self, signature: &TradeSignature) -> FlowResult<MemoryRecord>;

    /// Bounded multiplier for a record
    fn weight_for(&self, record: &MemoryRecord) -> f64;

    /// Clearing trust multiplier for a ticker
    fn trust_for(&self, _ticker: &str) -> f64 {
        1.0
    }
}

/// Key-value storage behind the index
pub trait MemoryStore {
    fn get(&self, key: &str) -> Option<&MemoryRecord>;
    fn upsert(&mut self, record: MemoryRecord);
    fn len(&self) -> usize;

    /// Raw trust score for a ticker, if it was ever audited
    fn trust(&self, ticker: &str) -> Option<f64>;
    fn set_trust(&mut self, ticker: &str, score: f64);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Map-backed store, ordered by key so snapshots are stable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    records: BTreeMap<String, MemoryRecord>,
    #[serde(default)]
    trust: BTreeMap<String, f64>,
}

impl MemoryStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<&MemoryRecord> {
        self.records.get(key)
    }

    fn upsert(&mut self, record: MemoryRecord) {
        self.records.insert(record.signature.clone(), record);
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn trust(&self, ticker: &str) -> Option<f64> {
        self.trust.get(ticker).copied()
    }

    fn set_trust(&mut self, ticker: &str, score: f64) {
        self.trust.insert(ticker.to_string(), score);
    }
}

/// Memory index over a store
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex<S = InMemoryStore> {
    store: S,
    config: MemoryConfig,
}

impl<S: MemoryStore> MemoryIndex<S> {
    pub fn new(store: S, config: MemoryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Fold a graded trade into its signature's record
    ///
    /// Creates the record on first use.
    pub fn record_outcome(
        &mut self,
        signature: &TradeSignature,
        outcome: &TradeOutcome,
        at: DateTime<Utc>,
    ) -> MemoryRecord {
        let mut record = self
            .store
            .get(&signature.key)
            .cloned()
            .unwrap_or_else(|| MemoryRecord::neutral(signature));

        let n = record.sample_count as f64;
        let prior_wins = if record.sample_count == 0 {
            0.0
        } else {
            record.win_rate * n
        };

        record.win_rate = (prior_wins + outcome.verdict.win_credit()) / (n + 1.0);
        record.sample_count = record.sample_count.saturating_add(1);
        record.last_updated = Some(at);

        tracing::debug!(
            signature = %signature,
            verdict = ?outcome.verdict,
            win_rate = record.win_rate,
            samples = record.sample_count,
            "memory updated"
        );

        self.store.upsert(record.clone());
        record
    }

    /// Fold a clearing audit into the ticker's trust score
    ///
    /// Returns the new score, or `None` when nothing cleared for the ticker
    /// and the audit says nothing.
    pub fn record_clearing(&mut self, ticker: &str, reported: f64, cleared: f64) -> Option<f64> {
        let trust = &self.config.trust;
        let verdict = trust.grade(reported, cleared)?;
        let current = self.store.trust(ticker).unwrap_or(trust.initial);
        let score = trust.apply(current, verdict);

        match verdict {
            ClearingVerdict::Discrepancy => tracing::warn!(
                "Clearing discrepancy: {} reported {} but {} cleared, trust {:.2}",
                ticker, reported, cleared, score
            ),
            ClearingVerdict::Verified => tracing::debug!(
                "Clearing verified: {}, trust {:.2}",
                ticker, score
            ),
        }

        self.store.set_trust(ticker, score);
        Some(score)
    }
}

impl<S: MemoryStore + Sync> MemoryLookup for MemoryIndex<S> {
    fn lookup(&self, signature: &TradeSignature) -> FlowResult<MemoryRecord> {
        Ok(self
            .store
            .get(&signature.key)
            .cloned()
            .unwrap_or_else(|| MemoryRecord::neutral(signature)))
    }

    fn weight_for(&self, record: &MemoryRecord) -> f64 {
        self.config.weight(record.win_rate, record.sample_count)
    }

    fn trust_for(&self, ticker: &str) -> f64 {
        let trust = &self.config.trust;
        trust.clamp(self.store.trust(ticker).unwrap_or(trust.initial))
    }
}

/// Lookup with no history at all; every weight is 1.0
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralMemory;

impl MemoryLookup for NeutralMemory {
    fn lookup(&self, signature: &TradeSignature) -> FlowResult<MemoryRecord> {
        Ok(MemoryRecord::neutral(signature))
    }

    fn weight_for(&self, _record: &MemoryRecord) -> f64 {
        1.0
    }
}
