//! Scoring & Classification
//!
//! Combines Greeks, exposure levels, detector readings, the cycle regime, the
//! memory weight and the ticker's clearing trust into one itemized score per
//! contract, a trade-intent label, a bypass/suppression decision and a system
//! verdict.
//!
//! Score pipeline:
//! 1. **Components**: each reading scaled to [0, 1] and weighted
//! 2. **Base**: weighted sum over applicable components, normalized to 100
//! 3. **Adjustments**: x regime multiplier x memory weight x trust weight
//! 4. **Decision**: bypass, high conviction, suppression, intent, verdict

mod classify;
mod config;
mod engine;
mod pipeline;
mod verdict;

pub use classify::*;
pub use config::*;
pub use engine::*;
pub use pipeline::*;
pub use verdict::*;
