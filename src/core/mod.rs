//! Core data types for the flow scoring engine
//!
//! Defines fundamental types:
//! - OptionQuote: per-contract market observation
//! - UnderlyingSnapshot: spot, intraday series and volume baselines
//! - GreeksResult: model value and sensitivities
//! - FlowError: error taxonomy

pub mod error;
pub mod greeks;
pub mod option;
pub mod underlying;

pub use error::*;
pub use greeks::*;
pub use option::*;
pub use underlying::*;
