//! Pricing Models
//!
//! Implements:
//! - Black-Scholes (theoretical value, Greeks, IV computation)

pub mod black_scholes;

pub use black_scholes::*;
