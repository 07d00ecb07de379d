//! Iceberg absorption
//!
//! Volume density is volume per unit of price range traded in a bar. A bar
//! that absorbs far more volume than usual without moving price points at a
//! large resting order being worked against the tape.

use serde::{Deserialize, Serialize};

use crate::core::{FlowError, FlowResult, UnderlyingSnapshot};

use super::{DetectorKind, DetectorSignal, MicrostructureConfig};

/// Density statistics for the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MicrostructureReading {
    /// Volume per unit of high-low range in the latest bar
    pub vol_density: f64,
    /// Latest density against the session's earlier bars
    pub iceberg_z: f64,
}

/// Volume over range, with the range floored at `min_range`
pub fn volume_density(volume: f64, range: f64, min_range: f64) -> f64 {
    volume / range.max(min_range)
}

/// Iceberg z-score of the latest bar
///
/// Needs high/low data and at least `min_bars` earlier bars with some spread
/// in their densities; otherwise the baseline is insufficient.
pub fn microstructure_signal(
    underlying: &UnderlyingSnapshot,
    config: &MicrostructureConfig,
) -> FlowResult<(DetectorSignal, MicrostructureReading)> {
    let densities: Vec<f64> = underlying
        .range_bars()
        .map(|(volume, range)| volume_density(volume, range, config.min_range))
        .collect();

    let (last, prior) = match densities.split_last() {
        Some((last, prior)) if prior.len() >= config.min_bars => (*last, prior),
        _ => {
            return Err(FlowError::insufficient_baseline(format!(
                "{}: {} range bars, {} required",
                underlying.ticker,
                densities.len(),
                config.min_bars + 1
            )))
        }
    };

    let n = prior.len() as f64;
    let mean = prior.iter().sum::<f64>() / n;
    let std_dev = (prior.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();
    if !(std_dev > 0.0) {
        return Err(FlowError::insufficient_baseline(format!(
            "{}: flat volume density",
            underlying.ticker
        )));
    }

    let reading = MicrostructureReading {
        vol_density: last,
        iceberg_z: (last - mean) / std_dev,
    };
    let signal =
        DetectorSignal::from_raw(DetectorKind::Microstructure, reading.iceberg_z, &config.iceberg);
    Ok((signal, reading))
}
