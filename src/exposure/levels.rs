//! Stage 2: Key levels from the exposure map
//!
//! Call wall, put wall and the zero-gamma flip.

use super::{ExposureMap, StrikeExposure};

/// Strike with the largest positive net gamma
///
/// Ties go to the strike nearest spot.
pub fn call_wall(map: &ExposureMap) -> Option<f64> {
    extreme_strike(map, |level| level.net_gamma)
}

/// Strike with the largest negative net gamma magnitude
///
/// Ties go to the strike nearest spot.
pub fn put_wall(map: &ExposureMap) -> Option<f64> {
    extreme_strike(map, |level| -level.net_gamma)
}

fn extreme_strike(map: &ExposureMap, value: impl Fn(&StrikeExposure) -> f64) -> Option<f64> {
    let spot = map.spot;
    let mut best: Option<(f64, f64)> = None; // (value, strike)

    for level in map.levels() {
        let v = value(level);
        if !(v > 0.0) {
            continue;
        }

        best = match best {
            None => Some((v, level.strike)),
            Some((bv, bk)) => {
                if v > bv || (v == bv && (level.strike - spot).abs() < (bk - spot).abs()) {
                    Some((v, level.strike))
                } else {
                    Some((bv, bk))
                }
            }
        };
    }

    best.map(|(_, strike)| strike)
}

/// All strikes where cumulative net gamma (ascending strikes) changes sign
///
/// Each crossing is linearly interpolated between the two strikes that
/// bracket it. Exact zeros are skipped over, so a run of zero cumulative
/// gamma is interpolated across.
pub fn gamma_crossings(map: &ExposureMap) -> Vec<f64> {
    let mut crossings = Vec::new();
    let mut cumulative = 0.0;
    let mut last_nonzero: Option<(f64, f64)> = None; // (strike, cumulative)

    for level in map.levels() {
        cumulative += level.net_gamma;
        if cumulative == 0.0 {
            continue;
        }

        if let Some((k0, c0)) = last_nonzero {
            if (c0 < 0.0) != (cumulative < 0.0) {
                let k1 = level.strike;
                crossings.push(k0 + (k1 - k0) * (-c0) / (cumulative - c0));
            }
        }
        last_nonzero = Some((level.strike, cumulative));
    }

    crossings
}

/// Zero-gamma flip: the crossing nearest spot, or None for monotonic exposure
pub fn find_zero_gamma_flip(map: &ExposureMap) -> Option<f64> {
    let spot = map.spot;
    gamma_crossings(map).into_iter().min_by(|a, b| {
        (a - spot)
            .abs()
            .partial_cmp(&(b - spot).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}
