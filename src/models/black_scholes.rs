//! Black-Scholes Model
//!
//! Provides:
//! - European option pricing
//! - Greeks (delta, gamma, vanna, charm, color)
//! - Implied volatility solver (Newton-Raphson with bisection fallback)
//!
//! Every function here is pure: identical inputs give bit-identical outputs.
//! Expired or malformed contracts are rejected with `InvalidInput` instead of
//! leaking NaN into the exposure and scoring stages.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::core::{FlowError, FlowResult, GreeksResult, OptionQuote, OptionRight};

/// Floor for vol * sqrt(t) before it is used as a divisor
pub const MIN_VOL_SQRT_T: f64 = 1e-10;

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, time: f64, vol: f64, rate: f64) -> f64 {
    let vol_sqrt_t = (vol * time.sqrt()).max(MIN_VOL_SQRT_T);
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / vol_sqrt_t
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, time: f64, vol: f64, rate: f64) -> f64 {
    let vol_sqrt_t = (vol * time.sqrt()).max(MIN_VOL_SQRT_T);
    d1(spot, strike, time, vol, rate) - vol_sqrt_t
}

/// Reject inputs that describe an expired or malformed contract
fn validate_inputs(spot: f64, strike: f64, time: f64, vol: f64, rate: f64) -> FlowResult<()> {
    // Comparisons are written so that NaN fails them
    if !(time > 0.0) {
        return Err(FlowError::invalid_input(format!(
            "non-positive time to expiry: {}",
            time
        )));
    }
    if !(vol > 0.0) || !vol.is_finite() {
        return Err(FlowError::invalid_input(format!(
            "non-positive volatility: {}",
            vol
        )));
    }
    if !(spot > 0.0) || !(strike > 0.0) || !spot.is_finite() || !strike.is_finite() {
        return Err(FlowError::invalid_input(format!(
            "non-positive spot or strike: spot={} strike={}",
            spot, strike
        )));
    }
    if !rate.is_finite() || !time.is_finite() {
        return Err(FlowError::invalid_input("non-finite rate or time"));
    }
    Ok(())
}

/// Black-Scholes European option price
pub fn theoretical_price(
    spot: f64,
    strike: f64,
    time: f64,
    vol: f64,
    rate: f64,
    right: OptionRight,
) -> FlowResult<f64> {
    validate_inputs(spot, strike, time, vol, rate)?;

    let d1 = d1(spot, strike, time, vol, rate);
    let d2 = d2(spot, strike, time, vol, rate);
    let df = (-rate * time).exp();

    let value = match right {
        OptionRight::Call => spot * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionRight::Put => strike * df * norm_cdf(-d2) - spot * norm_cdf(-d1),
    };

    Ok(value)
}

/// Value and sensitivities for one contract
///
/// Vanna is per unit volatility; charm is -dDelta/dT and color is -dGamma/dT,
/// both per year.
pub fn compute_greeks(
    spot: f64,
    strike: f64,
    time: f64,
    vol: f64,
    rate: f64,
    right: OptionRight,
) -> FlowResult<GreeksResult> {
    let value = theoretical_price(spot, strike, time, vol, rate, right)?;

    let sqrt_t = time.sqrt();
    let vol_sqrt_t = (vol * sqrt_t).max(MIN_VOL_SQRT_T);
    let d1 = d1(spot, strike, time, vol, rate);
    let d2 = d1 - vol_sqrt_t;
    let pdf_d1 = norm_pdf(d1);

    // Delta
    let delta = match right {
        OptionRight::Call => norm_cdf(d1),
        OptionRight::Put => norm_cdf(d1) - 1.0,
    };

    // Gamma (same for call and put)
    let gamma = pdf_d1 / (spot * vol_sqrt_t);

    // Vanna: d(delta)/d(vol) = d(vega)/d(spot)
    let vanna = -pdf_d1 * d2 / vol;

    // Charm: without dividends the call and put expressions coincide
    let charm = -pdf_d1 * (2.0 * rate * time - d2 * vol_sqrt_t) / (2.0 * time * vol_sqrt_t);

    // Color: gamma decay, sign matches charm
    let color = pdf_d1 / (2.0 * spot * time * vol_sqrt_t)
        * (1.0 + d1 * (2.0 * rate * time - d2 * vol_sqrt_t) / vol_sqrt_t);

    let greeks = GreeksResult::new(delta, gamma, vanna, charm, color, value);
    if !greeks.is_finite() {
        return Err(FlowError::invalid_input(format!(
            "non-finite greeks for spot={} strike={} t={} vol={}",
            spot, strike, time, vol
        )));
    }

    Ok(greeks)
}

/// Implied volatility solver using Newton-Raphson with bisection fallback
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    right: OptionRight,
) -> FlowResult<f64> {
    // Sanity checks
    if !(market_price > 0.0) {
        return Err(FlowError::invalid_input("Non-positive option price"));
    }
    if !(time > 0.0) {
        return Err(FlowError::invalid_input("Non-positive time to expiry"));
    }
    if !(spot > 0.0) || !(strike > 0.0) {
        return Err(FlowError::invalid_input("Non-positive spot or strike"));
    }

    // Check intrinsic value bounds
    let df = (-rate * time).exp();
    let intrinsic = right.intrinsic(spot, strike * df);

    if market_price < intrinsic * 0.99 {
        return Err(FlowError::invalid_input("Price below intrinsic value"));
    }

    // Initial guess using Brenner-Subrahmanyam approximation
    let atm_approx = market_price / (0.4 * spot * time.sqrt());
    let mut vol = atm_approx.clamp(0.01, 3.0);

    let max_iter = 100;
    let tol = 1e-8;

    for _ in 0..max_iter {
        let model = theoretical_price(spot, strike, time, vol, rate, right)?;
        let diff = model - market_price;

        if diff.abs() < tol {
            return Ok(vol);
        }

        // Vega for Newton step
        let vega = spot * norm_pdf(d1(spot, strike, time, vol, rate)) * time.sqrt();

        if vega.abs() < 1e-12 {
            break; // Vega too small, switch to bisection
        }

        let new_vol = vol - diff / vega;

        if new_vol <= 0.0 || new_vol > 5.0 {
            break; // Out of bounds, switch to bisection
        }

        vol = new_vol;
    }

    bisection_iv(market_price, spot, strike, time, rate, right)
}

/// Bisection method for IV (slower but more robust)
fn bisection_iv(
    market_price: f64,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    right: OptionRight,
) -> FlowResult<f64> {
    let mut low = 0.001;
    let mut high = 5.0;
    let tol = 1e-8;
    let max_iter = 100;

    for _ in 0..max_iter {
        let mid = (low + high) / 2.0;
        let diff = theoretical_price(spot, strike, time, mid, rate, right)? - market_price;

        if diff.abs() < tol {
            return Ok(mid);
        }

        if diff > 0.0 {
            high = mid;
        } else {
            low = mid;
        }

        if (high - low) < tol {
            return Ok(mid);
        }
    }

    Err(FlowError::invalid_input("IV solver did not converge"))
}

/// Volatility to price a quote with: reported IV, else solved from its price
pub fn effective_volatility(quote: &OptionQuote, rate: f64) -> FlowResult<f64> {
    if quote.implied_vol.is_finite() && quote.implied_vol > 0.0 {
        return Ok(quote.implied_vol);
    }

    let price = quote.best_price().ok_or_else(|| {
        FlowError::invalid_input(format!(
            "{}: no implied vol and no price to solve from",
            quote.contract_symbol()
        ))
    })?;

    implied_volatility(
        price,
        quote.underlying_price,
        quote.strike,
        quote.time_to_expiry(),
        rate,
        quote.right,
    )
}

/// Greeks for a quote at its own spot, expiry and (effective) volatility
///
/// Returns the volatility used alongside the Greeks.
pub fn greeks_for_quote(quote: &OptionQuote, rate: f64) -> FlowResult<(f64, GreeksResult)> {
    let vol = effective_volatility(quote, rate)?;
    let greeks = compute_greeks(
        quote.underlying_price,
        quote.strike,
        quote.time_to_expiry(),
        vol,
        rate,
        quote.right,
    )?;
    Ok((vol, greeks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-10);
        assert!((norm_cdf(1.96) - 0.975).abs() < 0.001);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 0.001);
    }

    #[test]
    fn test_bs_price() {
        // ATM call, 20% vol, 1 year, 5% rate
        let call = theoretical_price(100.0, 100.0, 1.0, 0.20, 0.05, OptionRight::Call).unwrap();

        // Should be around 10.45 for these parameters
        assert!(call > 10.0 && call < 11.0);
    }

    #[test]
    fn test_put_call_parity() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..500 {
            let spot = rng.gen_range(5.0..800.0);
            let strike = spot * rng.gen_range(0.5..1.5);
            let time = rng.gen_range(0.002..2.0);
            let vol = rng.gen_range(0.05..1.5);
            let rate = rng.gen_range(0.0..0.08);

            let call = theoretical_price(spot, strike, time, vol, rate, OptionRight::Call).unwrap();
            let put = theoretical_price(spot, strike, time, vol, rate, OptionRight::Put).unwrap();
            let parity = call - put - (spot - strike * (-rate * time).exp());

            assert!(
                parity.abs() < 1e-8 * spot.max(1.0),
                "parity violated: {} (S={} K={} T={} vol={})",
                parity,
                spot,
                strike,
                time,
                vol
            );
        }
    }

    #[test]
    fn test_greeks_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let spot = rng.gen_range(5.0..800.0);
            let strike = spot * rng.gen_range(0.7..1.3);
            let time = rng.gen_range(0.001..1.0);
            let vol = rng.gen_range(0.05..1.0);
            let right = if rng.gen_bool(0.5) {
                OptionRight::Call
            } else {
                OptionRight::Put
            };

            let a = compute_greeks(spot, strike, time, vol, 0.045, right).unwrap();
            let b = compute_greeks(spot, strike, time, vol, 0.045, right).unwrap();

            assert_eq!(a.delta.to_bits(), b.delta.to_bits());
            assert_eq!(a.gamma.to_bits(), b.gamma.to_bits());
            assert_eq!(a.vanna.to_bits(), b.vanna.to_bits());
            assert_eq!(a.charm.to_bits(), b.charm.to_bits());
            assert_eq!(a.color.to_bits(), b.color.to_bits());
            assert_eq!(a.theoretical_value.to_bits(), b.theoretical_value.to_bits());
        }
    }

    #[test]
    fn test_greeks() {
        let g = compute_greeks(100.0, 100.0, 1.0, 0.20, 0.05, OptionRight::Call).unwrap();

        // ATM call delta should be around 0.5-0.7
        assert!(g.delta > 0.5 && g.delta < 0.7);
        assert!(g.gamma > 0.0);

        let p = compute_greeks(100.0, 100.0, 1.0, 0.20, 0.05, OptionRight::Put).unwrap();
        assert!((g.delta - p.delta - 1.0).abs() < 1e-12);
        assert!((g.gamma - p.gamma).abs() < 1e-15);
        assert!((g.charm - p.charm).abs() < 1e-15);
    }

    #[test]
    fn test_charm_matches_finite_difference() {
        let (s, k, t, v, r) = (100.0, 105.0, 0.25, 0.3, 0.04);
        let h = 1e-5;
        let up = compute_greeks(s, k, t + h, v, r, OptionRight::Call).unwrap();
        let dn = compute_greeks(s, k, t - h, v, r, OptionRight::Call).unwrap();
        let fd = -(up.delta - dn.delta) / (2.0 * h);

        let g = compute_greeks(s, k, t, v, r, OptionRight::Call).unwrap();
        assert!((g.charm - fd).abs() < 1e-4, "charm {} vs fd {}", g.charm, fd);
    }

    #[test]
    fn test_color_matches_finite_difference() {
        let (s, k, t, v, r) = (150.0, 155.0, 0.1, 0.3, 0.045);
        let h = 1e-5;
        let up = compute_greeks(s, k, t + h, v, r, OptionRight::Call).unwrap();
        let dn = compute_greeks(s, k, t - h, v, r, OptionRight::Call).unwrap();
        let fd = -(up.gamma - dn.gamma) / (2.0 * h);

        let g = compute_greeks(s, k, t, v, r, OptionRight::Call).unwrap();
        let p = compute_greeks(s, k, t, v, r, OptionRight::Put).unwrap();
        assert!((g.color - fd).abs() < 1e-6, "color {} vs fd {}", g.color, fd);
        assert_eq!(g.color, p.color);
    }

    #[test]
    fn test_vanna_matches_finite_difference() {
        let (s, k, t, v, r) = (100.0, 95.0, 0.5, 0.25, 0.03);
        let h = 1e-5;
        let up = compute_greeks(s, k, t, v + h, r, OptionRight::Put).unwrap();
        let dn = compute_greeks(s, k, t, v - h, r, OptionRight::Put).unwrap();
        let fd = (up.delta - dn.delta) / (2.0 * h);

        let g = compute_greeks(s, k, t, v, r, OptionRight::Put).unwrap();
        assert!((g.vanna - fd).abs() < 1e-4, "vanna {} vs fd {}", g.vanna, fd);
    }

    #[test]
    fn test_invalid_inputs() {
        let call = OptionRight::Call;
        assert!(matches!(
            compute_greeks(100.0, 100.0, 0.0, 0.2, 0.05, call),
            Err(FlowError::InvalidInput(_))
        ));
        assert!(matches!(
            compute_greeks(100.0, 100.0, -0.1, 0.2, 0.05, call),
            Err(FlowError::InvalidInput(_))
        ));
        assert!(matches!(
            compute_greeks(100.0, 100.0, 0.5, 0.0, 0.05, call),
            Err(FlowError::InvalidInput(_))
        ));
        assert!(matches!(
            compute_greeks(0.0, 100.0, 0.5, 0.2, 0.05, call),
            Err(FlowError::InvalidInput(_))
        ));
        assert!(matches!(
            compute_greeks(100.0, -5.0, 0.5, 0.2, 0.05, call),
            Err(FlowError::InvalidInput(_))
        ));
        assert!(matches!(
            compute_greeks(f64::NAN, 100.0, 0.5, 0.2, 0.05, call),
            Err(FlowError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_short_expiry_atm_stable() {
        // Five minutes to expiry, exactly at the money
        let t = 5.0 / (365.0 * 24.0 * 60.0);
        let g = compute_greeks(150.0, 150.0, t, 0.3, 0.045, OptionRight::Call).unwrap();
        assert!(g.is_finite());
        assert!(g.gamma > 0.0);

        // Tiny vol * sqrt(t) deep ITM
        let g = compute_greeks(150.0, 100.0, 1e-9, 1e-6, 0.045, OptionRight::Call).unwrap();
        assert!(g.is_finite());
        assert!((g.delta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_implied_vol() {
        let market = theoretical_price(100.0, 100.0, 0.5, 0.25, 0.05, OptionRight::Call).unwrap();
        let iv = implied_volatility(market, 100.0, 100.0, 0.5, 0.05, OptionRight::Call).unwrap();

        assert!((iv - 0.25).abs() < 0.0001);
    }

    #[test]
    fn test_iv_otm() {
        let market = theoretical_price(100.0, 90.0, 0.25, 0.30, 0.05, OptionRight::Put).unwrap();
        let iv = implied_volatility(market, 100.0, 90.0, 0.25, 0.05, OptionRight::Put).unwrap();

        assert!((iv - 0.30).abs() < 0.001);
    }

    #[test]
    fn test_effective_volatility_solves_missing_iv() {
        let mut quote = crate::core::option::tests::sample_quote(OptionRight::Call, 140.0);
        let t = quote.time_to_expiry();
        let px = theoretical_price(quote.underlying_price, 140.0, t, 0.4, 0.045, OptionRight::Call)
            .unwrap();
        quote.bid = px - 0.01;
        quote.ask = px + 0.01;
        quote.implied_vol = 0.0;

        let vol = effective_volatility(&quote, 0.045).unwrap();
        assert!((vol - 0.4).abs() < 0.01);

        quote.implied_vol = 0.55;
        assert_eq!(effective_volatility(&quote, 0.045).unwrap(), 0.55);

        let (used, greeks) = greeks_for_quote(&quote, 0.045).unwrap();
        assert_eq!(used, 0.55);
        assert!(greeks.is_finite());
    }
}
