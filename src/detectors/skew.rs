//! Volatility skew
//!
//! Put-minus-call implied volatility over the out-of-the-money wings of one
//! chain. Puts priced over calls is the usual state of equity markets; when
//! calls carry the richer volatility the chain leans bullish.

use serde::{Deserialize, Serialize};

use crate::core::{FlowError, FlowResult, OptionQuote, OptionRight};

use super::{DetectorKind, DetectorSignal, SkewConfig};

/// Direction the skew leans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkewBias {
    /// Calls bid over puts
    Bullish,
    /// Puts bid over calls beyond the neutral band
    Bearish,
    Neutral,
}

impl SkewBias {
    pub fn label(&self) -> &'static str {
        match self {
            SkewBias::Bullish => "BULLISH",
            SkewBias::Bearish => "BEARISH",
            SkewBias::Neutral => "NEUTRAL",
        }
    }

    /// Bias agrees with a position in this right
    pub fn supports(&self, right: OptionRight) -> bool {
        matches!(
            (self, right),
            (SkewBias::Bullish, OptionRight::Call) | (SkewBias::Bearish, OptionRight::Put)
        )
    }

    /// Bias contradicts a position in this right
    pub fn opposes(&self, right: OptionRight) -> bool {
        matches!(
            (self, right),
            (SkewBias::Bullish, OptionRight::Put) | (SkewBias::Bearish, OptionRight::Call)
        )
    }
}

/// Chain-level skew for one ticker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySkew {
    /// Mean implied volatility of the OTM puts in the window
    pub put_iv: f64,
    pub call_iv: f64,
    /// `put_iv - call_iv`
    pub skew: f64,
    pub bias: SkewBias,
    pub puts: usize,
    pub calls: usize,
}

/// Measure the skew over `(quote, implied vol)` pairs from one chain
///
/// Only strictly OTM contracts within `max_otm_pct` count. A chain without
/// at least one contract on each wing has no skew.
pub fn volatility_skew(
    contracts: &[(&OptionQuote, f64)],
    config: &SkewConfig,
) -> FlowResult<VolatilitySkew> {
    let (mut put_sum, mut puts) = (0.0, 0usize);
    let (mut call_sum, mut calls) = (0.0, 0usize);

    for (quote, vol) in contracts {
        let otm = quote.otm_pct();
        if !(otm > 0.0 && otm <= config.max_otm_pct) || !(vol.is_finite() && *vol > 0.0) {
            continue;
        }
        match quote.right {
            OptionRight::Put => {
                put_sum += vol;
                puts += 1;
            }
            OptionRight::Call => {
                call_sum += vol;
                calls += 1;
            }
        }
    }

    if puts == 0 || calls == 0 {
        return Err(FlowError::insufficient_baseline(format!(
            "skew needs both wings ({} puts, {} calls)",
            puts, calls
        )));
    }

    let put_iv = put_sum / puts as f64;
    let call_iv = call_sum / calls as f64;
    let skew = put_iv - call_iv;
    let band = config.alignment.threshold;
    let bias = if skew < -band {
        SkewBias::Bullish
    } else if skew > band {
        SkewBias::Bearish
    } else {
        SkewBias::Neutral
    };

    Ok(VolatilitySkew {
        put_iv,
        call_iv,
        skew,
        bias,
        puts,
        calls,
    })
}

/// Skew in the direction of the contract: `-phi * skew`
///
/// Passes when the chain's bias agrees with the contract's right.
pub fn skew_alignment_signal(
    quote: &OptionQuote,
    skew: Option<&VolatilitySkew>,
    config: &SkewConfig,
) -> FlowResult<DetectorSignal> {
    let skew = skew.ok_or_else(|| {
        FlowError::insufficient_baseline(format!("{}: no chain skew", quote.ticker))
    })?;

    let aligned = -quote.right.phi() * skew.skew;
    Ok(DetectorSignal::from_raw(DetectorKind::SkewAlignment, aligned, &config.alignment))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::option::tests::sample_quote;

    /// Spot 138.5; two OTM puts, two OTM calls and one deep call outside the window
    pub(crate) fn chain(put_vol: f64, call_vol: f64) -> Vec<(OptionQuote, f64)> {
        vec![
            (sample_quote(OptionRight::Put, 130.0), put_vol),
            (sample_quote(OptionRight::Put, 125.0), put_vol),
            (sample_quote(OptionRight::Call, 145.0), call_vol),
            (sample_quote(OptionRight::Call, 150.0), call_vol),
            (sample_quote(OptionRight::Call, 200.0), 2.0),
            // ITM put is ignored
            (sample_quote(OptionRight::Put, 150.0), 2.0),
        ]
    }

    fn measure(chain: &[(OptionQuote, f64)]) -> FlowResult<VolatilitySkew> {
        let pairs: Vec<(&OptionQuote, f64)> = chain.iter().map(|(q, v)| (q, *v)).collect();
        volatility_skew(&pairs, &SkewConfig::default())
    }

    #[test]
    fn test_call_rich_chain_is_bullish() {
        let skew = measure(&chain(0.40, 0.46)).unwrap();
        assert_eq!(skew.puts, 2);
        assert_eq!(skew.calls, 2);
        assert!((skew.skew + 0.06).abs() < 1e-12);
        assert_eq!(skew.bias, SkewBias::Bullish);
        assert!(skew.bias.supports(OptionRight::Call));
        assert!(skew.bias.opposes(OptionRight::Put));
    }

    #[test]
    fn test_bias_band() {
        assert_eq!(measure(&chain(0.46, 0.40)).unwrap().bias, SkewBias::Bearish);
        assert_eq!(measure(&chain(0.41, 0.40)).unwrap().bias, SkewBias::Neutral);
        assert_eq!(measure(&chain(0.40, 0.41)).unwrap().bias, SkewBias::Neutral);
    }

    #[test]
    fn test_one_wing_is_insufficient() {
        let calls_only: Vec<(OptionQuote, f64)> = chain(0.4, 0.4)
            .into_iter()
            .filter(|(q, _)| q.right == OptionRight::Call)
            .collect();
        let err = measure(&calls_only).unwrap_err();
        assert!(matches!(err, FlowError::InsufficientBaseline(_)));
    }

    #[test]
    fn test_alignment_follows_right() {
        let skew = measure(&chain(0.40, 0.46)).unwrap();
        let cfg = SkewConfig::default();

        let call_quote = sample_quote(OptionRight::Call, 150.0);
        let call = skew_alignment_signal(&call_quote, Some(&skew), &cfg).unwrap();
        assert!((call.raw - 0.06).abs() < 1e-12);
        assert!(call.passed);

        let put_quote = sample_quote(OptionRight::Put, 130.0);
        let put = skew_alignment_signal(&put_quote, Some(&skew), &cfg).unwrap();
        assert!(put.raw < 0.0);
        assert_eq!(put.strength, 0.0);
        assert!(!put.passed);

        assert!(skew_alignment_signal(&call_quote, None, &cfg).is_err());
    }
}
