//! Volume anomaly detectors
//!
//! Pure functions over a quote, its underlying snapshot and baselines.

use crate::core::{
    ContractBaseline, FlowError, FlowResult, OptionQuote, UnderlyingSnapshot, VolumeBaseline,
};

use super::{DetectorKind, DetectorSignal, ThresholdConfig};

/// Volume / max(open interest, 1)
pub fn volume_oi_signal(quote: &OptionQuote, config: &ThresholdConfig) -> DetectorSignal {
    let ratio = quote.volume_oi_ratio();
    DetectorSignal::from_raw(DetectorKind::VolumeOiRatio, ratio, config)
}

/// (session volume - baseline mean) / baseline std-dev
///
/// Fails with `InsufficientBaseline` when there is no baseline, too few
/// sessions, or zero dispersion.
pub fn volume_zscore_signal(
    underlying: &UnderlyingSnapshot,
    min_samples: usize,
    config: &ThresholdConfig,
) -> FlowResult<DetectorSignal> {
    let baseline = underlying.baseline.ok_or_else(|| {
        FlowError::insufficient_baseline(format!("{}: no volume baseline", underlying.ticker))
    })?;

    let z = volume_zscore(underlying.session_volume(), &baseline, min_samples)?;
    Ok(DetectorSignal::from_raw(DetectorKind::VolumeZScore, z, config))
}

/// Z-score of a volume against a baseline
pub fn volume_zscore(volume: f64, baseline: &VolumeBaseline, min_samples: usize) -> FlowResult<f64> {
    if baseline.samples < min_samples {
        return Err(FlowError::insufficient_baseline(format!(
            "{} baseline sessions, {} required",
            baseline.samples, min_samples
        )));
    }
    if !(baseline.std_dev > 0.0) {
        return Err(FlowError::insufficient_baseline("baseline std-dev is zero"));
    }

    Ok((volume - baseline.mean) / baseline.std_dev)
}

/// Contract volume relative to its own historical average
pub fn relative_volume_signal(
    quote: &OptionQuote,
    baseline: Option<&ContractBaseline>,
    config: &ThresholdConfig,
) -> FlowResult<DetectorSignal> {
    let baseline = baseline.filter(|b| b.samples > 0).ok_or_else(|| {
        FlowError::insufficient_baseline(format!(
            "{}: no contract history",
            quote.contract_symbol()
        ))
    })?;

    let rel = quote.volume as f64 / (baseline.avg_volume.max(0.0) + 1.0);
    Ok(DetectorSignal::from_raw(DetectorKind::RelativeVolume, rel, config))
}

/// Contract volume z-score against the contract's own daily history
pub fn contract_zscore_signal(
    quote: &OptionQuote,
    baseline: Option<&ContractBaseline>,
    min_samples: usize,
    config: &ThresholdConfig,
) -> FlowResult<DetectorSignal> {
    let baseline = baseline.ok_or_else(|| {
        FlowError::insufficient_baseline(format!(
            "{}: no contract history",
            quote.contract_symbol()
        ))
    })?;

    let history = VolumeBaseline::new(baseline.avg_volume, baseline.volume_std_dev, baseline.samples);
    let z = volume_zscore(quote.volume as f64, &history, min_samples)?;
    Ok(DetectorSignal::from_raw(DetectorKind::ContractZScore, z, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::tests::sample_quote;
    use crate::core::OptionRight;

    #[test]
    fn test_volume_oi() {
        let mut q = sample_quote(OptionRight::Call, 150.0);
        q.volume = 1200;
        q.open_interest = 100;

        let s = volume_oi_signal(&q, &ThresholdConfig::new(8.0, 20.0));
        assert!((s.raw - 12.0).abs() < 1e-12);
        assert!((s.strength - 0.6).abs() < 1e-12);
        assert!(s.passed);
    }

    #[test]
    fn test_volume_oi_zero_oi() {
        let mut q = sample_quote(OptionRight::Call, 150.0);
        q.volume = 50;
        q.open_interest = 0;

        let s = volume_oi_signal(&q, &ThresholdConfig::new(8.0, 20.0));
        assert_eq!(s.raw, 50.0);
        assert_eq!(s.strength, 1.0);
    }

    #[test]
    fn test_zscore() {
        let b = VolumeBaseline::new(1_000_000.0, 200_000.0, 30);
        let z = volume_zscore(1_500_000.0, &b, 6).unwrap();
        assert!((z - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_zscore_zero_stddev_fails() {
        let b = VolumeBaseline::new(1_000_000.0, 0.0, 30);
        let err = volume_zscore(1_500_000.0, &b, 6).unwrap_err();
        assert!(matches!(err, FlowError::InsufficientBaseline(_)));
    }

    #[test]
    fn test_zscore_few_samples_fails() {
        let b = VolumeBaseline::new(1_000_000.0, 10.0, 3);
        assert!(volume_zscore(1_500_000.0, &b, 6).is_err());
    }

    #[test]
    fn test_zscore_signal_without_baseline() {
        let snap = UnderlyingSnapshot::new("NVDA", 138.5);
        let err = volume_zscore_signal(&snap, 6, &ThresholdConfig::new(2.0, 4.0)).unwrap_err();
        assert!(matches!(err, FlowError::InsufficientBaseline(_)));
    }

    #[test]
    fn test_relative_volume() {
        let q = sample_quote(OptionRight::Call, 150.0);
        let b = ContractBaseline {
            avg_volume: 499.0,
            volume_std_dev: 0.0,
            avg_open_interest: 900.0,
            samples: 20,
        };
        let s = relative_volume_signal(&q, Some(&b), &ThresholdConfig::new(5.0, 15.0)).unwrap();
        assert!((s.raw - 17.0).abs() < 1e-12);
        assert!(s.passed);
        assert_eq!(s.strength, 1.0);

        assert!(relative_volume_signal(&q, None, &ThresholdConfig::new(5.0, 15.0)).is_err());
    }

    #[test]
    fn test_contract_zscore() {
        let q = sample_quote(OptionRight::Call, 150.0);
        let cfg = ThresholdConfig::new(3.0, 6.0);
        let mut b = ContractBaseline {
            avg_volume: 2_500.0,
            volume_std_dev: 1_500.0,
            avg_open_interest: 1_000.0,
            samples: 20,
        };

        // 8500 vs 2500 +- 1500
        let s = contract_zscore_signal(&q, Some(&b), 6, &cfg).unwrap();
        assert_eq!(s.kind, DetectorKind::ContractZScore);
        assert!((s.raw - 4.0).abs() < 1e-12);
        assert!(s.passed);

        b.volume_std_dev = 0.0;
        let err = contract_zscore_signal(&q, Some(&b), 6, &cfg).unwrap_err();
        assert!(matches!(err, FlowError::InsufficientBaseline(_)));
        assert!(contract_zscore_signal(&q, None, 6, &cfg).is_err());
    }
}
