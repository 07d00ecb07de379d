//! Realized outcome grading for tracked trades

use serde::{Deserialize, Serialize};

use crate::core::OptionRight;

use super::OutcomePolicy;

/// Grade of a closed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeVerdict {
    Rewarded,
    Noise,
    Trap,
}

impl OutcomeVerdict {
    /// Contribution to a signature's win rate
    pub fn win_credit(&self) -> f64 {
        match self {
            OutcomeVerdict::Rewarded => 1.0,
            OutcomeVerdict::Noise => 0.5,
            OutcomeVerdict::Trap => 0.0,
        }
    }
}

/// A closed, graded trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    /// P/L in percent from the position holder's side
    pub pnl_pct: f64,
    pub days_open: i64,
    pub verdict: OutcomeVerdict,
}

impl OutcomePolicy {
    /// Grade a tracked trade from the underlying's entry and current price
    ///
    /// Returns `None` while the trade is still open. Put P/L is measured
    /// on the underlying's decline.
    pub fn evaluate(
        &self,
        entry_price: f64,
        current_price: f64,
        right: OptionRight,
        days_open: i64,
    ) -> Option<TradeOutcome> {
        if !(entry_price > 0.0) || !current_price.is_finite() {
            return None;
        }

        let pnl_pct = right.phi() * (current_price - entry_price) / entry_price * 100.0;

        if days_open < self.max_holding_days && pnl_pct.abs() < self.exit_move_pct {
            return None;
        }

        let verdict = if pnl_pct > self.reward_pct {
            OutcomeVerdict::Rewarded
        } else if pnl_pct < self.trap_pct {
            OutcomeVerdict::Trap
        } else {
            OutcomeVerdict::Noise
        };

        Some(TradeOutcome {
            pnl_pct,
            days_open,
            verdict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_open() {
        let policy = OutcomePolicy::default();
        assert!(policy.evaluate(100.0, 105.0, OptionRight::Call, 3).is_none());
    }

    #[test]
    fn test_early_exit_on_large_move() {
        let policy = OutcomePolicy::default();
        let out = policy.evaluate(100.0, 125.0, OptionRight::Call, 2).unwrap();
        assert_eq!(out.verdict, OutcomeVerdict::Rewarded);
        assert!((out.pnl_pct - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_put_pnl_inverted() {
        let policy = OutcomePolicy::default();
        let out = policy.evaluate(100.0, 125.0, OptionRight::Put, 2).unwrap();
        assert_eq!(out.verdict, OutcomeVerdict::Trap);
    }

    #[test]
    fn test_time_exit_grades_noise() {
        let policy = OutcomePolicy::default();
        let out = policy.evaluate(100.0, 103.0, OptionRight::Call, 7).unwrap();
        assert_eq!(out.verdict, OutcomeVerdict::Noise);
        assert_eq!(out.verdict.win_credit(), 0.5);
    }
}
