//! System verdict
//!
//! Hard-rule trade suggestion derived from a scored contract. `Buy` means own
//! the shares, `Call`/`Put` the option itself, `Neutral` stand aside. Rules
//! run in priority order and the first that applies decides.

use serde::{Deserialize, Serialize};

use crate::core::OptionRight;
use crate::detectors::SkewBias;
use crate::regime::RegimeState;

use super::TradeIntent;

/// Suggested action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemVerdict {
    /// Own the underlying instead of the option
    Buy,
    Call,
    Put,
    Neutral,
}

impl SystemVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            SystemVerdict::Buy => "BUY",
            SystemVerdict::Call => "CALL",
            SystemVerdict::Put => "PUT",
            SystemVerdict::Neutral => "NEUTRAL",
        }
    }
}

/// Facts the verdict rules look at
#[derive(Debug, Clone, Copy)]
pub struct VerdictContext {
    pub right: OptionRight,
    pub intent: TradeIntent,
    pub regime: RegimeState,
    pub high_conviction: bool,
    pub suppressed: bool,
    pub skew_bias: Option<SkewBias>,
    pub insider_put: bool,
}

/// Verdict plus the rule that produced it
pub fn system_verdict(ctx: &VerdictContext) -> (SystemVerdict, &'static str) {
    if ctx.suppressed {
        return (SystemVerdict::Neutral, "Below the alert bar");
    }
    match ctx.intent {
        TradeIntent::StructuredSpread => {
            return (SystemVerdict::Neutral, "Multi-leg structure, direction unclear")
        }
        TradeIntent::PassiveFill => {
            return (SystemVerdict::Neutral, "Passive fill, likely liquidity provision")
        }
        _ => {}
    }
    // Cheap puts on a call-leaning chain are the setup itself
    if ctx.right == OptionRight::Put && ctx.insider_put {
        return (SystemVerdict::Put, "Quiet OTM put accumulation");
    }
    if ctx.skew_bias.map_or(false, |bias| bias.opposes(ctx.right)) {
        return (SystemVerdict::Neutral, "Volatility skew contradicts the flow");
    }

    match ctx.right {
        OptionRight::Put if ctx.high_conviction => {
            (SystemVerdict::Put, "High-conviction bearish flow")
        }
        OptionRight::Put => (SystemVerdict::Neutral, "Bearish flow without conviction"),
        OptionRight::Call if ctx.regime == RegimeState::HighVolatility => {
            (SystemVerdict::Buy, "Bullish flow with rich premium, prefer shares")
        }
        OptionRight::Call if ctx.high_conviction => {
            (SystemVerdict::Call, "High-conviction bullish flow")
        }
        OptionRight::Call => (SystemVerdict::Buy, "Bullish flow, moderate conviction"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(right: OptionRight) -> VerdictContext {
        VerdictContext {
            right,
            intent: TradeIntent::AggressiveAccumulation,
            regime: RegimeState::RiskOn,
            high_conviction: true,
            suppressed: false,
            skew_bias: Some(SkewBias::Bullish),
            insider_put: false,
        }
    }

    #[test]
    fn test_bullish_sweep_is_call() {
        assert_eq!(system_verdict(&ctx(OptionRight::Call)).0, SystemVerdict::Call);

        let moderate = VerdictContext {
            high_conviction: false,
            ..ctx(OptionRight::Call)
        };
        assert_eq!(system_verdict(&moderate).0, SystemVerdict::Buy);

        let rich = VerdictContext {
            regime: RegimeState::HighVolatility,
            ..ctx(OptionRight::Call)
        };
        assert_eq!(system_verdict(&rich).0, SystemVerdict::Buy);
    }

    #[test]
    fn test_puts_need_conviction_or_insider() {
        let put = VerdictContext {
            skew_bias: Some(SkewBias::Neutral),
            high_conviction: false,
            ..ctx(OptionRight::Put)
        };
        assert_eq!(system_verdict(&put).0, SystemVerdict::Neutral);

        let insider = VerdictContext {
            insider_put: true,
            ..put
        };
        let (verdict, logic) = system_verdict(&insider);
        assert_eq!(verdict, SystemVerdict::Put);
        assert_eq!(logic, "Quiet OTM put accumulation");

        let strong = VerdictContext {
            high_conviction: true,
            ..put
        };
        assert_eq!(system_verdict(&strong).0, SystemVerdict::Put);
    }

    #[test]
    fn test_stand_aside_rules_come_first() {
        // Bullish skew against a high-conviction put
        let contra = ctx(OptionRight::Put);
        assert_eq!(system_verdict(&contra).0, SystemVerdict::Neutral);

        // Unless the put is the quiet accumulation itself
        let insider = VerdictContext {
            insider_put: true,
            ..contra
        };
        assert_eq!(system_verdict(&insider).0, SystemVerdict::Put);

        let spread = VerdictContext {
            intent: TradeIntent::StructuredSpread,
            ..insider
        };
        assert_eq!(system_verdict(&spread).0, SystemVerdict::Neutral);

        for intent in [TradeIntent::StructuredSpread, TradeIntent::PassiveFill] {
            let c = VerdictContext {
                intent,
                ..ctx(OptionRight::Call)
            };
            assert_eq!(system_verdict(&c).0, SystemVerdict::Neutral);
        }

        let quiet = VerdictContext {
            suppressed: true,
            ..ctx(OptionRight::Call)
        };
        assert_eq!(system_verdict(&quiet), (SystemVerdict::Neutral, "Below the alert bar"));
        assert_eq!(SystemVerdict::Buy.label(), "BUY");
    }
}
