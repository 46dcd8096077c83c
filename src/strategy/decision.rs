//! Unified decision outcome. Every decision path returns one of these,
//! never an `Err`, so a scheduled invocation always ends with a structured,
//! loggable result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::TradePlan;

/// Why an evaluation chose not to trade. Policy rejections and
/// insufficient statistical confidence both land here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Before the per-hour trading window opens
    OutsideWindow { minute: u32, opens_at: u32 },
    /// Chosen volatility window carries too few samples
    InsufficientSamples {
        window_minutes: u32,
        samples: u32,
        required: u32,
    },
    /// Volatility above the model-reliability ceiling
    VolatilityHalt { std_pct: f64, limit_pct: f64 },
    /// No strike far enough above spot
    NoTargetStrike,
    /// NO ask outside the configured band
    PriceOutOfBounds { cents: u32 },
    /// Quote missing on the side we would buy
    NoQuote,
    /// Model edge below the minimum
    InsufficientEdge { edge_pct: f64, required_pct: f64 },
    /// Profit-if-win below the minimum percentage of cost
    InsufficientProfit { profit_pct: f64, required_pct: f64 },
    /// Kelly stake rounded below one contract
    BetBelowOneContract,
    /// Correlated-asset budget for this settlement hour is used up
    ExposureBudgetExhausted { remaining_fraction: f64 },
    /// Market settles too soon to model
    TooCloseToSettlement { minutes: i64 },
    /// Account balance below the trading minimum
    BalanceTooLow { balance: Decimal, minimum: Decimal },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::OutsideWindow { minute, opens_at } => {
                write!(f, "outside trading window (minute {minute}, opens at {opens_at})")
            }
            SkipReason::InsufficientSamples {
                window_minutes,
                samples,
                required,
            } => write!(
                f,
                "insufficient data: {samples}/{required} samples in {window_minutes}m window"
            ),
            SkipReason::VolatilityHalt { std_pct, limit_pct } => {
                write!(f, "volatility halt: {std_pct:.2}% >= {limit_pct:.2}%")
            }
            SkipReason::NoTargetStrike => write!(f, "no strike far enough above spot"),
            SkipReason::PriceOutOfBounds { cents } => {
                write!(f, "NO ask {cents}c outside configured band")
            }
            SkipReason::NoQuote => write!(f, "no ask on the NO side"),
            SkipReason::InsufficientEdge {
                edge_pct,
                required_pct,
            } => write!(f, "edge {edge_pct:.2}pp below minimum {required_pct:.2}pp"),
            SkipReason::InsufficientProfit {
                profit_pct,
                required_pct,
            } => write!(f, "profit {profit_pct:.1}% below minimum {required_pct:.1}%"),
            SkipReason::BetBelowOneContract => write!(f, "stake rounds below one contract"),
            SkipReason::ExposureBudgetExhausted { remaining_fraction } => write!(
                f,
                "exposure budget exhausted ({remaining_fraction:.3} remaining)"
            ),
            SkipReason::TooCloseToSettlement { minutes } => {
                write!(f, "only {minutes}m to settlement")
            }
            SkipReason::BalanceTooLow { balance, minimum } => {
                write!(f, "balance {balance} below minimum {minimum}")
            }
        }
    }
}

/// The outcome of one decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// A sized order ready for submission
    Trade(TradePlan),
    /// Evaluated cleanly and declined
    NoTrade(SkipReason),
    /// Upstream data or execution failed; message for the log
    Failed { cause: String },
}

impl Decision {
    pub fn is_trade(&self) -> bool {
        matches!(self, Decision::Trade(_))
    }

    pub fn failed(cause: impl std::fmt::Display) -> Self {
        Decision::Failed {
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn skip_reasons_render_context() {
        let reason = SkipReason::InsufficientSamples {
            window_minutes: 10,
            samples: 2,
            required: 5,
        };
        assert!(reason.to_string().contains("2/5"));

        let reason = SkipReason::BalanceTooLow {
            balance: dec!(0.50),
            minimum: dec!(1.00),
        };
        assert!(reason.to_string().contains("0.50"));
    }

    #[test]
    fn decision_serializes_with_discriminant() {
        let decision = Decision::NoTrade(SkipReason::NoTargetStrike);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["outcome"], "no_trade");
        assert_eq!(json["reason"], "no_target_strike");
        assert!(!decision.is_trade());
    }

    #[test]
    fn failed_carries_cause() {
        let decision = Decision::failed("spot feed timed out");
        match decision {
            Decision::Failed { cause } => assert!(cause.contains("timed out")),
            _ => panic!("expected Failed"),
        }
    }
}
