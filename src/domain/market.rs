use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of a binary contract (YES or NO)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSide {
    Yes,
    No,
}

impl ContractSide {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            ContractSide::Yes => ContractSide::No,
            ContractSide::No => ContractSide::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractSide::Yes => "yes",
            ContractSide::No => "no",
        }
    }
}

impl std::fmt::Display for ContractSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An hourly "above the strike" market. YES pays when spot settles at or
/// above the cap strike; the engines buy NO. Prices are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeMarket {
    pub ticker: String,
    pub strike: Decimal,
    pub yes_bid: Option<u32>,
    pub yes_ask: Option<u32>,
    pub no_bid: Option<u32>,
    pub no_ask: Option<u32>,
    pub close_time: DateTime<Utc>,
}

impl StrikeMarket {
    /// Minutes until settlement, clamped at zero
    pub fn minutes_to_close(&self, now: DateTime<Utc>) -> i64 {
        (self.close_time - now).num_minutes().max(0)
    }

    /// Market-implied YES probability from the NO ask (both sides of one
    /// contract sum to a dollar)
    pub fn implied_yes_prob(&self) -> Option<f64> {
        self.no_ask.map(|c| 1.0 - c as f64 / 100.0)
    }
}

/// A range market settling YES when spot finishes inside [floor, cap].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeMarket {
    pub ticker: String,
    pub floor_strike: Decimal,
    pub cap_strike: Decimal,
    pub yes_bid: Option<u32>,
    pub yes_ask: Option<u32>,
    pub no_bid: Option<u32>,
    pub no_ask: Option<u32>,
    pub close_time: DateTime<Utc>,
}

impl RangeMarket {
    pub fn minutes_to_close(&self, now: DateTime<Utc>) -> i64 {
        (self.close_time - now).num_minutes().max(0)
    }
}

/// One realized-volatility reading over a lookback window, as stored by the
/// collector. `std_pct` is the standard deviation of 1-minute returns over
/// the window, in percentage points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolEstimate {
    pub window_minutes: u32,
    pub std_pct: f64,
    pub samples: u32,
}

/// Latest volatility snapshot for one asset: a set of window estimates taken
/// at the same instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolSnapshot {
    pub asset: String,
    pub taken_at: DateTime<Utc>,
    pub estimates: Vec<VolEstimate>,
}

impl VolSnapshot {
    pub fn estimate_for(&self, window_minutes: u32) -> Option<&VolEstimate> {
        self.estimates
            .iter()
            .find(|e| e.window_minutes == window_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_opposite() {
        assert_eq!(ContractSide::Yes.opposite(), ContractSide::No);
        assert_eq!(ContractSide::No.as_str(), "no");
    }

    #[test]
    fn test_implied_yes_prob() {
        let market = StrikeMarket {
            ticker: "KXBTCD-25AUG2917-T112000".to_string(),
            strike: dec!(112000),
            yes_bid: Some(30),
            yes_ask: Some(35),
            no_bid: Some(65),
            no_ask: Some(70),
            close_time: Utc::now() + chrono::Duration::minutes(12),
        };

        // NO at 70c implies YES at 30%
        assert!((market.implied_yes_prob().unwrap() - 0.30).abs() < 1e-9);
        assert_eq!(market.minutes_to_close(Utc::now()), 11);
    }

    #[test]
    fn test_minutes_to_close_clamps_at_zero() {
        let market = RangeMarket {
            ticker: "KXBTC-25AUG29-B111500".to_string(),
            floor_strike: dec!(111000),
            cap_strike: dec!(112000),
            yes_bid: Some(38),
            yes_ask: Some(42),
            no_bid: None,
            no_ask: Some(60),
            close_time: Utc::now() - chrono::Duration::minutes(5),
        };
        assert_eq!(market.minutes_to_close(Utc::now()), 0);
    }

    #[test]
    fn test_snapshot_lookup() {
        let snap = VolSnapshot {
            asset: "BTC".to_string(),
            taken_at: Utc::now(),
            estimates: vec![
                VolEstimate { window_minutes: 5, std_pct: 0.12, samples: 5 },
                VolEstimate { window_minutes: 15, std_pct: 0.25, samples: 15 },
            ],
        };
        assert_eq!(snap.estimate_for(15).unwrap().samples, 15);
        assert!(snap.estimate_for(30).is_none());
    }
}
