use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContractSide;

/// Order status as reported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Resting on the book
    Resting,
    /// Fully executed
    Executed,
    /// Cancelled before fill
    Canceled,
    /// Rejected by the exchange
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Executed | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }
}

/// Limit order request for one binary contract market. Price is the limit
/// in integer cents for the chosen side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub ticker: String,
    pub side: ContractSide,
    pub count: u32,
    pub limit_cents: u32,
}

impl OrderRequest {
    pub fn buy_no(ticker: String, count: u32, limit_cents: u32) -> Self {
        Self {
            client_order_id: Uuid::new_v4().to_string(),
            ticker,
            side: ContractSide::No,
            count,
            limit_cents,
        }
    }

    /// Dollar cost if fully filled at the limit
    pub fn cost(&self) -> Decimal {
        Decimal::from(self.count) * Decimal::from(self.limit_cents) / Decimal::from(100)
    }
}

/// Exchange acknowledgement for a submitted order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub client_order_id: String,
    pub status: OrderStatus,
    pub submitted_at: DateTime<Utc>,
    /// True when the order never left this process (dry run)
    pub dry_run: bool,
}

/// A fully sized trade with the model context that produced it, carried
/// from the decision engine to the order path and the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub asset: String,
    pub ticker: String,
    pub side: ContractSide,
    pub contracts: u32,
    pub limit_cents: u32,
    /// Modelled win probability for the side being bought
    pub model_prob: f64,
    /// Market-implied probability at the ask
    pub market_prob: f64,
    /// Model minus market, percentage points
    pub edge_pct: f64,
    /// Clamped Kelly fraction actually used
    pub kelly_fraction: f64,
    /// Dollar stake at the limit price
    pub stake: Decimal,
    pub bankroll: Decimal,
    pub spot_price: Decimal,
    /// Scaled volatility the model used, pct
    pub scaled_vol_pct: f64,
    pub settlement_time: DateTime<Utc>,
}

impl TradePlan {
    pub fn to_order(&self) -> OrderRequest {
        OrderRequest {
            client_order_id: Uuid::new_v4().to_string(),
            ticker: self.ticker.clone(),
            side: self.side,
            count: self.contracts,
            limit_cents: self.limit_cents,
        }
    }

    /// Profit if the side settles in the money, before fees
    pub fn profit_if_win(&self) -> Decimal {
        Decimal::from(self.contracts) * Decimal::from(100 - self.limit_cents.min(100))
            / Decimal::from(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_cost() {
        let order = OrderRequest::buy_no("KXBTCD-TEST".to_string(), 10, 70);
        assert_eq!(order.cost(), dec!(7.00));
        assert_eq!(order.side, ContractSide::No);
    }

    #[test]
    fn test_plan_profit_if_win() {
        let plan = TradePlan {
            asset: "BTC".to_string(),
            ticker: "KXBTCD-TEST".to_string(),
            side: ContractSide::No,
            contracts: 10,
            limit_cents: 70,
            model_prob: 0.85,
            market_prob: 0.70,
            edge_pct: 15.0,
            kelly_fraction: 0.25,
            stake: dec!(7.00),
            bankroll: dec!(100),
            spot_price: dec!(112000),
            scaled_vol_pct: 0.42,
            settlement_time: Utc::now(),
        };

        // 10 contracts * 30c upside
        assert_eq!(plan.profit_if_win(), dec!(3.00));
        let order = plan.to_order();
        assert_eq!(order.count, 10);
        assert_eq!(order.limit_cents, 70);
    }

    #[test]
    fn test_status_terminal() {
        assert!(OrderStatus::Executed.is_terminal());
        assert!(!OrderStatus::Resting.is_terminal());
    }
}
