//! External collaborators: spot price feed, Kalshi brokerage, Postgres
//! ledger. Each sits behind a trait so the decision runners can be tested
//! against mocks.

pub mod coinbase;
pub mod kalshi;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{OrderReceipt, OrderRequest, RangeMarket, StrikeMarket, VolSnapshot};
use crate::error::Result;
use crate::strategy::exposure::HourExposure;

pub use coinbase::CoinbaseSpot;
pub use kalshi::KalshiClient;
pub use postgres::PostgresStore;

/// Current spot price for an asset.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpotPriceSource: Send + Sync {
    async fn spot_price(&self, product: &str) -> Result<Decimal>;
}

/// The brokerage surface the runners need: market discovery, account
/// state, order submission.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Strike markets for the next hourly settlement of a series
    async fn hourly_markets(&self, series_ticker: &str) -> Result<Vec<StrikeMarket>>;
    /// Range markets for the soonest open event of a series
    async fn range_markets(&self, series_ticker: &str) -> Result<Vec<RangeMarket>>;
    /// Available cash, dollars
    async fn balance(&self) -> Result<Decimal>;
    /// Cost basis of unsettled positions, dollars
    async fn unsettled_value(&self) -> Result<Decimal>;
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderReceipt>;
}

/// Persistence for model inputs and outcomes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Latest volatility snapshot for an asset, if any rows exist
    async fn latest_vol_snapshot(&self, asset: &str) -> Result<Option<VolSnapshot>>;
    /// Committed exposure fractions for a settlement hour
    async fn hour_exposure(&self, settlement_hour: DateTime<Utc>) -> Result<HourExposure>;
    /// Add a filled fraction for an asset in a settlement hour
    async fn commit_exposure(
        &self,
        settlement_hour: DateTime<Utc>,
        asset: &str,
        fraction: f64,
    ) -> Result<()>;
    /// Append one decision outcome to the trade log
    async fn log_trade(&self, entry: &postgres::TradeLogEntry) -> Result<()>;
}
