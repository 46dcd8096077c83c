//! Coinbase public spot price feed.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::SpotPriceSource;
use crate::error::{EdgebotError, Result};

const DEFAULT_BASE: &str = "https://api.coinbase.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct CoinbaseSpot {
    http: Client,
    base_url: String,
}

impl CoinbaseSpot {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent("edgebot/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EdgebotError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn parse_amount(value: &Value) -> Option<Decimal> {
        value
            .get("data")
            .and_then(|d| d.get("amount"))
            .and_then(|a| a.as_str())
            .and_then(|s| Decimal::from_str_exact(s.trim()).ok())
    }
}

#[async_trait]
impl SpotPriceSource for CoinbaseSpot {
    async fn spot_price(&self, product: &str) -> Result<Decimal> {
        let url = format!("{}/v2/prices/{}/spot", self.base_url, product);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EdgebotError::MarketDataUnavailable(format!(
                "Coinbase spot {product} returned status {status}"
            )));
        }
        let value: Value = resp.json().await?;
        let price = Self::parse_amount(&value).ok_or_else(|| {
            EdgebotError::InvalidMarketData(format!("unparseable Coinbase spot body for {product}"))
        })?;
        if price <= Decimal::ZERO {
            return Err(EdgebotError::InvalidMarketData(format!(
                "non-positive Coinbase spot for {product}: {price}"
            )));
        }
        debug!(%product, %price, "coinbase spot");
        Ok(price)
    }
}
