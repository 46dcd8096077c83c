//! Kalshi REST adapter (native, no external SDK dependency).
//!
//! Request signing is HMAC-SHA256 over timestamp + method + path + body,
//! delivered in the kalshi-access-* headers. Hourly crypto events are
//! addressed by a generated event ticker carrying the settlement hour in
//! US Eastern time, so DST has to be handled here.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Timelike, Utc, Weekday,
};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, warn};

use super::Brokerage;
use crate::config::KalshiConfig;
use crate::domain::{OrderReceipt, OrderRequest, OrderStatus, RangeMarket, StrikeMarket};
use crate::error::{EdgebotError, Result};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Clone)]
pub struct KalshiClient {
    http: Client,
    base_url: String,
    access_key: Option<String>,
    api_secret: Option<String>,
    dry_run: bool,
}

impl KalshiClient {
    pub fn new(config: &KalshiConfig, dry_run: bool) -> Result<Self> {
        Self::with_timeout(config, dry_run, REQUEST_TIMEOUT)
    }

    fn with_timeout(
        config: &KalshiConfig,
        dry_run: bool,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent("edgebot/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| EdgebotError::Internal(format!("failed to build HTTP client: {e}")))?;

        let non_empty = |s: &str| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_key: non_empty(&config.access_key),
            api_secret: non_empty(&config.api_secret),
            dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn auth_headers(&self, method: &Method, path: &str, body: &str) -> Result<HeaderMap> {
        let key = self
            .access_key
            .as_ref()
            .ok_or_else(|| EdgebotError::Auth("kalshi.access_key is required".to_string()))?;
        let secret = self
            .api_secret
            .as_ref()
            .ok_or_else(|| EdgebotError::Auth("kalshi.api_secret is required".to_string()))?;

        let timestamp = Utc::now().timestamp_millis().to_string();
        let sign_payload = format!(
            "{}{}{}{}",
            timestamp,
            method.as_str().to_uppercase(),
            path,
            body
        );

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| EdgebotError::Auth(format!("invalid Kalshi secret: {e}")))?;
        mac.update(sign_payload.as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("kalshi-access-key"),
            HeaderValue::from_str(key)
                .map_err(|e| EdgebotError::Auth(format!("invalid access key header: {e}")))?,
        );
        headers.insert(
            HeaderName::from_static("kalshi-access-signature"),
            HeaderValue::from_str(&signature)
                .map_err(|e| EdgebotError::Auth(format!("invalid signature header: {e}")))?,
        );
        headers.insert(
            HeaderName::from_static("kalshi-access-timestamp"),
            HeaderValue::from_str(&timestamp)
                .map_err(|e| EdgebotError::Auth(format!("invalid timestamp header: {e}")))?,
        );

        Ok(headers)
    }

    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
        require_auth: bool,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let body_text = body
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_else(String::new);

        let mut req = self.http.request(method.clone(), &url);

        if let Some(query) = query {
            req = req.query(query);
        }

        if require_auth {
            let headers = self.auth_headers(&method, path, &body_text)?;
            req = req.headers(headers);
        }

        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status.as_u16() == 429 {
            return Err(EdgebotError::RateLimited(format!(
                "Kalshi API rate limited for {method} {path}"
            )));
        }

        if !status.is_success() {
            return Err(EdgebotError::Internal(format!(
                "Kalshi API {method} {path} failed: status={status} body={text}"
            )));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| EdgebotError::Internal(format!("invalid Kalshi JSON response: {e}")))
    }

    fn pick_array<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a [Value]> {
        keys.iter()
            .find_map(|key| root.get(*key).and_then(|v| v.as_array()).map(Vec::as_slice))
    }

    fn pick_obj<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a Value> {
        keys.iter().find_map(|key| root.get(*key))
    }

    fn pick_str<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a str> {
        Self::pick_obj(root, keys).and_then(|v| v.as_str())
    }

    fn parse_decimalish(value: &Value) -> Option<Decimal> {
        match value {
            Value::Null => None,
            Value::String(s) => Decimal::from_str_exact(s.trim()).ok(),
            Value::Number(n) => Decimal::from_str_exact(&n.to_string()).ok(),
            _ => None,
        }
    }

    fn parse_cents(value: &Value) -> Option<u32> {
        match value {
            Value::Number(n) => n.as_u64().map(|v| v as u32),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn parse_close_time(market: &Value) -> Option<DateTime<Utc>> {
        Self::pick_str(market, &["close_time", "expiration_time", "expected_expiration_time"])
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn map_strike_market(market: &Value) -> Option<StrikeMarket> {
        let ticker = Self::pick_str(market, &["ticker", "market_ticker"])?.to_string();
        let strike = Self::pick_obj(market, &["cap_strike", "floor_strike", "strike"])
            .and_then(Self::parse_decimalish)?;
        let close_time = Self::parse_close_time(market)?;

        Some(StrikeMarket {
            ticker,
            strike,
            yes_bid: Self::pick_obj(market, &["yes_bid"]).and_then(Self::parse_cents),
            yes_ask: Self::pick_obj(market, &["yes_ask"]).and_then(Self::parse_cents),
            no_bid: Self::pick_obj(market, &["no_bid"]).and_then(Self::parse_cents),
            no_ask: Self::pick_obj(market, &["no_ask"]).and_then(Self::parse_cents),
            close_time,
        })
    }

    fn map_range_market(market: &Value) -> Option<RangeMarket> {
        let ticker = Self::pick_str(market, &["ticker", "market_ticker"])?.to_string();
        let floor = Self::pick_obj(market, &["floor_strike"]).and_then(Self::parse_decimalish)?;
        let cap = Self::pick_obj(market, &["cap_strike"]).and_then(Self::parse_decimalish)?;
        let close_time = Self::parse_close_time(market)?;

        Some(RangeMarket {
            ticker,
            floor_strike: floor,
            cap_strike: cap,
            yes_bid: Self::pick_obj(market, &["yes_bid"]).and_then(Self::parse_cents),
            yes_ask: Self::pick_obj(market, &["yes_ask"]).and_then(Self::parse_cents),
            no_bid: Self::pick_obj(market, &["no_bid"]).and_then(Self::parse_cents),
            no_ask: Self::pick_obj(market, &["no_ask"]).and_then(Self::parse_cents),
            close_time,
        })
    }
}

// ── Eastern-time event tickers ──────────────────────────────────────────

/// US Eastern UTC offset at a given instant. DST runs from the second
/// Sunday of March 07:00 UTC to the first Sunday of November 06:00 UTC.
fn eastern_offset(at: DateTime<Utc>) -> FixedOffset {
    let year = at.year();
    let dst_start = Utc
        .from_utc_datetime(
            &nth_weekday(year, 3, Weekday::Sun, 2)
                .and_hms_opt(7, 0, 0)
                .unwrap_or_default(),
        );
    let dst_end = Utc
        .from_utc_datetime(
            &nth_weekday(year, 11, Weekday::Sun, 1)
                .and_hms_opt(6, 0, 0)
                .unwrap_or_default(),
        );

    let hours = if at >= dst_start && at < dst_end { -4 } else { -5 };
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let mut date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    let mut seen = 0;
    loop {
        if date.weekday() == weekday {
            seen += 1;
            if seen == n {
                return date;
            }
        }
        date = match date.succ_opt() {
            Some(d) => d,
            None => return date,
        };
    }
}

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Event ticker for the next hourly settlement of a series, e.g.
/// `KXBTCD-25AUG2917` for 17:00 Eastern on 2025-08-29.
pub fn next_hourly_event_ticker(series_ticker: &str, now: DateTime<Utc>) -> String {
    let next_hour = (now + Duration::hours(1))
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let eastern = next_hour.with_timezone(&eastern_offset(next_hour));

    format!(
        "{}-{:02}{}{:02}{:02}",
        series_ticker,
        eastern.year() % 100,
        MONTHS[eastern.month0() as usize],
        eastern.day(),
        eastern.hour()
    )
}

#[async_trait]
impl Brokerage for KalshiClient {
    async fn hourly_markets(&self, series_ticker: &str) -> Result<Vec<StrikeMarket>> {
        let event_ticker = next_hourly_event_ticker(series_ticker, Utc::now());
        let params = vec![
            ("event_ticker", event_ticker.clone()),
            ("status", "open".to_string()),
            ("limit", "200".to_string()),
        ];
        let value = self
            .request_json(Method::GET, "/markets", Some(&params), None, false)
            .await?;

        let markets = Self::pick_array(&value, &["markets", "data"]).unwrap_or(&[]);
        let mapped: Vec<StrikeMarket> = markets
            .iter()
            .filter_map(Self::map_strike_market)
            .collect();
        debug!(event_ticker, count = mapped.len(), "hourly markets");
        if mapped.is_empty() {
            return Err(EdgebotError::MarketDataUnavailable(format!(
                "no open markets for event {event_ticker}"
            )));
        }
        Ok(mapped)
    }

    async fn range_markets(&self, series_ticker: &str) -> Result<Vec<RangeMarket>> {
        let params = vec![
            ("series_ticker", series_ticker.to_string()),
            ("status", "open".to_string()),
            ("limit", "200".to_string()),
        ];
        let value = self
            .request_json(Method::GET, "/markets", Some(&params), None, false)
            .await?;

        let markets = Self::pick_array(&value, &["markets", "data"]).unwrap_or(&[]);
        let mut mapped: Vec<RangeMarket> = markets
            .iter()
            .filter_map(Self::map_range_market)
            .collect();
        if mapped.is_empty() {
            return Err(EdgebotError::MarketDataUnavailable(format!(
                "no open range markets for series {series_ticker}"
            )));
        }

        // keep only the soonest-settling event's markets
        let soonest = mapped
            .iter()
            .map(|m| m.close_time)
            .min()
            .unwrap_or_else(Utc::now);
        mapped.retain(|m| m.close_time == soonest);
        debug!(series_ticker, count = mapped.len(), "range markets");
        Ok(mapped)
    }

    async fn balance(&self) -> Result<Decimal> {
        if self.dry_run {
            return Ok(dec!(1000));
        }

        let value = self
            .request_json(Method::GET, "/portfolio/balance", None, None, true)
            .await?;
        let cents = Self::pick_obj(&value, &["balance", "available_balance"])
            .and_then(Self::parse_decimalish)
            .unwrap_or(Decimal::ZERO);
        Ok(cents / dec!(100))
    }

    async fn unsettled_value(&self) -> Result<Decimal> {
        if self.dry_run {
            return Ok(Decimal::ZERO);
        }

        let value = self
            .request_json(Method::GET, "/portfolio/positions", None, None, true)
            .await?;
        let positions =
            Self::pick_array(&value, &["market_positions", "positions"]).unwrap_or(&[]);

        let mut total = Decimal::ZERO;
        for pos in positions {
            let exposure = Self::pick_obj(pos, &["market_exposure", "total_traded"])
                .and_then(Self::parse_decimalish)
                .unwrap_or(Decimal::ZERO);
            total += exposure / dec!(100);
        }
        Ok(total)
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        if self.dry_run {
            debug!(ticker = %request.ticker, count = request.count, "dry-run order");
            return Ok(OrderReceipt {
                order_id: request.client_order_id.clone(),
                client_order_id: request.client_order_id.clone(),
                status: OrderStatus::Executed,
                submitted_at: Utc::now(),
                dry_run: true,
            });
        }

        let mut body = json!({
            "ticker": request.ticker,
            "client_order_id": request.client_order_id,
            "action": "buy",
            "side": request.side.as_str(),
            "type": "limit",
            "count": request.count,
        });
        // limit goes in yes_price or no_price depending on the side
        body[format!("{}_price", request.side.as_str()).as_str()] = json!(request.limit_cents);

        let value = self
            .request_json(Method::POST, "/portfolio/orders", None, Some(body), true)
            .await?;
        let order = Self::pick_obj(&value, &["order", "data"]).unwrap_or(&value);

        let order_id = Self::pick_str(order, &["order_id", "id"])
            .unwrap_or(&request.client_order_id)
            .to_string();
        let status = match Self::pick_str(order, &["status", "state"])
            .unwrap_or("resting")
            .to_ascii_lowercase()
            .as_str()
        {
            "executed" | "filled" => OrderStatus::Executed,
            "canceled" | "cancelled" => OrderStatus::Canceled,
            "rejected" => OrderStatus::Rejected,
            other => {
                if other != "resting" {
                    warn!(status = other, "unrecognized order status, treating as resting");
                }
                OrderStatus::Resting
            }
        };

        Ok(OrderReceipt {
            order_id,
            client_order_id: request.client_order_id.clone(),
            status,
            submitted_at: Utc::now(),
            dry_run: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn eastern_offset_handles_dst() {
        // late August: EDT, UTC-4
        assert_eq!(
            eastern_offset(utc(2025, 8, 29, 12, 0)).local_minus_utc(),
            -4 * 3600
        );
        // January: EST, UTC-5
        assert_eq!(
            eastern_offset(utc(2025, 1, 15, 12, 0)).local_minus_utc(),
            -5 * 3600
        );
        // 2025 transition: second Sunday of March is the 9th
        assert_eq!(
            eastern_offset(utc(2025, 3, 9, 6, 59)).local_minus_utc(),
            -5 * 3600
        );
        assert_eq!(
            eastern_offset(utc(2025, 3, 9, 7, 0)).local_minus_utc(),
            -4 * 3600
        );
    }

    #[test]
    fn hourly_event_ticker_uses_eastern_settlement() {
        // 2025-08-29 20:50 UTC -> next hour 21:00 UTC = 17:00 EDT
        let ticker = next_hourly_event_ticker("KXBTCD", utc(2025, 8, 29, 20, 50));
        assert_eq!(ticker, "KXBTCD-25AUG2917");

        // winter: 2025-01-15 20:50 UTC -> 21:00 UTC = 16:00 EST
        let ticker = next_hourly_event_ticker("KXETHD", utc(2025, 1, 15, 20, 50));
        assert_eq!(ticker, "KXETHD-25JAN1516");

        // ET date rolls behind UTC after midnight UTC
        let ticker = next_hourly_event_ticker("KXBTCD", utc(2025, 8, 30, 1, 10));
        assert_eq!(ticker, "KXBTCD-25AUG2922");
    }

    #[test]
    fn maps_strike_markets_from_payload() {
        let market = serde_json::json!({
            "ticker": "KXBTCD-25AUG2917-T112000",
            "cap_strike": 112000.0,
            "yes_bid": 28, "yes_ask": 33, "no_bid": 67, "no_ask": 72,
            "close_time": "2025-08-29T21:00:00Z"
        });
        let mapped = KalshiClient::map_strike_market(&market).unwrap();
        assert_eq!(mapped.strike, dec!(112000));
        assert_eq!(mapped.no_ask, Some(72));

        // missing strike is dropped
        let bad = serde_json::json!({
            "ticker": "X", "close_time": "2025-08-29T21:00:00Z"
        });
        assert!(KalshiClient::map_strike_market(&bad).is_none());
    }

    #[test]
    fn maps_range_markets_and_requires_both_strikes() {
        let market = serde_json::json!({
            "ticker": "KXBTC-25AUG29-B111750",
            "floor_strike": 111500.0,
            "cap_strike": 112000.0,
            "no_ask": 64,
            "close_time": "2025-08-29T21:00:00Z"
        });
        let mapped = KalshiClient::map_range_market(&market).unwrap();
        assert_eq!(mapped.floor_strike, dec!(111500));
        assert_eq!(mapped.cap_strike, dec!(112000));

        let one_sided = serde_json::json!({
            "ticker": "KXBTC-25AUG29-T112000",
            "cap_strike": 112000.0,
            "close_time": "2025-08-29T21:00:00Z"
        });
        assert!(KalshiClient::map_range_market(&one_sided).is_none());
    }

    #[tokio::test]
    async fn unresponsive_host_times_out_instead_of_hanging() {
        // a socket that accepts connections but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                std::thread::sleep(std::time::Duration::from_secs(5));
                drop(stream);
            }
        });

        let config = KalshiConfig {
            base_url: format!("http://{addr}"),
            access_key: String::new(),
            api_secret: String::new(),
        };
        let client =
            KalshiClient::with_timeout(&config, false, std::time::Duration::from_millis(200))
                .unwrap();

        let err = client.hourly_markets("KXBTCD").await.unwrap_err();
        assert!(matches!(err, EdgebotError::Http(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn dry_run_orders_never_leave_the_process() {
        let config = KalshiConfig {
            base_url: "https://api.elections.kalshi.com/trade-api/v2".to_string(),
            access_key: String::new(),
            api_secret: String::new(),
        };
        let client = KalshiClient::new(&config, true).unwrap();
        let receipt = client
            .submit_order(&OrderRequest::buy_no("KXBTCD-TEST".to_string(), 5, 70))
            .await
            .unwrap();
        assert!(receipt.dry_run);
        assert_eq!(receipt.status, OrderStatus::Executed);
        assert_eq!(client.balance().await.unwrap(), dec!(1000));
    }
}
