use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub kalshi: KalshiConfig,
    pub database: DatabaseConfig,
    /// Per-asset hourly strike parameters, keyed by lowercase asset code
    /// ("btc", "eth", "xrp")
    #[serde(default)]
    pub assets: HashMap<String, AssetParams>,
    #[serde(default)]
    pub range: RangeParams,
    #[serde(default)]
    pub arbitrage: ArbitrageParams,
    #[serde(default)]
    pub backtest: BacktestParams,
    pub dry_run: DryRunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KalshiConfig {
    /// REST API base (e.g., "https://api.elections.kalshi.com/trade-api/v2")
    pub base_url: String,
    /// API access key id
    #[serde(default)]
    pub access_key: String,
    /// HMAC signing secret, base64-encoded
    #[serde(default)]
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DryRunConfig {
    /// Enable dry run mode (no real orders)
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parameters for one hourly strike NO market, per asset.
///
/// All probability/volatility thresholds are percentage points; money is
/// Decimal dollars; contract prices are integer cents.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetParams {
    /// Kalshi series ticker for the hourly event (e.g., "KXBTCD")
    pub series_ticker: String,
    /// Coinbase spot product (e.g., "BTC-USD")
    pub spot_product: String,
    /// Minimum basis points the strike must sit above spot
    pub min_bps_above: u32,
    /// Minimum model-minus-market edge, percentage points
    pub min_edge_pct: f64,
    /// Kelly fraction cap for this asset
    pub max_kelly_fraction: f64,
    /// Hard per-trade contract ceiling
    pub max_contracts: u32,
    /// NO ask bounds, cents inclusive
    pub min_no_cents: u32,
    pub max_no_cents: u32,
    /// Minimum profit-if-win as a percentage of cost
    pub min_profit_pct: f64,
    /// Halt trading when the chosen window std reaches this, pct
    pub max_volatility_pct: f64,
    /// Volatility floor applied before sqrt-time scaling, pct
    pub vol_floor_pct: f64,
    /// Skip when account balance is below this
    pub min_balance_usd: Decimal,
    /// Only trade at or after this minute of the hour
    pub window_start_minute: u32,
    /// Combined Kelly-fraction cap shared across correlated assets for the
    /// same settlement hour. None disables the shared budget.
    #[serde(default)]
    pub combined_exposure_cap: Option<f64>,
}

impl AssetParams {
    pub fn btc_default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            series_ticker: "KXBTCD".to_string(),
            spot_product: "BTC-USD".to_string(),
            min_bps_above: 20,
            min_edge_pct: 3.0,
            max_kelly_fraction: 0.25,
            max_contracts: 999,
            min_no_cents: 50,
            max_no_cents: 99,
            min_profit_pct: 9.0,
            max_volatility_pct: 11.0,
            vol_floor_pct: 0.15,
            min_balance_usd: dec!(1.00),
            window_start_minute: 45,
            combined_exposure_cap: None,
        }
    }

    pub fn eth_default() -> Self {
        Self {
            series_ticker: "KXETHD".to_string(),
            spot_product: "ETH-USD".to_string(),
            combined_exposure_cap: Some(0.25),
            ..Self::btc_default()
        }
    }

    pub fn xrp_default() -> Self {
        Self {
            series_ticker: "KXXRPD".to_string(),
            spot_product: "XRP-USD".to_string(),
            combined_exposure_cap: Some(0.25),
            ..Self::btc_default()
        }
    }
}

/// Parameters for the range-contract NO engine.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeParams {
    /// Kalshi series ticker for range events (e.g., "KXBTC")
    pub series_ticker: String,
    /// Coinbase spot product
    pub spot_product: String,
    /// Cap on the modelled NO probability
    pub max_model_prob: f64,
    pub min_edge_pct: f64,
    pub max_kelly_fraction: f64,
    pub max_contracts: u32,
    pub min_no_cents: u32,
    pub max_no_cents: u32,
    pub min_profit_pct: f64,
    /// Volatility floor applied before scaling, pct
    pub vol_floor_pct: f64,
    pub min_balance_usd: Decimal,
    /// Skip markets settling sooner than this
    pub min_minutes_to_settlement: i64,
}

impl Default for RangeParams {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            series_ticker: "KXBTC".to_string(),
            spot_product: "BTC-USD".to_string(),
            max_model_prob: 0.99,
            min_edge_pct: 3.0,
            max_kelly_fraction: 0.10,
            max_contracts: 999,
            min_no_cents: 50,
            max_no_cents: 98,
            min_profit_pct: 3.0,
            vol_floor_pct: 0.15,
            min_balance_usd: dec!(1.00),
            min_minutes_to_settlement: 15,
        }
    }
}

/// Parameters for the range-versus-hourly arbitrage scan.
#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrageParams {
    /// Hourly strike series to scan against (e.g., "KXBTCD")
    pub hourly_series: String,
    /// Range series providing the candidate bands (e.g., "KXBTC")
    pub range_series: String,
    /// Minimum locked-in profit per contract set, cents
    pub min_profit_cents: i64,
}

impl Default for ArbitrageParams {
    fn default() -> Self {
        Self {
            hourly_series: "KXBTCD".to_string(),
            range_series: "KXBTC".to_string(),
            min_profit_cents: 2,
        }
    }
}

/// Parameters for the hedged-short backtest.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestParams {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    /// Protective-call strike premium over spot (1.0 = 100% OTM)
    pub call_strike_premium: f64,
    pub call_expiry_days: i64,
    /// Fractional drop from last entry that triggers a scale-in
    pub scale_in_drop_pct: f64,
    pub lot_size: u32,
    /// Required cash / short-exposure multiple at entry
    pub cash_buffer_multiplier: f64,
    /// Rolling window for historical volatility, trading days
    pub vol_window_days: usize,
    /// Annualized volatility floor
    pub vol_floor: f64,
    /// Roll calls when days-to-expiry falls inside (roll_min, roll_max]
    pub roll_min_days: i64,
    pub roll_max_days: i64,
    /// Skip the roll when |cost| exceeds this fraction of cash
    pub roll_max_cost_frac: f64,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            risk_free_rate: 0.05,
            call_strike_premium: 1.0,
            call_expiry_days: 365,
            scale_in_drop_pct: 0.15,
            lot_size: 100,
            cash_buffer_multiplier: 3.0,
            vol_window_days: 30,
            vol_floor: 0.50,
            roll_min_days: 30,
            roll_max_days: 60,
            roll_max_cost_frac: 0.15,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .set_default("dry_run.enabled", true)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("EDGEBOT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (EDGEBOT_KALSHI__ACCESS_KEY, etc.)
            .add_source(
                Environment::with_prefix("EDGEBOT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Parameters for an asset, falling back to the built-in preset when the
    /// config file carries no section for it.
    pub fn asset_params(&self, asset: &str) -> Option<AssetParams> {
        if let Some(params) = self.assets.get(&asset.to_lowercase()) {
            return Some(params.clone());
        }
        match asset.to_lowercase().as_str() {
            "btc" => Some(AssetParams::btc_default()),
            "eth" => Some(AssetParams::eth_default()),
            "xrp" => Some(AssetParams::xrp_default()),
            _ => None,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.kalshi.base_url.is_empty() {
            errors.push("kalshi.base_url must be set".to_string());
        }

        for (name, params) in &self.assets {
            if params.min_no_cents == 0 || params.max_no_cents >= 100 {
                errors.push(format!(
                    "assets.{name}: NO price bounds must be inside (0, 100) cents"
                ));
            }
            if params.min_no_cents > params.max_no_cents {
                errors.push(format!(
                    "assets.{name}: min_no_cents exceeds max_no_cents"
                ));
            }
            if !(0.0..=1.0).contains(&params.max_kelly_fraction) {
                errors.push(format!(
                    "assets.{name}: max_kelly_fraction must be in [0, 1]"
                ));
            }
            if params.vol_floor_pct <= 0.0 {
                errors.push(format!("assets.{name}: vol_floor_pct must be positive"));
            }
            if params.window_start_minute >= 60 {
                errors.push(format!(
                    "assets.{name}: window_start_minute must be below 60"
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.range.max_model_prob) {
            errors.push("range.max_model_prob must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.range.max_kelly_fraction) {
            errors.push("range.max_kelly_fraction must be in [0, 1]".to_string());
        }
        if self.range.min_no_cents == 0 || self.range.max_no_cents >= 100 {
            errors.push("range: NO price bounds must be inside (0, 100) cents".to_string());
        }
        if self.range.min_no_cents > self.range.max_no_cents {
            errors.push("range: min_no_cents exceeds max_no_cents".to_string());
        }
        if self.range.vol_floor_pct <= 0.0 {
            errors.push("range.vol_floor_pct must be positive".to_string());
        }

        if self.backtest.initial_capital <= 0.0 {
            errors.push("backtest.initial_capital must be positive".to_string());
        }
        if self.backtest.cash_buffer_multiplier < 1.0 {
            errors.push("backtest.cash_buffer_multiplier must be at least 1".to_string());
        }
        if self.backtest.lot_size == 0 {
            errors.push("backtest.lot_size must be positive".to_string());
        }
        if self.backtest.roll_min_days >= self.backtest.roll_max_days {
            errors.push("backtest.roll_min_days must be below roll_max_days".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
