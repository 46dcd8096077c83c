use thiserror::Error;

/// Main error type for the trading bot
#[derive(Error, Debug)]
pub enum EdgebotError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors
    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    #[error("Volatility data unavailable for {0}")]
    VolatilityUnavailable(String),

    // Order execution errors
    #[error("Order submission failed: {0}")]
    OrderSubmission(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    // Backtest input errors
    #[error("Bad historical data: {0}")]
    BadHistoricalData(String),

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using EdgebotError
pub type Result<T> = std::result::Result<T, EdgebotError>;

impl EdgebotError {
    /// True when the failure is transient and the next scheduled invocation
    /// may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EdgebotError::Http(_)
                | EdgebotError::RateLimited(_)
                | EdgebotError::MarketDataUnavailable(_)
                | EdgebotError::Database(_)
        )
    }
}
