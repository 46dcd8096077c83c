use clap::Parser;
use edgebot::adapters::{CoinbaseSpot, KalshiClient, PostgresStore};
use edgebot::backtest::{load_bars_from_csv, BacktestEngine};
use edgebot::cli::{Cli, Commands};
use edgebot::config::AppConfig;
use edgebot::error::{EdgebotError, Result};
use edgebot::runner;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        for error in &errors {
            warn!(%error, "config validation");
        }
        return Err(EdgebotError::Validation(errors.join("; ")));
    }
    let dry_run = cli.dry_run || config.dry_run.enabled;

    match &cli.command {
        Commands::Hourly { asset } => {
            let params = config.asset_params(asset).ok_or_else(|| {
                EdgebotError::Validation(format!("no parameters for asset {asset}"))
            })?;
            let spot = CoinbaseSpot::new()?;
            let broker = KalshiClient::new(&config.kalshi, dry_run)?;
            let ledger =
                PostgresStore::new(&config.database.url, config.database.max_connections).await?;

            let decision = runner::run_hourly(asset, params, &spot, &broker, &ledger).await;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Range { asset } => {
            let spot = CoinbaseSpot::new()?;
            let broker = KalshiClient::new(&config.kalshi, dry_run)?;
            let ledger =
                PostgresStore::new(&config.database.url, config.database.max_connections).await?;

            let decision =
                runner::run_range(asset, config.range.clone(), &spot, &broker, &ledger).await;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Arb => {
            let broker = KalshiClient::new(&config.kalshi, dry_run)?;
            let opportunities = runner::run_arb_scan(&config.arbitrage, &broker).await?;
            if opportunities.is_empty() {
                info!("no price-identity violations found");
            }
            println!("{}", serde_json::to_string_pretty(&opportunities)?);
        }
        Commands::Backtest { data, output } => {
            let bars = load_bars_from_csv(data)?;
            let report = BacktestEngine::new(config.backtest.clone()).run(&bars)?;
            report.write_daily_csv(output)?;

            let stats = &report.stats;
            info!(
                total_return = stats.total_return,
                annualized = stats.annualized_return,
                sharpe = stats.sharpe_ratio,
                max_drawdown = stats.max_drawdown,
                "backtest summary"
            );
            println!("{}", serde_json::to_string_pretty(stats)?);
        }
        Commands::Migrate => {
            let store =
                PostgresStore::new(&config.database.url, config.database.max_connections).await?;
            store.migrate().await?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,edgebot=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
