use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "edgebot")]
#[command(version = "0.1.0")]
#[command(about = "Kalshi crypto prediction-market pricing and decision engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Force dry run mode (no real orders), overriding config
    #[arg(short, long)]
    pub dry_run: bool,

    /// Config directory
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate the hourly strike market for one asset and act once
    Hourly {
        /// Asset code (btc, eth, xrp)
        #[arg(short, long)]
        asset: String,
    },
    /// Evaluate the open range markets and act once
    Range {
        /// Asset code (default btc)
        #[arg(short, long, default_value = "btc")]
        asset: String,
    },
    /// Scan range contracts against hourly strikes for price-identity gaps
    Arb,
    /// Run the hedged-short backtest over a daily close series
    Backtest {
        /// CSV input: date,close with a header row
        #[arg(short, long)]
        data: PathBuf,
        /// Output CSV for daily results
        #[arg(short, long, default_value = "backtest_results.csv")]
        output: PathBuf,
    },
    /// Run database migrations
    Migrate,
}
