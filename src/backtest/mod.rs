//! Hedged-short backtest: daily simulation, historical data handling, and
//! reporting.

pub mod data;
pub mod engine;
pub mod report;

pub use data::{load_bars_from_csv, rolling_volatility, PriceBar};
pub use engine::BacktestEngine;
pub use report::{BacktestReport, DailyRow, SummaryStats, TradeEvent};
