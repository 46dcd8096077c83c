//! Pricing and decision engine for Kalshi crypto prediction markets.
//!
//! The crate turns spot prices, realized volatility, and Kalshi order
//! books into sized NO bets on hourly strike and range contracts, and
//! ships a hedged-short daily backtest for the analytical model.

pub mod adapters;
pub mod backtest;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod pricing;
pub mod runner;
pub mod strategy;

pub use config::AppConfig;
pub use error::{EdgebotError, Result};
