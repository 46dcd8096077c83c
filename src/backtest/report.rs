//! Backtest output: daily rows, trade log, and summary statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// One simulated day, mirror of the state after all actions settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub price: f64,
    pub volatility: f64,
    pub cash: f64,
    pub short_shares: u64,
    pub short_value: f64,
    pub short_pnl: f64,
    pub call_value: f64,
    pub net_liquidation: f64,
    /// cash / short exposure; infinite while flat
    pub cash_buffer_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub action: String,
    pub detail: String,
    pub cash_after: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub buffer_ratio_min: f64,
    pub buffer_ratio_avg: f64,
    /// P&L decomposition, dollars
    pub short_pnl: f64,
    pub hedge_pnl: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub rows: Vec<DailyRow>,
    pub trades: Vec<TradeEvent>,
    pub stats: SummaryStats,
}

impl BacktestReport {
    /// Write the daily rows as CSV.
    pub fn write_daily_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        writeln!(
            w,
            "date,price,volatility,cash,short_shares,short_value,short_pnl,call_value,net_liquidation,cash_buffer_ratio"
        )?;
        for row in &self.rows {
            writeln!(
                w,
                "{},{:.4},{:.4},{:.2},{},{:.2},{:.2},{:.2},{:.2},{:.4}",
                row.date,
                row.price,
                row.volatility,
                row.cash,
                row.short_shares,
                row.short_value,
                row.short_pnl,
                row.call_value,
                row.net_liquidation,
                row.cash_buffer_ratio,
            )?;
        }
        w.flush()?;
        info!(rows = self.rows.len(), path = %path.as_ref().display(), "wrote daily results");
        Ok(())
    }
}

/// Summary statistics over the finished daily series.
pub fn compute_stats(
    rows: &[DailyRow],
    initial_capital: f64,
    risk_free_rate: f64,
    short_pnl: f64,
    hedge_pnl: f64,
) -> SummaryStats {
    if rows.is_empty() {
        return SummaryStats {
            total_return: 0.0,
            annualized_return: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            buffer_ratio_min: f64::INFINITY,
            buffer_ratio_avg: f64::INFINITY,
            short_pnl,
            hedge_pnl,
            total_pnl: 0.0,
        };
    }

    let final_nl = rows[rows.len() - 1].net_liquidation;
    let total_return = final_nl / initial_capital - 1.0;
    let days = rows.len() as f64;
    let annualized_return = (1.0 + total_return).powf(252.0 / days) - 1.0;

    // daily net-liquidation returns vs the daily risk-free leg
    let mut excess = Vec::with_capacity(rows.len().saturating_sub(1));
    for pair in rows.windows(2) {
        if pair[0].net_liquidation.abs() > f64::EPSILON {
            let r = pair[1].net_liquidation / pair[0].net_liquidation - 1.0;
            excess.push(r - risk_free_rate / 252.0);
        }
    }
    let sharpe_ratio = if excess.len() > 1 {
        let mean = excess.iter().sum::<f64>() / excess.len() as f64;
        let var = excess.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
            / (excess.len() as f64 - 1.0);
        let std = var.sqrt();
        if std > 0.0 {
            mean / std * (252.0f64).sqrt()
        } else {
            0.0
        }
    } else {
        0.0
    };

    let mut peak = f64::MIN;
    let mut max_drawdown = 0.0f64;
    for row in rows {
        peak = peak.max(row.net_liquidation);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max(1.0 - row.net_liquidation / peak);
        }
    }

    let finite: Vec<f64> = rows
        .iter()
        .map(|r| r.cash_buffer_ratio)
        .filter(|b| b.is_finite())
        .collect();
    let (buffer_ratio_min, buffer_ratio_avg) = if finite.is_empty() {
        (f64::INFINITY, f64::INFINITY)
    } else {
        let min = finite.iter().fold(f64::INFINITY, |a, b| a.min(*b));
        let avg = finite.iter().sum::<f64>() / finite.len() as f64;
        (min, avg)
    };

    SummaryStats {
        total_return,
        annualized_return,
        sharpe_ratio,
        max_drawdown,
        buffer_ratio_min,
        buffer_ratio_avg,
        short_pnl,
        hedge_pnl,
        total_pnl: final_nl - initial_capital,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, nl: f64, buffer: f64) -> DailyRow {
        DailyRow {
            date: date.parse().unwrap(),
            price: 50.0,
            volatility: 0.5,
            cash: 15_000.0,
            short_shares: 100,
            short_value: 5_000.0,
            short_pnl: 0.0,
            call_value: 100.0,
            net_liquidation: nl,
            cash_buffer_ratio: buffer,
        }
    }

    #[test]
    fn stats_on_flat_series() {
        let rows = vec![
            row("2024-01-02", 10_000.0, 3.0),
            row("2024-01-03", 10_000.0, 3.1),
            row("2024-01-04", 10_000.0, 2.9),
        ];
        let stats = compute_stats(&rows, 10_000.0, 0.05, 0.0, 0.0);
        assert!(stats.total_return.abs() < 1e-12);
        assert!(stats.max_drawdown.abs() < 1e-12);
        assert!((stats.buffer_ratio_min - 2.9).abs() < 1e-12);
        assert!((stats.buffer_ratio_avg - 3.0).abs() < 1e-12);
    }

    #[test]
    fn drawdown_tracks_peak() {
        let rows = vec![
            row("2024-01-02", 10_000.0, 3.0),
            row("2024-01-03", 12_000.0, 3.0),
            row("2024-01-04", 9_000.0, 3.0),
            row("2024-01-05", 11_000.0, 3.0),
        ];
        let stats = compute_stats(&rows, 10_000.0, 0.05, 0.0, 0.0);
        assert!((stats.max_drawdown - 0.25).abs() < 1e-12);
        assert!((stats.total_pnl - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn infinite_buffers_are_excluded() {
        let rows = vec![
            row("2024-01-02", 10_000.0, f64::INFINITY),
            row("2024-01-03", 10_000.0, 3.5),
        ];
        let stats = compute_stats(&rows, 10_000.0, 0.05, 0.0, 0.0);
        assert!((stats.buffer_ratio_min - 3.5).abs() < 1e-12);
    }

    #[test]
    fn csv_roundtrip_shape() {
        let report = BacktestReport {
            rows: vec![row("2024-01-02", 10_000.0, 3.0)],
            trades: vec![],
            stats: compute_stats(&[], 10_000.0, 0.05, 0.0, 0.0),
        };
        let path = std::env::temp_dir().join("edgebot_report_test.csv");
        report.write_daily_csv(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("date,price,volatility"));
        assert_eq!(content.lines().count(), 2);
        std::fs::remove_file(&path).ok();
    }
}
