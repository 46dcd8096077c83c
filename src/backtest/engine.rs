//! Day-by-day simulation of a hedged short with protective calls.
//!
//! The book shorts on day one, scales in on configured drawdowns, and
//! carries one long call per 100 short shares as tail protection. Sizing
//! always respects the cash buffer at entry; later buffer violations from
//! price movement are part of what the simulation is measuring and are
//! left alone.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::BacktestParams;
use crate::error::{EdgebotError, Result};
use crate::pricing::black_scholes::call_price;

use super::data::{rolling_volatility, PriceBar};
use super::report::{compute_stats, BacktestReport, DailyRow, TradeEvent};

#[derive(Debug, Clone, Copy)]
struct ShortLot {
    entry_price: f64,
    shares: u64,
}

#[derive(Debug, Clone, Copy)]
struct CallHedge {
    strike: f64,
    expiry: NaiveDate,
    contracts: u64,
}

pub struct BacktestEngine {
    params: BacktestParams,
}

impl BacktestEngine {
    pub fn new(params: BacktestParams) -> Self {
        Self { params }
    }

    pub fn run(&self, bars: &[PriceBar]) -> Result<BacktestReport> {
        let p = &self.params;
        if bars.is_empty() {
            return Err(EdgebotError::BadHistoricalData(
                "empty bar series".to_string(),
            ));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let vols = rolling_volatility(&closes, p.vol_window_days, p.vol_floor);

        let mut cash = p.initial_capital;
        let mut lots: Vec<ShortLot> = Vec::new();
        let mut calls: Vec<CallHedge> = Vec::new();
        let mut last_entry_price = f64::NAN;
        // hedge cash flows: premiums out, payoffs and roll credits in
        let mut hedge_flow = 0.0f64;

        let mut rows: Vec<DailyRow> = Vec::with_capacity(bars.len());
        let mut trades: Vec<TradeEvent> = Vec::new();

        for (i, bar) in bars.iter().enumerate() {
            let price = bar.close;
            let vol = vols[i];

            // settle expiring hedges at intrinsic
            calls.retain(|call| {
                let dte = (call.expiry - bar.date).num_days();
                if dte > 0 {
                    return true;
                }
                let payoff = (price - call.strike).max(0.0) * 100.0 * call.contracts as f64;
                cash += payoff;
                hedge_flow += payoff;
                trades.push(TradeEvent {
                    date: bar.date,
                    action: "call_expired".to_string(),
                    detail: format!(
                        "strike {:.2} x{} paid {:.2}",
                        call.strike, call.contracts, payoff
                    ),
                    cash_after: cash,
                });
                false
            });

            let short_value: f64 = lots.iter().map(|l| l.shares as f64).sum::<f64>() * price;

            let entry_shares = if i == 0 {
                self.max_entry_shares(cash, short_value, price)
            } else if !last_entry_price.is_nan()
                && price <= last_entry_price * (1.0 - p.scale_in_drop_pct)
            {
                self.max_entry_shares(cash, short_value, price)
            } else {
                0
            };

            if entry_shares > 0 {
                cash += entry_shares as f64 * price;
                lots.push(ShortLot {
                    entry_price: price,
                    shares: entry_shares,
                });
                last_entry_price = price;
                trades.push(TradeEvent {
                    date: bar.date,
                    action: "short".to_string(),
                    detail: format!("{entry_shares} shares at {price:.2}"),
                    cash_after: cash,
                });

                let contracts = entry_shares / 100;
                if contracts > 0 {
                    let strike = price * (1.0 + p.call_strike_premium);
                    let premium = call_price(
                        price,
                        strike,
                        p.call_expiry_days as f64 / 365.0,
                        p.risk_free_rate,
                        vol,
                    ) * 100.0
                        * contracts as f64;
                    cash -= premium;
                    hedge_flow -= premium;
                    calls.push(CallHedge {
                        strike,
                        expiry: bar.date + chrono::Duration::days(p.call_expiry_days),
                        contracts,
                    });
                    trades.push(TradeEvent {
                        date: bar.date,
                        action: "buy_call".to_string(),
                        detail: format!("strike {strike:.2} x{contracts} cost {premium:.2}"),
                        cash_after: cash,
                    });
                }
            }

            // roll hedges approaching expiry while the cost stays small
            for call in calls.iter_mut() {
                let dte = (call.expiry - bar.date).num_days();
                if dte <= p.roll_min_days || dte > p.roll_max_days {
                    continue;
                }
                let old_value = call_price(
                    price,
                    call.strike,
                    dte as f64 / 365.0,
                    p.risk_free_rate,
                    vol,
                ) * 100.0
                    * call.contracts as f64;
                let new_strike = price * (1.0 + p.call_strike_premium);
                let new_cost = call_price(
                    price,
                    new_strike,
                    p.call_expiry_days as f64 / 365.0,
                    p.risk_free_rate,
                    vol,
                ) * 100.0
                    * call.contracts as f64;
                let roll_cost = new_cost - old_value;
                if roll_cost.abs() >= p.roll_max_cost_frac * cash {
                    debug!(roll_cost, cash, "roll skipped, too expensive");
                    continue;
                }
                cash -= roll_cost;
                hedge_flow -= roll_cost;
                call.strike = new_strike;
                call.expiry = bar.date + chrono::Duration::days(p.call_expiry_days);
                trades.push(TradeEvent {
                    date: bar.date,
                    action: "roll_call".to_string(),
                    detail: format!("to strike {new_strike:.2}, cost {roll_cost:.2}"),
                    cash_after: cash,
                });
            }

            // mark to market
            let total_shares: u64 = lots.iter().map(|l| l.shares).sum();
            let short_value = total_shares as f64 * price;
            let short_pnl: f64 = lots
                .iter()
                .map(|l| l.shares as f64 * (l.entry_price - price))
                .sum();
            let call_value: f64 = calls
                .iter()
                .map(|c| {
                    let dte = (c.expiry - bar.date).num_days().max(0);
                    call_price(
                        price,
                        c.strike,
                        dte as f64 / 365.0,
                        p.risk_free_rate,
                        vol,
                    ) * 100.0
                        * c.contracts as f64
                })
                .sum();
            let net_liquidation = cash - short_value + call_value;
            let cash_buffer_ratio = if short_value > 0.0 {
                cash / short_value
            } else {
                f64::INFINITY
            };

            rows.push(DailyRow {
                date: bar.date,
                price,
                volatility: vol,
                cash,
                short_shares: total_shares,
                short_value,
                short_pnl,
                call_value,
                net_liquidation,
                cash_buffer_ratio,
            });
        }

        let final_row = &rows[rows.len() - 1];
        let hedge_pnl = hedge_flow + final_row.call_value;
        let stats = compute_stats(
            &rows,
            p.initial_capital,
            p.risk_free_rate,
            final_row.short_pnl,
            hedge_pnl,
        );
        info!(
            days = rows.len(),
            total_return = stats.total_return,
            max_drawdown = stats.max_drawdown,
            "backtest complete"
        );

        Ok(BacktestReport {
            rows,
            trades,
            stats,
        })
    }

    /// Largest lot-rounded short addition keeping cash at or above
    /// buffer_multiplier times exposure immediately after entry. Shorting N
    /// at price p moves cash to cash + N*p and exposure to sv + N*p, so
    /// N <= (cash - m*sv) / ((m-1)*p).
    fn max_entry_shares(&self, cash: f64, short_value: f64, price: f64) -> u64 {
        let m = self.params.cash_buffer_multiplier;
        let lot = self.params.lot_size as u64;
        if price <= 0.0 || m <= 1.0 {
            return 0;
        }
        let max = (cash - m * short_value) / ((m - 1.0) * price);
        if max <= 0.0 {
            return 0;
        }
        let shares = max.floor() as u64;
        shares / lot * lot
    }
}
