//! Hourly strike NO engine.
//!
//! Buys NO on the first strike sitting far enough above spot, when the
//! model says the price will stay below it and the market underprices that
//! view. One evaluation per scheduled invocation; everything it needs is
//! fetched up front, so `evaluate` is pure and fully testable.

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::AssetParams;
use crate::domain::{ContractSide, StrikeMarket, TradePlan, VolSnapshot};
use crate::pricing::{barrier, volatility};
use crate::strategy::decision::{Decision, SkipReason};
use crate::strategy::exposure::{effective_cap, HourExposure};
use crate::strategy::kelly;

/// Everything one evaluation consumes, fetched by the runner.
#[derive(Debug, Clone)]
pub struct HourlyInput {
    pub now: DateTime<Utc>,
    pub balance: Decimal,
    pub spot: Decimal,
    pub vol: VolSnapshot,
    /// All strike markets for the next settlement, any order
    pub markets: Vec<StrikeMarket>,
    /// Committed fractions for this settlement hour across correlated assets
    pub exposure: HourExposure,
}

pub struct HourlyEngine {
    asset: String,
    params: AssetParams,
}

impl HourlyEngine {
    pub fn new(asset: impl Into<String>, params: AssetParams) -> Self {
        Self {
            asset: asset.into(),
            params,
        }
    }

    pub fn evaluate(&self, input: &HourlyInput) -> Decision {
        let p = &self.params;

        if input.balance < p.min_balance_usd {
            return Decision::NoTrade(SkipReason::BalanceTooLow {
                balance: input.balance,
                minimum: p.min_balance_usd,
            });
        }

        let minute = input.now.minute();
        if minute < p.window_start_minute {
            return Decision::NoTrade(SkipReason::OutsideWindow {
                minute,
                opens_at: p.window_start_minute,
            });
        }

        let Some(target) = self.target_market(input) else {
            return Decision::NoTrade(SkipReason::NoTargetStrike);
        };
        let minutes_left = target.minutes_to_close(input.now);

        let Some(window) = volatility::select_window(&input.vol.estimates, minutes_left) else {
            return Decision::NoTrade(SkipReason::InsufficientSamples {
                window_minutes: 0,
                samples: 0,
                required: volatility::min_samples(0),
            });
        };
        if !volatility::has_enough_samples(&window) {
            return Decision::NoTrade(SkipReason::InsufficientSamples {
                window_minutes: window.window_minutes,
                samples: window.samples,
                required: volatility::min_samples(window.window_minutes),
            });
        }
        if window.std_pct >= p.max_volatility_pct {
            return Decision::NoTrade(SkipReason::VolatilityHalt {
                std_pct: window.std_pct,
                limit_pct: p.max_volatility_pct,
            });
        }

        let Some(no_ask) = target.no_ask else {
            return Decision::NoTrade(SkipReason::NoQuote);
        };
        if no_ask < p.min_no_cents || no_ask > p.max_no_cents {
            return Decision::NoTrade(SkipReason::PriceOutOfBounds { cents: no_ask });
        }

        let spot = input.spot.to_f64().unwrap_or(0.0);
        let strike = target.strike.to_f64().unwrap_or(0.0);
        let scaled_vol = volatility::scale_vol(
            window.std_pct,
            f64::from(window.window_minutes),
            minutes_left.max(1) as f64,
            p.vol_floor_pct,
        );
        let model_prob = barrier::prob_below(spot, strike, scaled_vol);
        let market_prob = no_ask as f64 / 100.0;
        let edge_pct = (model_prob - market_prob) * 100.0;

        debug!(
            asset = %self.asset,
            ticker = %target.ticker,
            strike,
            spot,
            window = window.window_minutes,
            scaled_vol,
            model_prob,
            market_prob,
            edge_pct,
            "hourly model"
        );

        if edge_pct < p.min_edge_pct {
            return Decision::NoTrade(SkipReason::InsufficientEdge {
                edge_pct,
                required_pct: p.min_edge_pct,
            });
        }

        let cap = effective_cap(p.max_kelly_fraction, p.combined_exposure_cap, &input.exposure);
        if cap <= 0.0 {
            return Decision::NoTrade(SkipReason::ExposureBudgetExhausted {
                remaining_fraction: cap,
            });
        }

        let Some(stake) = kelly::size_bet(model_prob, no_ask, input.balance, cap, p.max_contracts)
        else {
            return Decision::NoTrade(SkipReason::BetBelowOneContract);
        };

        let profit_pct = kelly::profit_pct(no_ask);
        if profit_pct < p.min_profit_pct {
            return Decision::NoTrade(SkipReason::InsufficientProfit {
                profit_pct,
                required_pct: p.min_profit_pct,
            });
        }

        Decision::Trade(TradePlan {
            asset: self.asset.clone(),
            ticker: target.ticker.clone(),
            side: ContractSide::No,
            contracts: stake.contracts,
            limit_cents: no_ask,
            model_prob,
            market_prob,
            edge_pct,
            kelly_fraction: stake.fraction,
            stake: stake.stake,
            bankroll: input.balance,
            spot_price: input.spot,
            scaled_vol_pct: scaled_vol,
            settlement_time: target.close_time,
        })
    }

    /// First strike at least `min_bps_above` basis points above spot.
    fn target_market<'a>(&self, input: &'a HourlyInput) -> Option<&'a StrikeMarket> {
        let threshold = input.spot
            * (Decimal::ONE + Decimal::from(self.params.min_bps_above) / Decimal::from(10_000));
        input
            .markets
            .iter()
            .filter(|m| m.strike >= threshold)
            .min_by_key(|m| m.strike)
    }
}
