//! Range contract NO engine.
//!
//! A range market pays YES when spot settles inside [floor, cap]. The
//! engine prices NO on every candidate band and takes the single best
//! edge, with a tighter Kelly cap than the hourly engine since both tails
//! pay and the model is cruder.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::RangeParams;
use crate::domain::{ContractSide, RangeMarket, TradePlan, VolSnapshot};
use crate::pricing::{barrier, volatility};
use crate::strategy::decision::{Decision, SkipReason};
use crate::strategy::kelly;

#[derive(Debug, Clone)]
pub struct RangeInput {
    pub now: DateTime<Utc>,
    pub balance: Decimal,
    pub spot: Decimal,
    pub vol: VolSnapshot,
    pub markets: Vec<RangeMarket>,
}

pub struct RangeEngine {
    asset: String,
    params: RangeParams,
}

impl RangeEngine {
    pub fn new(asset: impl Into<String>, params: RangeParams) -> Self {
        Self {
            asset: asset.into(),
            params,
        }
    }

    /// Evaluate every market and keep the highest-edge plan. When nothing
    /// qualifies, report the skip from the market that got furthest down
    /// the pipeline.
    pub fn evaluate(&self, input: &RangeInput) -> Decision {
        let p = &self.params;

        if input.balance < p.min_balance_usd {
            return Decision::NoTrade(SkipReason::BalanceTooLow {
                balance: input.balance,
                minimum: p.min_balance_usd,
            });
        }
        if input.markets.is_empty() {
            return Decision::NoTrade(SkipReason::NoTargetStrike);
        }

        let mut best: Option<TradePlan> = None;
        let mut deepest_skip = SkipReason::NoTargetStrike;
        let mut deepest_rank = 0u8;

        for market in &input.markets {
            match self.evaluate_market(input, market) {
                Ok(plan) => {
                    let better = best
                        .as_ref()
                        .map(|b| plan.edge_pct > b.edge_pct)
                        .unwrap_or(true);
                    if better {
                        best = Some(plan);
                    }
                }
                Err(skip) => {
                    let rank = skip_rank(&skip);
                    if rank >= deepest_rank {
                        deepest_rank = rank;
                        deepest_skip = skip;
                    }
                }
            }
        }

        match best {
            Some(plan) => Decision::Trade(plan),
            None => Decision::NoTrade(deepest_skip),
        }
    }

    fn evaluate_market(
        &self,
        input: &RangeInput,
        market: &RangeMarket,
    ) -> std::result::Result<TradePlan, SkipReason> {
        let p = &self.params;

        let minutes_left = market.minutes_to_close(input.now);
        if minutes_left < p.min_minutes_to_settlement {
            return Err(SkipReason::TooCloseToSettlement {
                minutes: minutes_left,
            });
        }

        let Some(no_ask) = market.no_ask else {
            return Err(SkipReason::NoQuote);
        };
        if no_ask < p.min_no_cents || no_ask > p.max_no_cents {
            return Err(SkipReason::PriceOutOfBounds { cents: no_ask });
        }

        let Some(window) = volatility::select_window(&input.vol.estimates, minutes_left) else {
            return Err(SkipReason::InsufficientSamples {
                window_minutes: 0,
                samples: 0,
                required: volatility::min_samples(0),
            });
        };
        if !volatility::has_enough_samples(&window) {
            return Err(SkipReason::InsufficientSamples {
                window_minutes: window.window_minutes,
                samples: window.samples,
                required: volatility::min_samples(window.window_minutes),
            });
        }

        let spot = input.spot.to_f64().unwrap_or(0.0);
        let scaled_vol = volatility::scale_vol(
            window.std_pct,
            f64::from(window.window_minutes),
            minutes_left.max(1) as f64,
            p.vol_floor_pct,
        );
        let model_prob = barrier::prob_outside_range(
            spot,
            market.floor_strike.to_f64().unwrap_or(0.0),
            market.cap_strike.to_f64().unwrap_or(0.0),
            scaled_vol,
            p.max_model_prob,
        );
        let market_prob = no_ask as f64 / 100.0;
        let edge_pct = (model_prob - market_prob) * 100.0;

        debug!(
            asset = %self.asset,
            ticker = %market.ticker,
            scaled_vol,
            model_prob,
            market_prob,
            edge_pct,
            "range model"
        );

        if edge_pct < p.min_edge_pct {
            return Err(SkipReason::InsufficientEdge {
                edge_pct,
                required_pct: p.min_edge_pct,
            });
        }

        let stake = kelly::size_bet(
            model_prob,
            no_ask,
            input.balance,
            p.max_kelly_fraction,
            p.max_contracts,
        )
        .ok_or(SkipReason::BetBelowOneContract)?;

        let profit_pct = kelly::profit_pct(no_ask);
        if profit_pct < p.min_profit_pct {
            return Err(SkipReason::InsufficientProfit {
                profit_pct,
                required_pct: p.min_profit_pct,
            });
        }

        Ok(TradePlan {
            asset: self.asset.clone(),
            ticker: market.ticker.clone(),
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
            settlement_time: market.close_time,
        })
    }
}

/// Pipeline depth of a skip, for picking the most informative one.
fn skip_rank(skip: &SkipReason) -> u8 {
    match skip {
        SkipReason::TooCloseToSettlement { .. } => 1,
        SkipReason::NoQuote => 2,
        SkipReason::PriceOutOfBounds { .. } => 3,
        SkipReason::InsufficientSamples { .. } => 4,
        SkipReason::InsufficientEdge { .. } => 5,
        SkipReason::BetBelowOneContract => 6,
        SkipReason::InsufficientProfit { .. } => 7,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VolEstimate;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn market(
        ticker: &str,
        floor: Decimal,
        cap: Decimal,
        no_ask: Option<u32>,
        close: DateTime<Utc>,
    ) -> RangeMarket {
        RangeMarket {
            ticker: ticker.to_string(),
            floor_strike: floor,
            cap_strike: cap,
            yes_bid: no_ask.map(|a| 100u32.saturating_sub(a)),
            yes_ask: no_ask.map(|a| 100u32.saturating_sub(a) + 2),
            no_bid: no_ask.map(|a| a.saturating_sub(2)),
            no_ask,
            close_time: close,
        }
    }

    fn base_input() -> RangeInput {
        let now = Utc.with_ymd_and_hms(2025, 8, 29, 14, 0, 0).unwrap();
        let close = Utc.with_ymd_and_hms(2025, 8, 29, 15, 0, 0).unwrap();
        RangeInput {
            now,
            balance: dec!(500),
            spot: dec!(112000),
            vol: VolSnapshot {
                asset: "BTC".to_string(),
                taken_at: now,
                estimates: vec![
                    VolEstimate { window_minutes: 15, std_pct: 0.10, samples: 15 },
                    VolEstimate { window_minutes: 30, std_pct: 0.12, samples: 30 },
                    VolEstimate { window_minutes: 60, std_pct: 0.15, samples: 60 },
                ],
            },
            markets: vec![
                // spot dead-centre: in-range likely, NO rich
                market("B112000", dec!(111750), dec!(112250), Some(55), close),
                // spot far outside this band: NO nearly sure
                market("B110000", dec!(109750), dec!(110250), Some(90), close),
                // band around spot, wide: NO cheap but model agrees
                market("B113000", dec!(112750), dec!(113250), Some(92), close),
            ],
        }
    }

    fn engine() -> RangeEngine {
        RangeEngine::new("BTC", RangeParams::default())
    }

    #[test]
    fn picks_the_highest_edge_band() {
        let decision = engine().evaluate(&base_input());
        let Decision::Trade(plan) = decision else {
            panic!("expected trade, got {decision:?}");
        };
        // distant bands have NO prob capped at 0.99; the 90c ask leaves the
        // widest edge
        assert_eq!(plan.ticker, "B110000");
        assert!(plan.model_prob <= 0.99);
        assert!(plan.edge_pct >= 3.0);
        assert!(plan.kelly_fraction <= 0.10);
    }

    #[test]
    fn empty_book_is_no_target() {
        let mut input = base_input();
        input.markets.clear();
        assert_eq!(
            engine().evaluate(&input),
            Decision::NoTrade(SkipReason::NoTargetStrike)
        );
    }

    #[test]
    fn skips_markets_settling_too_soon() {
        let mut input = base_input();
        let close = input.now + chrono::Duration::minutes(5);
        input.markets = vec![market("B110000", dec!(109750), dec!(110250), Some(90), close)];
        assert!(matches!(
            engine().evaluate(&input),
            Decision::NoTrade(SkipReason::TooCloseToSettlement { minutes: 5 })
        ));
    }

    #[test]
    fn reports_deepest_skip_when_nothing_qualifies() {
        let mut input = base_input();
        let close = input.now + chrono::Duration::minutes(60);
        input.markets = vec![
            // out of the price band entirely
            market("B1", dec!(109000), dec!(109500), Some(99), close),
            // priced fairly: survives to the edge check and fails there
            market("B2", dec!(111900), dec!(112100), Some(60), close),
        ];
        assert!(matches!(
            engine().evaluate(&input),
            Decision::NoTrade(SkipReason::InsufficientEdge { .. })
        ));
    }

    #[test]
    fn low_balance_short_circuits() {
        let mut input = base_input();
        input.balance = dec!(0.25);
        assert!(matches!(
            engine().evaluate(&input),
            Decision::NoTrade(SkipReason::BalanceTooLow { .. })
        ));
    }
}
