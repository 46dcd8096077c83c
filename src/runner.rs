//! One-shot invocation flow: fetch inputs, evaluate, submit, persist.
//!
//! Adapter failures never bubble out of here as errors; they become
//! `Decision::Failed` so every scheduled run ends with one structured,
//! loggable outcome.

use chrono::{DurationRound, Utc};
use tracing::{error, info, warn};

use crate::adapters::postgres::TradeLogEntry;
use crate::adapters::{Brokerage, Ledger, SpotPriceSource};
use crate::config::{ArbitrageParams, AssetParams, RangeParams};
use crate::strategy::arbitrage::{self, ArbOpportunity};
use crate::domain::{OrderReceipt, TradePlan};
use crate::error::{EdgebotError, Result};
use crate::strategy::decision::Decision;
use crate::strategy::exposure::HourExposure;
use crate::strategy::hourly::{HourlyEngine, HourlyInput};
use crate::strategy::range::{RangeEngine, RangeInput};

/// Run one hourly evaluation for an asset and act on the outcome.
pub async fn run_hourly(
    asset: &str,
    params: AssetParams,
    spot_source: &dyn SpotPriceSource,
    broker: &dyn Brokerage,
    ledger: &dyn Ledger,
) -> Decision {
    let shared_budget = params.combined_exposure_cap.is_some();
    let engine = HourlyEngine::new(asset, params.clone());

    let input = match fetch_hourly_input(asset, &params, spot_source, broker, ledger).await {
        Ok(input) => input,
        Err(e) => {
            error!(asset, error = %e, "hourly input fetch failed");
            return Decision::failed(e);
        }
    };

    let decision = engine.evaluate(&input);
    match &decision {
        Decision::Trade(plan) => {
            info!(
                asset,
                ticker = %plan.ticker,
                contracts = plan.contracts,
                limit_cents = plan.limit_cents,
                edge_pct = plan.edge_pct,
                "trade decision"
            );
            match submit_and_record(plan, broker, ledger, shared_budget).await {
                Ok(()) => decision,
                Err(e) => {
                    error!(asset, error = %e, "order path failed");
                    Decision::failed(e)
                }
            }
        }
        Decision::NoTrade(reason) => {
            info!(asset, %reason, "no trade");
            decision
        }
        Decision::Failed { .. } => decision,
    }
}

/// Run one range evaluation and act on the outcome.
pub async fn run_range(
    asset: &str,
    params: RangeParams,
    spot_source: &dyn SpotPriceSource,
    broker: &dyn Brokerage,
    ledger: &dyn Ledger,
) -> Decision {
    let engine = RangeEngine::new(asset, params.clone());

    let input = match fetch_range_input(asset, &params, spot_source, broker, ledger).await {
        Ok(input) => input,
        Err(e) => {
            error!(asset, error = %e, "range input fetch failed");
            return Decision::failed(e);
        }
    };

    let decision = engine.evaluate(&input);
    match &decision {
        Decision::Trade(plan) => {
            info!(
                asset,
                ticker = %plan.ticker,
                contracts = plan.contracts,
                edge_pct = plan.edge_pct,
                "range trade decision"
            );
            match submit_and_record(plan, broker, ledger, false).await {
                Ok(()) => decision,
                Err(e) => {
                    error!(asset, error = %e, "order path failed");
                    Decision::failed(e)
                }
            }
        }
        Decision::NoTrade(reason) => {
            info!(asset, %reason, "no range trade");
            decision
        }
        Decision::Failed { .. } => decision,
    }
}

/// Scan the soonest range event against the matching hourly strikes for
/// price-identity violations. Detection only; nothing is submitted.
pub async fn run_arb_scan(
    params: &ArbitrageParams,
    broker: &dyn Brokerage,
) -> Result<Vec<ArbOpportunity>> {
    let hourly = broker.hourly_markets(&params.hourly_series).await?;
    let ranges = broker.range_markets(&params.range_series).await?;

    let opportunities = arbitrage::find_opportunities(&hourly, &ranges, params.min_profit_cents);
    for opp in &opportunities {
        info!(
            range = %opp.range_ticker,
            direction = ?opp.direction,
            implied_cents = opp.implied_cents,
            profit_cents = opp.profit_cents,
            "price identity violation"
        );
    }
    Ok(opportunities)
}

async fn fetch_hourly_input(
    asset: &str,
    params: &AssetParams,
    spot_source: &dyn SpotPriceSource,
    broker: &dyn Brokerage,
    ledger: &dyn Ledger,
) -> Result<HourlyInput> {
    let balance = broker.balance().await?;
    let unsettled = broker.unsettled_value().await?;
    let spot = spot_source.spot_price(&params.spot_product).await?;
    let markets = broker.hourly_markets(&params.series_ticker).await?;

    let vol = ledger
        .latest_vol_snapshot(asset)
        .await?
        .ok_or_else(|| EdgebotError::VolatilityUnavailable(asset.to_string()))?;

    let exposure = if params.combined_exposure_cap.is_some() {
        let settlement_hour = markets
            .iter()
            .map(|m| m.close_time)
            .min()
            .unwrap_or_else(Utc::now)
            .duration_trunc(chrono::Duration::hours(1))
            .unwrap_or_else(|_| Utc::now());
        ledger.hour_exposure(settlement_hour).await?
    } else {
        HourExposure::default()
    };

    Ok(HourlyInput {
        now: Utc::now(),
        balance: balance + unsettled,
        spot,
        vol,
        markets,
        exposure,
    })
}

async fn fetch_range_input(
    asset: &str,
    params: &RangeParams,
    spot_source: &dyn SpotPriceSource,
    broker: &dyn Brokerage,
    ledger: &dyn Ledger,
) -> Result<RangeInput> {
    let balance = broker.balance().await?;
    let unsettled = broker.unsettled_value().await?;
    let spot = spot_source.spot_price(&params.spot_product).await?;
    let markets = broker.range_markets(&params.series_ticker).await?;

    let vol = ledger
        .latest_vol_snapshot(asset)
        .await?
        .ok_or_else(|| EdgebotError::VolatilityUnavailable(asset.to_string()))?;

    Ok(RangeInput {
        now: Utc::now(),
        balance: balance + unsettled,
        spot,
        vol,
        markets,
    })
}

/// Submit the plan, write back the exposure fraction after a live fill,
/// and append to the trade log. Trade-log failures are warned and
/// swallowed so a fill is never reported as a failure.
async fn submit_and_record(
    plan: &TradePlan,
    broker: &dyn Brokerage,
    ledger: &dyn Ledger,
    shared_budget: bool,
) -> Result<()> {
    let receipt = broker.submit_order(&plan.to_order()).await?;

    if shared_budget && !receipt.dry_run {
        let settlement_hour = plan
            .settlement_time
            .duration_trunc(chrono::Duration::hours(1))
            .unwrap_or(plan.settlement_time);
        ledger
            .commit_exposure(settlement_hour, &plan.asset, plan.kelly_fraction)
            .await?;
    }

    if let Err(e) = ledger.log_trade(&trade_log_entry(plan, &receipt)).await {
        warn!(error = %e, ticker = %plan.ticker, "trade log write failed");
    }
    Ok(())
}

fn trade_log_entry(plan: &TradePlan, receipt: &OrderReceipt) -> TradeLogEntry {
    TradeLogEntry {
        asset: plan.asset.clone(),
        ticker: plan.ticker.clone(),
        side: plan.side.as_str().to_string(),
        contracts: plan.contracts,
        limit_cents: plan.limit_cents,
        model_prob: plan.model_prob,
        market_prob: plan.market_prob,
        edge_pct: plan.edge_pct,
        kelly_fraction: plan.kelly_fraction,
        stake: plan.stake,
        bankroll: plan.bankroll,
        spot_price: plan.spot_price,
        scaled_vol_pct: plan.scaled_vol_pct,
        settlement_time: plan.settlement_time,
        order_id: Some(receipt.order_id.clone()),
        order_status: format!("{:?}", receipt.status).to_lowercase(),
        dry_run: receipt.dry_run,
    }
}
