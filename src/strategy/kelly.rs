//! Kelly sizing for binary contracts priced in integer cents.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// A fully sized bet. `fraction` is the clamped Kelly fraction; money
/// fields are Decimal dollars.
#[derive(Debug, Clone, PartialEq)]
pub struct KellyStake {
    pub fraction: f64,
    pub stake: Decimal,
    pub contracts: u32,
    /// Dollars at risk if the contract loses
    pub risk: Decimal,
    /// Dollars earned if the contract wins
    pub profit_if_win: Decimal,
}

/// Size a bet on a contract priced at `price_cents`, winning with
/// probability `win_prob`. Returns None when the price is outside (0, 100)
/// cents or the stake rounds below one contract; neither is an error.
pub fn size_bet(
    win_prob: f64,
    price_cents: u32,
    bankroll: Decimal,
    max_fraction: f64,
    max_contracts: u32,
) -> Option<KellyStake> {
    if price_cents == 0 || price_cents >= 100 {
        return None;
    }
    if bankroll <= Decimal::ZERO {
        return None;
    }
    let p = win_prob.clamp(0.0, 1.0);
    let c = price_cents as f64;

    // Net odds per dollar staked: win (100-c) on c at risk.
    let b = (100.0 - c) / c;
    let raw = (b * p - (1.0 - p)) / b;
    let fraction = raw.clamp(0.0, max_fraction.max(0.0));
    if fraction <= 0.0 {
        return None;
    }

    let fraction_dec = Decimal::from_f64(fraction)?;
    let target_stake = bankroll * fraction_dec;
    let cost_per_contract = Decimal::from(price_cents) / Decimal::from(100);

    let contracts = (target_stake / cost_per_contract)
        .floor()
        .to_u32()?
        .min(max_contracts);
    if contracts == 0 {
        return None;
    }

    let stake = cost_per_contract * Decimal::from(contracts);
    let profit_if_win =
        Decimal::from(contracts) * Decimal::from(100 - price_cents) / Decimal::from(100);

    Some(KellyStake {
        fraction,
        stake,
        contracts,
        risk: stake,
        profit_if_win,
    })
}

/// Profit-if-win as a percentage of cost for a contract at `price_cents`.
pub fn profit_pct(price_cents: u32) -> f64 {
    if price_cents == 0 {
        return 0.0;
    }
    (100.0 - price_cents as f64) / price_cents as f64 * 100.0
}
