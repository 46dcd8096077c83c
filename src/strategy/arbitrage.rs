//! Range-versus-hourly price identity scan.
//!
//! A range contract and the hourly strike pair bracketing it price the
//! same event: P(in [floor, cap]) = P(>= floor) - P(>= cap). When the
//! quoted range leg strays from the hourly-implied value by more than the
//! spreads, the gap is riskless profit for whoever trades the range
//! against the hourly pair. This module only detects and reports; it
//! never submits orders.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::{RangeMarket, StrikeMarket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbDirection {
    /// Range YES cheap: buy range YES, sell floor YES, buy cap YES
    BuyRange,
    /// Range YES rich: sell range YES, buy floor YES, sell cap YES
    SellRange,
}

/// One detected identity violation, profits in cents per contract set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbOpportunity {
    pub direction: ArbDirection,
    pub range_ticker: String,
    pub floor_ticker: String,
    pub cap_ticker: String,
    pub floor_strike: Decimal,
    pub cap_strike: Decimal,
    /// The range quote the trade crosses (ask for BuyRange, bid for SellRange)
    pub range_cents: u32,
    /// Value of the range implied by the hourly spread, after spreads
    pub implied_cents: i64,
    pub profit_cents: i64,
}

/// Hourly strikes settle on X.99 boundaries while range floors are round
/// numbers, so matching tolerates a sub-dollar offset on either form.
fn matching_hourly(hourly: &[StrikeMarket], target: Decimal) -> Option<&StrikeMarket> {
    let shifted = target - dec!(0.01);
    hourly.iter().find(|m| {
        (m.strike - target).abs() < Decimal::ONE || (m.strike - shifted).abs() < Decimal::ONE
    })
}

/// Compare every range market against its hourly strike pair and collect
/// the violations worth at least `min_profit_cents`, best first. Missing
/// quotes read as zero and drop out through the positivity checks, the
/// same way an empty book kills the trade.
pub fn find_opportunities(
    hourly: &[StrikeMarket],
    ranges: &[RangeMarket],
    min_profit_cents: i64,
) -> Vec<ArbOpportunity> {
    let mut found = Vec::new();

    for range in ranges {
        let Some(floor) = matching_hourly(hourly, range.floor_strike) else {
            continue;
        };
        let Some(cap) = matching_hourly(hourly, range.cap_strike) else {
            continue;
        };

        let floor_yes_bid = floor.yes_bid.unwrap_or(0) as i64;
        let floor_yes_ask = floor.yes_ask.unwrap_or(0) as i64;
        let cap_yes_bid = cap.yes_bid.unwrap_or(0) as i64;
        let cap_yes_ask = cap.yes_ask.unwrap_or(0) as i64;

        // buying the hourly spread costs the floor ask less the cap bid;
        // selling it earns the floor bid less the cap ask
        let implied_buy_cost = floor_yes_ask - cap_yes_bid;
        let implied_sell_revenue = floor_yes_bid - cap_yes_ask;

        let range_yes_ask = range.yes_ask.unwrap_or(0) as i64;
        let range_yes_bid = range.yes_bid.unwrap_or(0) as i64;

        // range YES cheap against the spread
        if range_yes_ask > 0 && implied_sell_revenue > 0 {
            let profit = implied_sell_revenue - range_yes_ask;
            if profit >= min_profit_cents {
                found.push(ArbOpportunity {
                    direction: ArbDirection::BuyRange,
                    range_ticker: range.ticker.clone(),
                    floor_ticker: floor.ticker.clone(),
                    cap_ticker: cap.ticker.clone(),
                    floor_strike: range.floor_strike,
                    cap_strike: range.cap_strike,
                    range_cents: range_yes_ask as u32,
                    implied_cents: implied_sell_revenue,
                    profit_cents: profit,
                });
            }
        }

        // range YES rich against the spread
        if range_yes_bid > 0 && implied_buy_cost > 0 {
            let profit = range_yes_bid - implied_buy_cost;
            if profit >= min_profit_cents {
                found.push(ArbOpportunity {
                    direction: ArbDirection::SellRange,
                    range_ticker: range.ticker.clone(),
                    floor_ticker: floor.ticker.clone(),
                    cap_ticker: cap.ticker.clone(),
                    floor_strike: range.floor_strike,
                    cap_strike: range.cap_strike,
                    range_cents: range_yes_bid as u32,
                    implied_cents: implied_buy_cost,
                    profit_cents: profit,
                });
            }
        }
    }

    found.sort_by(|a, b| b.profit_cents.cmp(&a.profit_cents));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn hourly(strike: Decimal, yes_bid: u32, yes_ask: u32) -> StrikeMarket {
        StrikeMarket {
            ticker: format!("KXBTCD-T{strike}"),
            strike,
            yes_bid: Some(yes_bid),
            yes_ask: Some(yes_ask),
            no_bid: Some(100 - yes_ask),
            no_ask: Some(100 - yes_bid),
            close_time: Utc.with_ymd_and_hms(2025, 8, 29, 21, 0, 0).unwrap(),
        }
    }

    fn range(floor: Decimal, cap: Decimal, yes_bid: u32, yes_ask: u32) -> RangeMarket {
        RangeMarket {
            ticker: format!("KXBTC-B{floor}"),
            floor_strike: floor,
            cap_strike: cap,
            yes_bid: Some(yes_bid),
            yes_ask: Some(yes_ask),
            no_bid: Some(100 - yes_ask),
            no_ask: Some(100 - yes_bid),
            close_time: Utc.with_ymd_and_hms(2025, 8, 29, 21, 0, 0).unwrap(),
        }
    }

    #[test]
    fn cheap_range_yes_is_a_buy() {
        // hourly spread sells for 60 - 30 = 30c; range YES asked at 25c
        let hourly = vec![
            hourly(dec!(110999.99), 60, 64),
            hourly(dec!(111249.99), 26, 30),
        ];
        let ranges = vec![range(dec!(111000), dec!(111249.99), 22, 25)];

        let opps = find_opportunities(&hourly, &ranges, 2);
        assert_eq!(opps.len(), 1);
        let opp = &opps[0];
        assert_eq!(opp.direction, ArbDirection::BuyRange);
        assert_eq!(opp.implied_cents, 30);
        assert_eq!(opp.range_cents, 25);
        assert_eq!(opp.profit_cents, 5);
    }

    #[test]
    fn rich_range_yes_is_a_sell() {
        // hourly spread costs 64 - 26 = 38c; range YES bid at 45c
        let hourly = vec![
            hourly(dec!(110999.99), 60, 64),
            hourly(dec!(111249.99), 26, 30),
        ];
        let ranges = vec![range(dec!(111000), dec!(111249.99), 45, 48)];

        let opps = find_opportunities(&hourly, &ranges, 2);
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].direction, ArbDirection::SellRange);
        assert_eq!(opps[0].implied_cents, 38);
        assert_eq!(opps[0].profit_cents, 7);
    }

    #[test]
    fn fair_pricing_finds_nothing() {
        // spread: buy costs 38, sell earns 30; range quoted 32/36 inside it
        let hourly = vec![
            hourly(dec!(110999.99), 60, 64),
            hourly(dec!(111249.99), 26, 30),
        ];
        let ranges = vec![range(dec!(111000), dec!(111249.99), 32, 36)];

        assert!(find_opportunities(&hourly, &ranges, 2).is_empty());
    }

    #[test]
    fn profit_below_the_floor_is_ignored() {
        // same setup as the buy case but only 1c of profit
        let hourly = vec![
            hourly(dec!(110999.99), 60, 64),
            hourly(dec!(111249.99), 26, 30),
        ];
        let ranges = vec![range(dec!(111000), dec!(111249.99), 26, 29)];

        assert!(find_opportunities(&hourly, &ranges, 2).is_empty());
        assert_eq!(find_opportunities(&hourly, &ranges, 1).len(), 1);
    }

    #[test]
    fn unmatched_strikes_are_skipped() {
        let hourly = vec![hourly(dec!(110999.99), 60, 64)];
        // no hourly contract near the cap
        let ranges = vec![range(dec!(111000), dec!(113000), 10, 12)];

        assert!(find_opportunities(&hourly, &ranges, 2).is_empty());
    }

    #[test]
    fn round_floor_matches_point_nine_nine_strike() {
        let target = dec!(111000);
        let book = vec![hourly(dec!(110999.99), 50, 52)];
        assert!(matching_hourly(&book, target).is_some());
        assert!(matching_hourly(&book, dec!(112000)).is_none());
    }

    #[test]
    fn best_opportunity_sorts_first() {
        let hourly = vec![
            hourly(dec!(110999.99), 60, 64),
            hourly(dec!(111249.99), 26, 30),
            hourly(dec!(111499.99), 10, 14),
        ];
        let ranges = vec![
            // sell revenue 30, ask 25 -> 5c
            range(dec!(111000), dec!(111249.99), 22, 25),
            // sell revenue 26 - 14 = 12, ask 4 -> 8c
            range(dec!(111250), dec!(111499.99), 2, 4),
        ];

        let opps = find_opportunities(&hourly, &ranges, 2);
        assert_eq!(opps.len(), 2);
        assert_eq!(opps[0].profit_cents, 8);
        assert_eq!(opps[1].profit_cents, 5);
    }
}
