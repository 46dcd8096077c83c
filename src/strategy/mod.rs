//! Decision engines: turn market snapshots and model probabilities into
//! sized trade plans or structured skip reasons.

pub mod arbitrage;
pub mod decision;
pub mod exposure;
pub mod hourly;
pub mod kelly;
pub mod range;

pub use arbitrage::{find_opportunities, ArbDirection, ArbOpportunity};
pub use decision::{Decision, SkipReason};
pub use exposure::{effective_cap, HourExposure};
pub use hourly::{HourlyEngine, HourlyInput};
pub use kelly::{size_bet, KellyStake};
pub use range::{RangeEngine, RangeInput};
