//! Win-probability models for strike and range contracts.
//!
//! Moves are measured as percentage distance from spot and compared against
//! scaled volatility in the same units, so the z-scores feed straight into
//! the normal CDF.

use super::normal::normal_cdf;

/// P(spot settles below `strike`), given volatility already scaled to the
/// settlement horizon. Degenerate volatility collapses to a step function
/// around the strike.
pub fn prob_below(spot: f64, strike: f64, scaled_vol_pct: f64) -> f64 {
    if spot <= 0.0 {
        return 0.5;
    }
    let distance_pct = (strike - spot) / spot * 100.0;
    if scaled_vol_pct <= 0.0 {
        return if distance_pct > 0.0 { 1.0 } else { 0.0 };
    }
    normal_cdf(distance_pct / scaled_vol_pct)
}

/// P(spot settles inside [floor, cap]).
pub fn prob_in_range(spot: f64, floor: f64, cap: f64, scaled_vol_pct: f64) -> f64 {
    (prob_below(spot, cap, scaled_vol_pct) - prob_below(spot, floor, scaled_vol_pct)).max(0.0)
}

/// NO-side win probability for a range contract, capped so the model never
/// claims near-certainty.
pub fn prob_outside_range(spot: f64, floor: f64, cap: f64, scaled_vol_pct: f64, max_prob: f64) -> f64 {
    (1.0 - prob_in_range(spot, floor, cap, scaled_vol_pct)).min(max_prob)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strike_far_above_spot_is_near_certain() {
        let p = prob_below(100_000.0, 110_000.0, 0.5);
        assert!(p > 0.999);
    }

    #[test]
    fn strike_at_spot_is_a_coin_flip() {
        let p = prob_below(100_000.0, 100_000.0, 0.5);
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_vol_collapses_to_step() {
        assert_eq!(prob_below(100.0, 101.0, 0.0), 1.0);
        assert_eq!(prob_below(100.0, 99.0, 0.0), 0.0);
    }

    #[test]
    fn range_complementarity() {
        // fair_yes + fair_no = 1 before capping
        let spot = 111_500.0;
        let floor = 111_000.0;
        let cap = 112_000.0;
        let vol = 0.4;

        let fair_yes = prob_in_range(spot, floor, cap, vol);
        let fair_no = 1.0 - fair_yes;
        assert!((fair_yes + fair_no - 1.0).abs() < 1e-12);
        assert!(fair_yes > 0.0 && fair_yes < 1.0);
    }

    #[test]
    fn no_probability_is_capped() {
        // spot far outside the band, raw NO prob ~1
        let p = prob_outside_range(120_000.0, 111_000.0, 112_000.0, 0.2, 0.99);
        assert_eq!(p, 0.99);
    }

    #[test]
    fn wider_band_means_higher_in_range_prob() {
        let narrow = prob_in_range(100.0, 99.5, 100.5, 1.0);
        let wide = prob_in_range(100.0, 98.0, 102.0, 1.0);
        assert!(wide > narrow);
    }
}
