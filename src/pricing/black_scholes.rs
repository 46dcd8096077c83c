//! Closed-form Black-Scholes call pricing, used to mark protective call
//! hedges in the backtest.

use super::normal::normal_cdf;

/// European call price. Expired or degenerate time collapses to intrinsic
/// value; non-positive sigma is floored at 0.01 so the formula stays
/// defined on bad volatility inputs.
pub fn call_price(spot: f64, strike: f64, t_years: f64, rate: f64, sigma: f64) -> f64 {
    if t_years <= 0.0 {
        return (spot - strike).max(0.0);
    }
    let sigma = if sigma <= 0.0 { 0.01 } else { sigma };

    let sqrt_t = t_years.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t_years) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;

    spot * normal_cdf(d1) - strike * (-rate * t_years).exp() * normal_cdf(d2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_collapses_to_intrinsic() {
        assert_eq!(call_price(120.0, 100.0, 0.0, 0.05, 0.3), 20.0);
        assert_eq!(call_price(80.0, 100.0, 0.0, 0.05, 0.3), 0.0);
        assert_eq!(call_price(80.0, 100.0, -0.5, 0.05, 0.3), 0.0);
    }

    #[test]
    fn zero_sigma_is_floored_not_nan() {
        let price = call_price(100.0, 100.0, 1.0, 0.05, 0.0);
        assert!(price.is_finite());
        assert!(price > 0.0);
    }

    #[test]
    fn bounded_by_spot() {
        for strike in [50.0, 100.0, 200.0, 400.0] {
            let price = call_price(100.0, strike, 1.0, 0.05, 0.8);
            assert!(price >= 0.0);
            assert!(price <= 100.0, "call above spot at strike {strike}");
        }
    }

    #[test]
    fn deep_otm_call_is_small_but_positive() {
        // spot 100, strike 200, vol 0.8, T 1y, r 5%
        let price = call_price(100.0, 200.0, 1.0, 0.05, 0.8);
        assert!(price > 0.0);
        assert!(price < 15.0);
    }

    #[test]
    fn increases_with_volatility() {
        let low = call_price(100.0, 110.0, 0.5, 0.05, 0.2);
        let high = call_price(100.0, 110.0, 0.5, 0.05, 0.6);
        assert!(high > low);
    }
}
