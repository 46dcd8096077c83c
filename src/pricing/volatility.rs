//! Volatility selection and sqrt-of-time scaling.
//!
//! Window estimates are 1-minute-return standard deviations in percentage
//! points. Scaling projects a window estimate onto the horizon that matters,
//! `scaled = max(raw, floor) * sqrt(target / reference)`, the Brownian
//! square-root-of-time rule.

use crate::domain::VolEstimate;

/// Project a window estimate onto the target horizon, flooring the raw
/// reading first so a dead tape cannot produce a near-zero denominator.
pub fn scale_vol(raw_std_pct: f64, reference_minutes: f64, target_minutes: f64, floor_pct: f64) -> f64 {
    let raw = raw_std_pct.max(floor_pct);
    if reference_minutes <= 0.0 || target_minutes <= 0.0 {
        return raw;
    }
    raw * (target_minutes / reference_minutes).sqrt()
}

/// Minimum sample count for a window to be statistically usable.
pub fn min_samples(window_minutes: u32) -> u32 {
    (window_minutes / 2).max(3)
}

/// Pick the widest window that fits inside the time remaining to
/// settlement, so the sqrt-time scale factor stays close to 1. Falls back
/// to the narrowest window when nothing fits.
pub fn select_window(estimates: &[VolEstimate], minutes_to_settlement: i64) -> Option<VolEstimate> {
    if estimates.is_empty() {
        return None;
    }

    let mut sorted: Vec<VolEstimate> = estimates.to_vec();
    sorted.sort_by_key(|e| e.window_minutes);

    let fitting = sorted
        .iter()
        .rev()
        .find(|e| i64::from(e.window_minutes) <= minutes_to_settlement);

    Some(*fitting.unwrap_or(&sorted[0]))
}

/// True when the estimate carries enough samples for its window.
pub fn has_enough_samples(estimate: &VolEstimate) -> bool {
    estimate.samples >= min_samples(estimate.window_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn est(window: u32, std_pct: f64, samples: u32) -> VolEstimate {
        VolEstimate {
            window_minutes: window,
            std_pct,
            samples,
        }
    }

    #[test]
    fn scale_applies_sqrt_time() {
        // raw above floor: raw * sqrt(target/ref)
        let scaled = scale_vol(0.40, 15.0, 60.0, 0.15);
        assert!((scaled - 0.80).abs() < 1e-12);

        // raw below floor: floor * sqrt(target/ref)
        let scaled = scale_vol(0.05, 15.0, 60.0, 0.15);
        assert!((scaled - 0.30).abs() < 1e-12);
    }

    #[test]
    fn scale_is_identity_at_reference_horizon() {
        let scaled = scale_vol(0.40, 15.0, 15.0, 0.15);
        assert!((scaled - 0.40).abs() < 1e-12);
    }

    #[test]
    fn scale_handles_degenerate_horizons() {
        assert_eq!(scale_vol(0.40, 0.0, 15.0, 0.15), 0.40);
        assert_eq!(scale_vol(0.40, 15.0, 0.0, 0.15), 0.40);
    }

    #[test]
    fn min_samples_floor_is_three() {
        assert_eq!(min_samples(5), 3);
        assert_eq!(min_samples(7), 3);
        assert_eq!(min_samples(10), 5);
        assert_eq!(min_samples(15), 7);
    }

    #[test]
    fn selects_widest_fitting_window() {
        let windows = vec![
            est(5, 0.10, 5),
            est(7, 0.12, 7),
            est(10, 0.14, 10),
            est(12, 0.15, 12),
            est(15, 0.18, 15),
        ];

        assert_eq!(select_window(&windows, 13).unwrap().window_minutes, 12);
        assert_eq!(select_window(&windows, 60).unwrap().window_minutes, 15);
        // nothing fits: fall back to the narrowest
        assert_eq!(select_window(&windows, 2).unwrap().window_minutes, 5);
        assert!(select_window(&[], 10).is_none());
    }

    #[test]
    fn sample_gate() {
        assert!(has_enough_samples(&est(15, 0.2, 8)));
        assert!(!has_enough_samples(&est(15, 0.2, 2)));
    }
}
