//! Historical bar loading and rolling volatility for the backtest.

use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{EdgebotError, Result};

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

/// Load daily bars from CSV. Expected format: date,close with a header
/// row; extra columns are ignored. Dates must be ascending.
pub fn load_bars_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<PriceBar>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut bars: Vec<PriceBar> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        if i == 0 {
            continue; // Skip header
        }

        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 2 {
            warn!("Skipping malformed line {}: insufficient columns", i);
            continue;
        }

        let date = NaiveDate::parse_from_str(parts[0].trim(), "%Y-%m-%d").map_err(|e| {
            EdgebotError::BadHistoricalData(format!("invalid date at line {i}: {e}"))
        })?;
        let close: f64 = parts[1].trim().parse().map_err(|e| {
            EdgebotError::BadHistoricalData(format!("invalid close at line {i}: {e}"))
        })?;
        if close <= 0.0 {
            return Err(EdgebotError::BadHistoricalData(format!(
                "non-positive close {close} at line {i}"
            )));
        }
        if let Some(last) = bars.last() {
            if date <= last.date {
                return Err(EdgebotError::BadHistoricalData(format!(
                    "dates not ascending at line {i}"
                )));
            }
        }

        bars.push(PriceBar { date, close });
    }

    if bars.is_empty() {
        return Err(EdgebotError::BadHistoricalData(
            "no usable rows in input".to_string(),
        ));
    }

    info!("Loaded {} daily bars", bars.len());
    Ok(bars)
}

/// Annualized rolling volatility from daily log returns: window standard
/// deviation scaled by sqrt(252). Days without a full window take the mean
/// of the computed values, and everything is floored.
pub fn rolling_volatility(closes: &[f64], window: usize, floor: f64) -> Vec<f64> {
    let n = closes.len();
    let mut returns = vec![f64::NAN; n];
    for i in 1..n {
        returns[i] = (closes[i] / closes[i - 1]).ln();
    }

    let mut vols = vec![f64::NAN; n];
    for i in 0..n {
        if i < window {
            continue;
        }
        let slice = &returns[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        // sample std, matching a rolling-window std with ddof = 1
        let var = slice.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        vols[i] = var.sqrt() * (252.0f64).sqrt();
    }

    let computed: Vec<f64> = vols.iter().copied().filter(|v| v.is_finite()).collect();
    let fill = if computed.is_empty() {
        floor
    } else {
        computed.iter().sum::<f64>() / computed.len() as f64
    };

    vols.into_iter()
        .map(|v| if v.is_finite() { v } else { fill }.max(floor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_validates_csv() {
        let dir = std::env::temp_dir();
        let path = dir.join("edgebot_bars_test.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "date,close").unwrap();
        writeln!(f, "2024-01-02,50.0").unwrap();
        writeln!(f, "2024-01-03,49.5").unwrap();
        writeln!(f, "2024-01-04,51.2").unwrap();

        let bars = load_bars_from_csv(&path).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2].close, 51.2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_unsorted_dates() {
        let dir = std::env::temp_dir();
        let path = dir.join("edgebot_bars_unsorted.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "date,close").unwrap();
        writeln!(f, "2024-01-03,50.0").unwrap();
        writeln!(f, "2024-01-02,49.5").unwrap();

        assert!(load_bars_from_csv(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn constant_series_floors_volatility() {
        let closes = vec![100.0; 60];
        let vols = rolling_volatility(&closes, 30, 0.50);
        assert!(vols.iter().all(|v| (*v - 0.50).abs() < 1e-12));
    }

    #[test]
    fn warmup_days_take_the_series_mean() {
        let mut closes = Vec::new();
        for i in 0..80 {
            // alternate moves so the std is well above the floor
            closes.push(100.0 * (1.0 + 0.05 * ((i % 2) as f64 * 2.0 - 1.0)));
        }
        let vols = rolling_volatility(&closes, 30, 0.50);
        let computed = vols[35];
        // warmup values equal the mean of computed values
        assert!((vols[0] - vols[5]).abs() < 1e-12);
        assert!(vols[0] >= 0.50);
        assert!(computed >= 0.50);
    }
}
