//! fra-liquidity: calibrates [`fra_schemas::LiquidityProfile`] from raw
//! order-book snapshots, spec §2/§3.
//!
//! Percentiles and hour-of-day multipliers are computed here; the profile
//! itself (and its accessors) live in `fra-schemas` since `fra-execution-plan`
//! and `fra-twap` only need to *read* a profile, not calibrate one.

use chrono::{DateTime, Timelike, Utc};
use fra_schemas::profile::LiquidityProfile;

/// One observed order-book snapshot for a (symbol, venue).
#[derive(Debug, Clone, Copy)]
pub struct DepthSnapshot {
    pub bid_depth_usd: f64,
    pub ask_depth_usd: f64,
    pub spread_bps: f64,
    pub timestamp: DateTime<Utc>,
}

/// 25th-percentile of a slice of values, via nearest-rank on the sorted
/// copy. Spec §3: "25th-percentile of historical snapshots".
pub fn percentile_25(values: &[f64]) -> f64 {
    percentile(values, 0.25)
}

pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = (p.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Calibrate a [`LiquidityProfile`] from a batch of snapshots. An empty
/// `snapshots` slice yields a profile with zero depth and neutral (`1.0`)
/// multipliers — callers must treat a zero-depth profile as "no data",
/// not as "a thin market", before using it for sizing.
pub fn calibrate(symbol: &str, venue: &str, snapshots: &[DepthSnapshot]) -> LiquidityProfile {
    let bid_depths: Vec<f64> = snapshots.iter().map(|s| s.bid_depth_usd).collect();
    let ask_depths: Vec<f64> = snapshots.iter().map(|s| s.ask_depth_usd).collect();
    let spreads: Vec<f64> = snapshots.iter().map(|s| s.spread_bps).collect();

    let effective_bid_depth = percentile_25(&bid_depths);
    let effective_ask_depth = percentile_25(&ask_depths);
    let avg_spread_bps = mean(&spreads);

    let overall_depth_avg = mean(&bid_depths.iter().chain(ask_depths.iter()).copied().collect::<Vec<_>>());
    let overall_spread_avg = avg_spread_bps;

    let mut depth_buckets: [Vec<f64>; 24] = Default::default();
    let mut spread_buckets: [Vec<f64>; 24] = Default::default();
    for s in snapshots {
        let h = s.timestamp.hour() as usize;
        depth_buckets[h].push((s.bid_depth_usd + s.ask_depth_usd) / 2.0);
        spread_buckets[h].push(s.spread_bps);
    }

    let mut hourly_depth_multipliers = [1.0f64; 24];
    let mut hourly_spread_multipliers = [1.0f64; 24];
    for h in 0..24 {
        if !depth_buckets[h].is_empty() && overall_depth_avg > 0.0 {
            hourly_depth_multipliers[h] = (mean(&depth_buckets[h]) / overall_depth_avg).max(1e-6);
        }
        if !spread_buckets[h].is_empty() && overall_spread_avg > 0.0 {
            hourly_spread_multipliers[h] = (mean(&spread_buckets[h]) / overall_spread_avg).max(1e-6);
        }
    }

    // Confidence climbs toward 1.0 as samples accumulate; 500 snapshots
    // (roughly 3 weeks of hourly sampling per hour-of-day bucket) is
    // treated as "fully confident".
    let confidence_score = (snapshots.len() as f64 / 500.0).min(1.0);

    LiquidityProfile {
        symbol: symbol.to_string(),
        venue: venue.to_string(),
        effective_bid_depth,
        effective_ask_depth,
        avg_spread_bps,
        hourly_depth_multipliers,
        hourly_spread_multipliers,
        confidence_score,
        sample_count: snapshots.len() as u64,
        calibration_time: Utc::now(),
    }
}

fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(bid: f64, ask: f64, spread: f64, hour: u32) -> DepthSnapshot {
        DepthSnapshot {
            bid_depth_usd: bid,
            ask_depth_usd: ask,
            spread_bps: spread,
            timestamp: DateTime::from_timestamp(hour as i64 * 3600, 0).unwrap(),
        }
    }

    #[test]
    fn percentile_25_of_uniform_samples() {
        let v = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile_25(&v), 20.0);
    }

    #[test]
    fn empty_snapshots_yield_neutral_profile() {
        let p = calibrate("BTC", "A", &[]);
        assert_eq!(p.effective_bid_depth, 0.0);
        assert_eq!(p.depth_multiplier(5), 1.0);
        assert_eq!(p.sample_count, 0);
    }

    #[test]
    fn calibrate_tracks_sample_count_and_confidence() {
        let snaps: Vec<DepthSnapshot> = (0..250).map(|i| snap(1000.0, 1000.0, 5.0, i % 24)).collect();
        let p = calibrate("BTC", "A", &snaps);
        assert_eq!(p.sample_count, 250);
        assert!((p.confidence_score - 0.5).abs() < 1e-9);
        assert_eq!(p.effective_bid_depth, 1000.0);
    }

    #[test]
    fn hourly_multiplier_reflects_relative_depth() {
        let mut snaps = vec![snap(2000.0, 2000.0, 5.0, 3); 10];
        snaps.extend(vec![snap(1000.0, 1000.0, 5.0, 10); 10]);
        let p = calibrate("BTC", "A", &snaps);
        assert!(p.depth_multiplier(3) > p.depth_multiplier(10));
    }
}
