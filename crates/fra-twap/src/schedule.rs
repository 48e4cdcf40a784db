//! Pure slice-scheduling math, spec §4.7 steps 1-5.

use chrono::{Timelike, Utc};
use fra_schemas::profile::{LiquidityProfile, ReplenishmentProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlippageConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwapSchedule {
    pub slice_count: u32,
    pub slice_size_usd: f64,
    pub interval_minutes: u32,
    pub total_duration_minutes: u32,
    pub per_slice_slippage_bps: f64,
    pub total_slippage_bps: f64,
    pub confidence: SlippageConfidence,
}

/// Default `maxDurationMinutes` (spec §4.7).
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 240;
const MAX_TOTAL_MINUTES_CEILING: u32 = 8 * 60 - 30;

/// Builds a slicing schedule for notional `target_notional_usd`, spec §4.7
/// steps 1-5. `long_ask_depth_usd`/`short_bid_depth_usd` are the snapshot
/// depths on the taking side of each leg. Fails (per step 2) if the
/// resulting per-slice cap is too thin to slice safely.
pub fn build_schedule(
    target_notional_usd: f64,
    long_ask_depth_usd: f64,
    short_bid_depth_usd: f64,
    avg_spread_bps: f64,
    max_duration_minutes: u32,
) -> Result<TwapSchedule, String> {
    let effective_depth = long_ask_depth_usd.min(short_bid_depth_usd);

    let max_safe_per_slice = (effective_depth * 0.05).min(50_000.0);
    if max_safe_per_slice < 1_000.0 {
        return Err(format!("book too thin for TWAP slicing: maxSafePerSlice={max_safe_per_slice:.2}"));
    }

    let slice_count = ((target_notional_usd / max_safe_per_slice).ceil() as u32).clamp(2, 24);
    let slice_size_usd = target_notional_usd / slice_count as f64;

    let max_total_minutes = max_duration_minutes.min(MAX_TOTAL_MINUTES_CEILING);
    let ideal_interval = max_total_minutes / slice_count;
    let interval_minutes = ideal_interval.clamp(5, 30);
    let total_duration_minutes = (slice_count - 1) * interval_minutes;

    let usage_ratio = slice_size_usd / effective_depth;
    let per_slice_slippage_bps = avg_spread_bps / 2.0 + (slice_size_usd / effective_depth).sqrt() * 10.0;
    let total_slippage_bps = 2.0 * per_slice_slippage_bps;

    let confidence = if usage_ratio < 0.03 && slice_count <= 8 {
        SlippageConfidence::High
    } else if usage_ratio < 0.08 && slice_count <= 16 {
        SlippageConfidence::Medium
    } else {
        SlippageConfidence::Low
    };

    Ok(TwapSchedule {
        slice_count,
        slice_size_usd,
        interval_minutes,
        total_duration_minutes,
        per_slice_slippage_bps,
        total_slippage_bps,
        confidence,
    })
}

/// Same slicing math as [`build_schedule`], but derives the depth/spread
/// inputs from calibrated LiquidityProfiles (spec §3) at the current
/// hour-of-day instead of a single snapshot, and narrows the interval to
/// both legs' ReplenishmentProfile recommendation when one is available
/// for each — the calibration those profiles carry is exactly "how fast
/// does this book refill", which is what the interval choice is for.
pub fn build_schedule_from_profiles(
    target_notional_usd: f64,
    long_liquidity: &LiquidityProfile,
    short_liquidity: &LiquidityProfile,
    long_replenishment: Option<&ReplenishmentProfile>,
    short_replenishment: Option<&ReplenishmentProfile>,
    max_duration_minutes: u32,
) -> Result<TwapSchedule, String> {
    let hour = Utc::now().hour() as u8;
    let long_ask_depth_usd = long_liquidity.ask_depth_at(hour);
    let short_bid_depth_usd = short_liquidity.bid_depth_at(hour);
    let avg_spread_bps = (long_liquidity.spread_bps_at(hour) + short_liquidity.spread_bps_at(hour)) / 2.0;

    let mut schedule = build_schedule(target_notional_usd, long_ask_depth_usd, short_bid_depth_usd, avg_spread_bps, max_duration_minutes)?;

    if let (Some(long_r), Some(short_r)) = (long_replenishment, short_replenishment) {
        let min_interval = long_r.recommended_min_interval_min.max(short_r.recommended_min_interval_min);
        let max_interval = long_r.recommended_max_interval_min.min(short_r.recommended_max_interval_min);
        if min_interval > 0.0 && min_interval <= max_interval {
            let clamped = (schedule.interval_minutes as f64).clamp(min_interval, max_interval).round() as u32;
            schedule.interval_minutes = clamped;
            schedule.total_duration_minutes = (schedule.slice_count - 1) * clamped;
        }
    }

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thin_book_fails_to_schedule() {
        let err = build_schedule(100_000.0, 10_000.0, 10_000.0, 5.0, 240).unwrap_err();
        assert!(err.contains("too thin"));
    }

    #[test]
    fn slice_count_is_clamped_to_at_least_two() {
        let schedule = build_schedule(10_000.0, 10_000_000.0, 10_000_000.0, 5.0, 240).unwrap();
        assert_eq!(schedule.slice_count, 2);
    }

    #[test]
    fn slice_count_is_clamped_to_at_most_24() {
        let schedule = build_schedule(100_000_000.0, 10_000_000.0, 10_000_000.0, 5.0, 240).unwrap();
        assert_eq!(schedule.slice_count, 24);
    }

    #[test]
    fn interval_is_clamped_between_5_and_30() {
        let schedule = build_schedule(10_000.0, 10_000_000.0, 10_000_000.0, 5.0, 9999).unwrap();
        assert_eq!(schedule.interval_minutes, 30);
    }

    #[test]
    fn max_duration_respects_the_8_hour_epoch_ceiling() {
        let schedule = build_schedule(5_000_000.0, 10_000_000.0, 10_000_000.0, 5.0, 9999).unwrap();
        assert!(schedule.total_duration_minutes <= MAX_TOTAL_MINUTES_CEILING);
    }

    #[test]
    fn small_slice_against_deep_book_is_high_confidence() {
        let schedule = build_schedule(100_000.0, 50_000_000.0, 50_000_000.0, 2.0, 240).unwrap();
        assert_eq!(schedule.confidence, SlippageConfidence::High);
    }

    #[test]
    fn large_usage_ratio_is_low_confidence() {
        let schedule = build_schedule(20_000_000.0, 10_000_000.0, 10_000_000.0, 2.0, 240).unwrap();
        assert_eq!(schedule.confidence, SlippageConfidence::Low);
    }

    fn replenishment(min_interval: f64, max_interval: f64) -> ReplenishmentProfile {
        ReplenishmentProfile {
            symbol: "BTC".into(),
            venue: "A".into(),
            avg_turnover_per_min: 1_000_000.0,
            recovery_time_min_10: 1.0,
            recovery_time_min_25: 2.0,
            recovery_time_min_50: 4.0,
            hourly_turnover_multipliers: [1.0; 24],
            recommended_min_interval_min: min_interval,
            recommended_max_interval_min: max_interval,
            confidence_score: 0.8,
        }
    }

    #[test]
    fn from_profiles_matches_raw_build_schedule_when_multipliers_are_flat() {
        let long = LiquidityProfile::flat("BTC", "A", 10_000_000.0, 5.0);
        let short = LiquidityProfile::flat("BTC", "B", 10_000_000.0, 5.0);
        let via_profiles = build_schedule_from_profiles(100_000.0, &long, &short, None, None, 240).unwrap();
        let direct = build_schedule(100_000.0, 10_000_000.0, 10_000_000.0, 5.0, 240).unwrap();
        assert_eq!(via_profiles.slice_count, direct.slice_count);
        assert_eq!(via_profiles.interval_minutes, direct.interval_minutes);
        assert!((via_profiles.total_slippage_bps - direct.total_slippage_bps).abs() < 1e-9);
    }

    #[test]
    fn replenishment_profile_narrows_the_interval_to_its_recommended_window() {
        let long = LiquidityProfile::flat("BTC", "A", 10_000_000.0, 5.0);
        let short = LiquidityProfile::flat("BTC", "B", 10_000_000.0, 5.0);
        let natural = build_schedule_from_profiles(10_000.0, &long, &short, None, None, 9999).unwrap();
        assert_eq!(natural.interval_minutes, 30);

        let long_r = replenishment(12.0, 18.0);
        let short_r = replenishment(10.0, 20.0);
        let narrowed = build_schedule_from_profiles(10_000.0, &long, &short, Some(&long_r), Some(&short_r), 9999).unwrap();
        assert_eq!(narrowed.interval_minutes, 18);
        assert_eq!(narrowed.total_duration_minutes, (narrowed.slice_count - 1) * 18);
    }
}
