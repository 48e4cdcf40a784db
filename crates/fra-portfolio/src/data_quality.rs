//! Data-quality risk factor, spec §4.2.2.
//!
//! A venue's funding cadence determines how many historical samples a
//! "full" history actually is: an 8-hourly venue accumulates a week of
//! history in 21 points, not 168.

fn target_sample_points(funding_interval_hours: u8) -> f64 {
    if funding_interval_hours >= 8 {
        21.0
    } else {
        168.0
    }
}

fn lerp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// `minQuality = min(longPoints/target, shortPoints/target, 1)`, mapped
/// through a piecewise-linear curve to a risk factor in `[0.3, 1.0]`,
/// defensively clamped to `[0.1, 1.0]` on the way out.
pub fn risk_factor(
    long_sample_points: usize,
    short_sample_points: usize,
    long_funding_interval_hours: u8,
    short_funding_interval_hours: u8,
) -> f64 {
    let long_ratio = long_sample_points as f64 / target_sample_points(long_funding_interval_hours);
    let short_ratio = short_sample_points as f64 / target_sample_points(short_funding_interval_hours);
    let min_quality = long_ratio.min(short_ratio).min(1.0);

    let raw = if min_quality < 0.1 {
        0.3
    } else if min_quality < 0.5 {
        lerp(min_quality, 0.1, 0.5, 0.3, 0.7)
    } else {
        lerp(min_quality, 0.5, 1.0, 0.7, 1.0)
    };
    raw.clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_history_both_venues_hourly_yields_full_confidence() {
        assert!((risk_factor(168, 168, 1, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn eight_hourly_venue_uses_smaller_target() {
        // 21 points on an 8-hourly venue is a full week, same as 168 hourly.
        assert!((risk_factor(168, 21, 1, 8) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sparse_history_floors_at_low_confidence() {
        assert_eq!(risk_factor(5, 168, 1, 1), 0.3);
    }

    #[test]
    fn mid_range_history_interpolates() {
        let r = risk_factor(50, 168, 1, 1); // ratio 50/168 ≈ 0.298
        assert!(r > 0.3 && r < 0.7);
    }

    #[test]
    fn zero_history_is_not_below_floor() {
        assert_eq!(risk_factor(0, 0, 1, 1), 0.3);
    }
}
