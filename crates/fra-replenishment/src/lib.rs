//! fra-replenishment: calibrates [`fra_schemas::ReplenishmentProfile`] from
//! raw turnover observations, spec §2/§3.
//!
//! "Turnover" here is the USD volume traded against the book per minute;
//! "recovery time" is how long, at the observed turnover rate, it takes the
//! book to replenish a given fraction of depth that a slice consumed.

use chrono::{DateTime, Timelike, Utc};
use fra_schemas::profile::ReplenishmentProfile;

/// One observed (book depth, trailing one-minute traded volume) pair for a
/// (symbol, venue).
#[derive(Debug, Clone, Copy)]
pub struct TurnoverSample {
    pub depth_usd: f64,
    pub traded_volume_per_min_usd: f64,
    pub timestamp: DateTime<Utc>,
}

/// Minutes to replenish `fraction` of `depth_usd` at `turnover_per_min`.
/// `None` turnover (zero or negative) means "never" — represented as
/// `f64::INFINITY`, consistent with the break-even-hours convention used
/// throughout this core (spec §4.8).
fn recovery_time_min(depth_usd: f64, fraction: f64, turnover_per_min: f64) -> f64 {
    if turnover_per_min <= 0.0 {
        return f64::INFINITY;
    }
    (depth_usd * fraction) / turnover_per_min
}

/// Calibrate a [`ReplenishmentProfile`] from a batch of samples. Empty
/// input yields an all-zero/neutral profile — the caller must treat a
/// zero `avg_turnover_per_min` as "no data", not as "an illiquid book".
pub fn calibrate(symbol: &str, venue: &str, samples: &[TurnoverSample]) -> ReplenishmentProfile {
    let turnovers: Vec<f64> = samples.iter().map(|s| s.traded_volume_per_min_usd).collect();
    let depths: Vec<f64> = samples.iter().map(|s| s.depth_usd).collect();

    let avg_turnover_per_min = mean(&turnovers);
    let avg_depth = mean(&depths);

    let recovery_time_min_10 = recovery_time_min(avg_depth, 0.10, avg_turnover_per_min);
    let recovery_time_min_25 = recovery_time_min(avg_depth, 0.25, avg_turnover_per_min);
    let recovery_time_min_50 = recovery_time_min(avg_depth, 0.50, avg_turnover_per_min);

    let mut turnover_buckets: [Vec<f64>; 24] = Default::default();
    for s in samples {
        turnover_buckets[s.timestamp.hour() as usize].push(s.traded_volume_per_min_usd);
    }
    let mut hourly_turnover_multipliers = [1.0f64; 24];
    for h in 0..24 {
        if !turnover_buckets[h].is_empty() && avg_turnover_per_min > 0.0 {
            hourly_turnover_multipliers[h] =
                (mean(&turnover_buckets[h]) / avg_turnover_per_min).max(1e-6);
        }
    }

    // TWAP slicing (spec §4.7 step 4) clamps interval to [5, 30] minutes
    // regardless; these recommendations are the *profile's* opinion before
    // that clamp is applied.
    let recommended_min_interval_min = if recovery_time_min_10.is_finite() {
        recovery_time_min_10.max(1.0)
    } else {
        5.0
    };
    let recommended_max_interval_min = if recovery_time_min_50.is_finite() {
        recovery_time_min_50.max(recommended_min_interval_min)
    } else {
        30.0
    };

    let confidence_score = (samples.len() as f64 / 500.0).min(1.0);

    ReplenishmentProfile {
        symbol: symbol.to_string(),
        venue: venue.to_string(),
        avg_turnover_per_min,
        recovery_time_min_10,
        recovery_time_min_25,
        recovery_time_min_50,
        hourly_turnover_multipliers,
        recommended_min_interval_min,
        recommended_max_interval_min,
        confidence_score,
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
