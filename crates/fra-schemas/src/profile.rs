use chrono::{DateTime, Utc};

/// Spec §3 LiquidityProfile, per (symbol, venue).
///
/// Invariant: all multipliers finite and positive; a bucket with no samples
/// defaults to `1.0` (see [`LiquidityProfile::depth_multiplier`] /
/// [`LiquidityProfile::spread_multiplier`]).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiquidityProfile {
    pub symbol: String,
    pub venue: String,
    /// 25th-percentile of historical bid-depth snapshots.
    pub effective_bid_depth: f64,
    /// 25th-percentile of historical ask-depth snapshots.
    pub effective_ask_depth: f64,
    pub avg_spread_bps: f64,
    /// One multiplier per hour-of-day bucket, `0..24`.
    pub hourly_depth_multipliers: [f64; 24],
    pub hourly_spread_multipliers: [f64; 24],
    pub confidence_score: f64,
    pub sample_count: u64,
    pub calibration_time: DateTime<Utc>,
}

impl LiquidityProfile {
    pub fn flat(symbol: impl Into<String>, venue: impl Into<String>, depth: f64, spread_bps: f64) -> Self {
        Self {
            symbol: symbol.into(),
            venue: venue.into(),
            effective_bid_depth: depth,
            effective_ask_depth: depth,
            avg_spread_bps: spread_bps,
            hourly_depth_multipliers: [1.0; 24],
            hourly_spread_multipliers: [1.0; 24],
            confidence_score: 0.5,
            sample_count: 0,
            calibration_time: Utc::now(),
        }
    }

    fn hourly(multipliers: &[f64; 24], hour_of_day: u8) -> f64 {
        let idx = (hour_of_day % 24) as usize;
        let m = multipliers[idx];
        if m.is_finite() && m > 0.0 {
            m
        } else {
            1.0
        }
    }

    pub fn depth_multiplier(&self, hour_of_day: u8) -> f64 {
        Self::hourly(&self.hourly_depth_multipliers, hour_of_day)
    }

    pub fn spread_multiplier(&self, hour_of_day: u8) -> f64 {
        Self::hourly(&self.hourly_spread_multipliers, hour_of_day)
    }

    pub fn bid_depth_at(&self, hour_of_day: u8) -> f64 {
        self.effective_bid_depth * self.depth_multiplier(hour_of_day)
    }

    pub fn ask_depth_at(&self, hour_of_day: u8) -> f64 {
        self.effective_ask_depth * self.depth_multiplier(hour_of_day)
    }

    pub fn spread_bps_at(&self, hour_of_day: u8) -> f64 {
        self.avg_spread_bps * self.spread_multiplier(hour_of_day)
    }
}

/// Spec §3 ReplenishmentProfile, per (symbol, venue).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplenishmentProfile {
    pub symbol: String,
    pub venue: String,
    pub avg_turnover_per_min: f64,
    /// Recovery time in minutes at 10%, 25%, 50% depletion.
    pub recovery_time_min_10: f64,
    pub recovery_time_min_25: f64,
    pub recovery_time_min_50: f64,
    pub hourly_turnover_multipliers: [f64; 24],
    pub recommended_min_interval_min: f64,
    pub recommended_max_interval_min: f64,
    pub confidence_score: f64,
}

impl ReplenishmentProfile {
    pub fn turnover_multiplier(&self, hour_of_day: u8) -> f64 {
        let idx = (hour_of_day % 24) as usize;
        let m = self.hourly_turnover_multipliers[idx];
        if m.is_finite() && m > 0.0 {
            m
        } else {
            1.0
        }
    }

    pub fn turnover_per_min_at(&self, hour_of_day: u8) -> f64 {
        self.avg_turnover_per_min * self.turnover_multiplier(hour_of_day)
    }
}

/// Spec §3 SlippageModelCoefficients, per-symbol.
///
/// Predicts slippage in basis points from `(positionUsd, bookDepthUsd,
/// spreadBps)` via `slippage = alpha*sqrt(size/depth) + beta*spread + gamma`
/// (spec §2 SlippageModel row).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SlippageModelCoefficients {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub r_squared: f64,
    pub sample_size: u64,
    pub last_calibrated: DateTime<Utc>,
}

impl SlippageModelCoefficients {
    /// A conservative uncalibrated default: pure sqrt-impact term, no
    /// spread pass-through, no intercept.
    pub fn uncalibrated() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.0,
            gamma: 0.0,
            r_squared: 0.0,
            sample_size: 0,
            last_calibrated: Utc::now(),
        }
    }

    /// `slippage_bps = alpha*sqrt(position/depth) + beta*spread_bps + gamma`.
    pub fn predict_bps(&self, position_usd: f64, book_depth_usd: f64, spread_bps: f64) -> f64 {
        if book_depth_usd <= 0.0 || position_usd < 0.0 {
            return self.gamma.max(0.0);
        }
        let ratio = (position_usd / book_depth_usd).max(0.0);
        (self.alpha * ratio.sqrt() + self.beta * spread_bps + self.gamma).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bucket_defaults_to_one() {
        let p = LiquidityProfile::flat("BTC", "A", 1_000_000.0, 5.0);
        assert_eq!(p.depth_multiplier(3), 1.0);
        assert_eq!(p.bid_depth_at(3), 1_000_000.0);
    }

    #[test]
    fn predict_bps_nonnegative() {
        let c = SlippageModelCoefficients::uncalibrated();
        let v = c.predict_bps(100_000.0, 1_000_000.0, 5.0);
        assert!(v >= 0.0);
    }

    #[test]
    fn predict_bps_handles_zero_depth() {
        let c = SlippageModelCoefficients {
            gamma: 2.0,
            ..SlippageModelCoefficients::uncalibrated()
        };
        assert_eq!(c.predict_bps(100.0, 0.0, 5.0), 2.0);
    }
}
