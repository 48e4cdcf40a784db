//! Per-opportunity max-notional search, spec §4.2.1.

use fra_adapters::historical::VolatilityMetrics;
use fra_adapters::venue::BestBidAsk;
use fra_schemas::order::OrderType;
use fra_schemas::PERIODS_PER_YEAR_HOURLY;

/// `netApy` and `breakEvenHours` at a given position, holding the
/// historical base rates, books and fee rates fixed. Shared by the
/// binary search here and by the aggregate-allocation recompute in
/// [`crate::allocation`].
pub(crate) fn net_apy_and_break_even(
    position_usd: f64,
    historical_long_rate: f64,
    historical_short_rate: f64,
    long_best_bid_ask: BestBidAsk,
    short_best_bid_ask: BestBidAsk,
    long_open_interest_usd: Option<f64>,
    short_open_interest_usd: Option<f64>,
    long_fee_rate: f64,
    short_fee_rate: f64,
) -> (f64, f64) {
    if position_usd <= 0.0 {
        return (f64::NEG_INFINITY, f64::INFINITY);
    }

    let slippage_cost = 2.0
        * (fra_costing::slippage(
            position_usd,
            long_best_bid_ask.best_bid,
            long_best_bid_ask.best_ask,
            long_open_interest_usd,
            OrderType::Limit,
        ) + fra_costing::slippage(
            position_usd,
            short_best_bid_ask.best_bid,
            short_best_bid_ask.best_ask,
            short_open_interest_usd,
            OrderType::Limit,
        ));
    let fee_cost = 2.0 * position_usd * (long_fee_rate + short_fee_rate);
    let total_costs = slippage_cost + fee_cost;

    let impact_long = long_open_interest_usd
        .map(|oi| fra_costing::funding_rate_impact(position_usd, oi, historical_long_rate))
        .unwrap_or(0.0);
    let impact_short = short_open_interest_usd
        .map(|oi| fra_costing::funding_rate_impact(position_usd, oi, historical_short_rate))
        .unwrap_or(0.0);
    let adjusted_spread = ((historical_long_rate + impact_long) - (historical_short_rate - impact_short)).abs();
    let adjusted_gross_apy = adjusted_spread * PERIODS_PER_YEAR_HOURLY;

    let hourly_gross_return = (adjusted_gross_apy / PERIODS_PER_YEAR_HOURLY) * position_usd;
    let amortized_costs_per_hour = total_costs / PERIODS_PER_YEAR_HOURLY;
    let net_apy = ((hourly_gross_return - amortized_costs_per_hour) * PERIODS_PER_YEAR_HOURLY) / position_usd;
    let break_even_hours = if hourly_gross_return > 0.0 {
        total_costs / hourly_gross_return
    } else {
        f64::INFINITY
    };
    (net_apy, break_even_hours)
}

/// Binary search over `[1000, min(minOI*0.1, 1e7)]` for the position at
/// which `netApy` settles near `targetNetApy`. Costs scale sub-linearly
/// in position (depth impact grows as `sqrt`) while the funding edge
/// scales linearly, so `netApy` is monotonically non-increasing in
/// position over the search range — the binary search tracks the
/// largest position it has seen clear the target, rather than driving
/// for exact equality.
pub fn search_max_notional(
    historical_long_rate: f64,
    historical_short_rate: f64,
    long_best_bid_ask: BestBidAsk,
    short_best_bid_ask: BestBidAsk,
    long_open_interest_usd: f64,
    short_open_interest_usd: f64,
    long_fee_rate: f64,
    short_fee_rate: f64,
    target_net_apy: f64,
) -> Option<f64> {
    let min_oi = long_open_interest_usd.min(short_open_interest_usd);
    if min_oi <= 0.0 {
        return None;
    }
    let mut low = 1000.0f64;
    let mut high = (min_oi * 0.1).min(1e7);
    if high <= low {
        return None;
    }

    let mut best: Option<f64> = None;
    for _ in 0..50 {
        if high - low < 100.0 {
            break;
        }
        let mid = (low + high) / 2.0;
        let (net_apy, _) = net_apy_and_break_even(
            mid,
            historical_long_rate,
            historical_short_rate,
            long_best_bid_ask,
            short_best_bid_ask,
            Some(long_open_interest_usd),
            Some(short_open_interest_usd),
            long_fee_rate,
            short_fee_rate,
        );
        if (net_apy - target_net_apy).abs() < 1e-3 {
            best = Some(mid);
            break;
        } else if net_apy > target_net_apy {
            low = mid;
            best = Some(mid);
        } else {
            high = mid;
        }
    }
    Some(best.unwrap_or(low))
}

/// Spec §4.2.1 step 4: discount the chosen position by a weighted
/// penalty built from the 30-day volatility read, floored at
/// `$1,000` and capped so the penalty itself never exceeds `0.7`.
pub fn apply_volatility_discount(
    position_usd: f64,
    break_even_hours: f64,
    volatility: Option<VolatilityMetrics>,
) -> f64 {
    let Some(v) = volatility else {
        return position_usd.max(1000.0);
    };
    let unstable_threshold = if v.stability_score < 0.5 { 24.0 } else { 48.0 };
    let p_stability = (1.0 - v.stability_score).clamp(0.0, 1.0);
    let p_break_even = if break_even_hours.is_finite() {
        (break_even_hours / unstable_threshold).min(1.0)
    } else {
        1.0
    };
    let p_max_change = (v.max_hourly_spread_change / 1e-4).min(1.0);
    let p_reversals = (v.spread_reversals as f64 / 5.0).min(1.0);
    let penalty = (0.4 * p_stability + 0.3 * p_break_even + 0.2 * p_max_change + 0.1 * p_reversals).min(0.7);
    (position_usd * (1.0 - penalty)).max(1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(mid: f64) -> BestBidAsk {
        BestBidAsk { best_bid: mid * 0.9999, best_ask: mid * 1.0001 }
    }

    #[test]
    fn no_open_interest_yields_no_search() {
        assert!(search_max_notional(1e-3, -1e-3, book(100.0), book(100.0), 0.0, 1e7, 1e-4, 1e-4, 0.35).is_none());
    }

    #[test]
    fn thin_open_interest_below_floor_yields_no_search() {
        // minOI*0.1 = 50 < low bound 1000.
        assert!(search_max_notional(1e-3, -1e-3, book(100.0), book(100.0), 500.0, 500.0, 1e-4, 1e-4, 0.35).is_none());
    }

    #[test]
    fn finds_a_position_with_net_apy_near_target_when_feasible() {
        // Large spread, deep OI, cheap fees: target should be reachable well
        // inside the search band.
        let pos = search_max_notional(5e-3, -5e-3, book(50_000.0), book(50_000.0), 5e7, 5e7, 2e-4, 2e-4, 0.35)
            .expect("position found");
        let (net_apy, _) = net_apy_and_break_even(
            pos, 5e-3, -5e-3, book(50_000.0), book(50_000.0), Some(5e7), Some(5e7), 2e-4, 2e-4,
        );
        assert!(net_apy.is_finite());
        assert!(pos >= 1000.0);
    }

    #[test]
    fn no_volatility_data_leaves_position_unchanged() {
        assert_eq!(apply_volatility_discount(10_000.0, 5.0, None), 10_000.0);
    }

    #[test]
    fn unstable_volatility_discounts_position() {
        let v = VolatilityMetrics {
            stability_score: 0.1,
            max_hourly_spread_change: 2e-4,
            spread_reversals: 8,
            spread_drops_to_zero: 1,
        };
        let discounted = apply_volatility_discount(10_000.0, 100.0, Some(v));
        assert!(discounted < 10_000.0);
        assert!(discounted >= 1000.0);
    }

    #[test]
    fn discount_never_drops_below_floor() {
        let v = VolatilityMetrics {
            stability_score: 0.0,
            max_hourly_spread_change: 1.0,
            spread_reversals: 100,
            spread_drops_to_zero: 100,
        };
        assert_eq!(apply_volatility_discount(1500.0, 10_000.0, Some(v)), 1000.0);
    }
}
