//! Aggregate portfolio allocation across accepted opportunities, spec
//! §4.2.4.

use crate::OpportunityAssessment;
use fra_adapters::historical::VolatilityMetrics;
use std::collections::BTreeMap;

/// One opportunity's share of the portfolio.
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub notional_usd: f64,
    pub net_apy: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioAllocation {
    pub allocations: BTreeMap<String, Allocation>,
    pub aggregate_apy: f64,
    pub total_allocated_usd: f64,
}

/// Unique key for an opportunity within a portfolio batch. Two
/// assessments for the same (symbol, longVenue, shortVenue) collide by
/// design — the caller is expected to have already deduplicated.
pub fn opportunity_key(assessment: &OpportunityAssessment) -> String {
    format!(
        "{}:{}:{}",
        assessment.opportunity.symbol, assessment.opportunity.long_venue, assessment.opportunity.short_venue
    )
}

/// Binary search over total deployed capital for the point at which
/// `aggregateApy` clears `targetAggregateApy`, then cap at
/// `maxPortfolioUsd` with proportional rescaling.
pub fn allocate(
    assessments: &[OpportunityAssessment],
    total_capital_usd: f64,
    target_aggregate_apy: f64,
    max_portfolio_usd: f64,
) -> PortfolioAllocation {
    let sum_max_notional: f64 = assessments.iter().map(|a| a.max_notional_usd).sum();
    if assessments.is_empty() || total_capital_usd <= 0.0 || sum_max_notional <= 0.0 {
        return PortfolioAllocation::default();
    }

    let mut low = 0.0f64;
    let mut high = total_capital_usd.min(sum_max_notional);

    // Seed conservatively at `low` (empty allocation), not `high` (the
    // untested full/max allocation) — mirrors `max_notional::search_max_notional`'s
    // `best.unwrap_or(low)` fallback. If no midpoint ever clears
    // `target_aggregate_apy`, `allocate` must return empty, not full-size.
    let mut best = evaluate(assessments, low, sum_max_notional);
    for _ in 0..50 {
        if high - low < 1000.0 {
            break;
        }
        let mid = (low + high) / 2.0;
        let candidate = evaluate(assessments, mid, sum_max_notional);
        if candidate.aggregate_apy >= target_aggregate_apy {
            best = candidate;
            low = mid;
        } else {
            high = mid;
        }
    }

    if best.total_allocated_usd > max_portfolio_usd && best.total_allocated_usd > 0.0 {
        let scale = max_portfolio_usd / best.total_allocated_usd;
        for allocation in best.allocations.values_mut() {
            allocation.notional_usd *= scale;
        }
        best.total_allocated_usd = max_portfolio_usd;
    }
    best
}

fn evaluate(assessments: &[OpportunityAssessment], test_total_usd: f64, sum_max_notional: f64) -> PortfolioAllocation {
    if test_total_usd <= 0.0 {
        return PortfolioAllocation::default();
    }

    let mut allocations = BTreeMap::new();
    let mut weighted_apy_sum = 0.0;
    let mut total = 0.0;

    for a in assessments {
        let weight = a.max_notional_usd / sum_max_notional;
        let raw = (weight * test_total_usd).min(a.max_notional_usd);
        let sized = raw * a.data_quality_risk_factor;
        if sized < fra_schemas::SIZE_EPSILON {
            continue;
        }
        let net_apy = a.net_apy_at(sized) * (1.0 - additional_discount(a.volatility));
        allocations.insert(opportunity_key(a), Allocation { notional_usd: sized, net_apy });
        weighted_apy_sum += sized * net_apy;
        total += sized;
    }

    let aggregate_apy = if total > 0.0 { weighted_apy_sum / total } else { 0.0 };
    PortfolioAllocation { allocations, aggregate_apy, total_allocated_usd: total }
}

/// Second, smaller volatility haircut applied at allocation time (spec
/// §4.2.4), on top of the per-opportunity discount already folded into
/// `maxNotionalUsd`.
fn additional_discount(volatility: Option<VolatilityMetrics>) -> f64 {
    let Some(v) = volatility else { return 0.0 };
    let stability_penalty = (1.0 - v.stability_score).clamp(0.0, 1.0) * 0.15;
    let zero_drop_penalty = if v.spread_drops_to_zero > 0 { 0.1 } else { 0.0 };
    let reversal_penalty = if v.spread_reversals > 10 { 0.05 } else { 0.0 };
    (stability_penalty + zero_drop_penalty + reversal_penalty).min(0.3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::assessment_fixture;

    #[test]
    fn empty_input_yields_empty_allocation() {
        let a = allocate(&[], 1_000_000.0, 0.35, 50_000_000.0);
        assert_eq!(a.total_allocated_usd, 0.0);
        assert!(a.allocations.is_empty());
    }

    #[test]
    fn zero_capital_yields_empty_allocation() {
        let fixture = assessment_fixture(100_000.0, 1.0, None);
        let a = allocate(&[fixture], 0.0, 0.35, 50_000_000.0);
        assert_eq!(a.total_allocated_usd, 0.0);
    }

    #[test]
    fn allocates_up_to_total_capital_when_below_cap() {
        let fixture = assessment_fixture(200_000.0, 1.0, None);
        let a = allocate(&[fixture], 100_000.0, 0.01, 50_000_000.0);
        assert!(a.total_allocated_usd > 0.0);
        assert!(a.total_allocated_usd <= 100_000.0 + 1.0);
    }

    #[test]
    fn respects_max_portfolio_cap_with_rescale() {
        let fixtures: Vec<_> = (0..5)
            .map(|i| assessment_fixture(20_000_000.0, 1.0, None).with_venue(i))
            .collect();
        let a = allocate(&fixtures, 200_000_000.0, 0.0, 50_000_000.0);
        assert!(a.total_allocated_usd <= 50_000_000.0 + 1.0);
    }

    #[test]
    fn low_data_quality_shrinks_allocation() {
        let full = assessment_fixture(200_000.0, 1.0, None);
        let poor = assessment_fixture(200_000.0, 0.3, None).with_venue(9);
        let a_full = allocate(&[full.clone()], 100_000.0, 0.01, 50_000_000.0);
        let a_poor = allocate(&[poor], 100_000.0, 0.01, 50_000_000.0);
        assert!(a_poor.total_allocated_usd <= a_full.total_allocated_usd);
    }
}
